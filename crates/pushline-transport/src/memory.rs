use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use pushline_protocol::{
    status_hint, PushRequest, Route, ServiceEndpoints, SourceScope, StreamLocation,
    TransferLocation,
};
use tracing::error;

use crate::error::{TransportError, TransportResult};
use crate::transport::PushTransport;

/// One request seen by [`MemoryTransport`].
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub name: &'static str,
    pub request: PushRequest,
    pub route: Route,
}

#[derive(Default)]
struct State {
    calls: Vec<RecordedCall>,
    failures: HashMap<&'static str, Vec<u16>>,
    next_file: u64,
    next_stream: u64,
}

/// In-memory stand-in for the remote service.
///
/// Answers location and stream requests with fresh identifiers, accepts
/// everything else, and records every call for inspection. Failures can be
/// scripted per request type. Intended for tests and dry runs.
pub struct MemoryTransport {
    endpoints: ServiceEndpoints,
    scope: SourceScope,
    state: RwLock<State>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            endpoints: ServiceEndpoints::default(),
            scope: SourceScope::new("memory-org", "memory-source"),
            state: RwLock::new(State::default()),
        }
    }

    pub fn with_scope(scope: SourceScope) -> Self {
        Self {
            scope,
            ..Self::new()
        }
    }

    /// Make the next call of the given request type fail with `status`.
    /// Repeated calls queue up further failures.
    pub fn fail_next(&self, request: &'static str, status: u16) {
        self.state
            .write()
            .expect("lock poisoned")
            .failures
            .entry(request)
            .or_default()
            .push(status);
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.read().expect("lock poisoned").calls.clone()
    }

    /// Request type names of every call so far, in order.
    pub fn call_names(&self) -> Vec<&'static str> {
        self.state
            .read()
            .expect("lock poisoned")
            .calls
            .iter()
            .map(|c| c.name)
            .collect()
    }

    /// Bodies uploaded to transfer locations, with their URI, in order.
    pub fn uploads(&self) -> Vec<(String, Bytes)> {
        self.state
            .read()
            .expect("lock poisoned")
            .calls
            .iter()
            .filter_map(|c| match &c.request {
                PushRequest::Upload { upload_uri, body } => Some((upload_uri.clone(), body.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().expect("lock poisoned").calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.state.write().expect("lock poisoned").calls.clear();
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn location(n: u64) -> TransferLocation {
    TransferLocation {
        upload_uri: format!("memory://upload/{n}"),
        file_id: format!("file-{n}"),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Bytes {
    Bytes::from(serde_json::to_vec(value).unwrap_or_default())
}

#[async_trait]
impl PushTransport for MemoryTransport {
    async fn execute(&self, request: &PushRequest) -> TransportResult<Bytes> {
        let name = request.type_name();
        let route = request.route(&self.endpoints, &self.scope);
        let mut state = self.state.write().expect("lock poisoned");
        state.calls.push(RecordedCall {
            name,
            request: request.clone(),
            route,
        });

        let scripted = state.failures.get_mut(name).and_then(|queue| {
            if queue.is_empty() {
                None
            } else {
                Some(queue.remove(0))
            }
        });
        if let Some(status) = scripted {
            error!(request = name, status, "scripted failure");
            return Err(TransportError::Status {
                request: name,
                status,
                body: String::new(),
                hint: status_hint(status),
            });
        }

        let body = match request {
            PushRequest::AcquireLocation | PushRequest::StreamChunk { .. } => {
                state.next_file += 1;
                to_json(&location(state.next_file))
            }
            PushRequest::OpenStream => {
                state.next_file += 1;
                state.next_stream += 1;
                let loc = location(state.next_file);
                to_json(&StreamLocation {
                    upload_uri: loc.upload_uri,
                    file_id: loc.file_id,
                    stream_id: format!("stream-{}", state.next_stream),
                })
            }
            _ => Bytes::new(),
        };
        Ok(body)
    }
}
