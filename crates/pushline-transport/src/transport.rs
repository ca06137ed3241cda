use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use pushline_protocol::PushRequest;

use crate::error::TransportResult;

/// Executes one request against the remote service and returns the
/// response body of a successful (2xx) answer.
///
/// Any other outcome is a [`crate::TransportError`]; implementations log
/// the failure before returning it.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn execute(&self, request: &PushRequest) -> TransportResult<Bytes>;
}

#[async_trait]
impl<T: PushTransport + ?Sized> PushTransport for Arc<T> {
    async fn execute(&self, request: &PushRequest) -> TransportResult<Bytes> {
        (**self).execute(request).await
    }
}
