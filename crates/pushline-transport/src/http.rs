use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use pushline_protocol::{
    headers, status_hint, ApiKey, HttpMethod, PushRequest, ServiceEndpoints, SourceScope,
};
use pushline_types::DEFAULT_REQUEST_TIMEOUT_SECS;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use tracing::{debug, error};

use crate::error::{TransportError, TransportResult};
use crate::transport::PushTransport;

/// Settings for [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct HttpSettings {
    pub endpoints: ServiceEndpoints,
    pub scope: SourceScope,
    pub api_key: ApiKey,
    pub timeout: Duration,
}

impl HttpSettings {
    pub fn new(endpoints: ServiceEndpoints, scope: SourceScope, api_key: ApiKey) -> Self {
        Self {
            endpoints,
            scope,
            api_key,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Sends requests over HTTPS with `reqwest`.
///
/// Service calls carry the bearer token and a JSON content type. Uploads to
/// a transfer location carry an octet-stream content type and the
/// server-side encryption header instead.
pub struct HttpTransport {
    client: Client,
    settings: HttpSettings,
}

impl HttpTransport {
    pub fn new(settings: HttpSettings) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| TransportError::Request {
                request: "build client",
                reason: e.to_string(),
                timeout: false,
            })?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }
}

fn method(m: HttpMethod) -> Method {
    match m {
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl PushTransport for HttpTransport {
    async fn execute(&self, request: &PushRequest) -> TransportResult<Bytes> {
        let name = request.type_name();
        let route = request.route(&self.settings.endpoints, &self.settings.scope);
        debug!(
            request = name,
            method = route.method.as_str(),
            url = %route.url,
            bytes = request.body_len(),
            "sending"
        );

        let mut builder = self.client.request(method(route.method), &route.url);
        if !route.query.is_empty() {
            builder = builder.query(&route.query);
        }
        builder = if route.upload {
            builder
                .header(CONTENT_TYPE, headers::OCTET_STREAM)
                .header(headers::SERVER_SIDE_ENCRYPTION, headers::SERVER_SIDE_ENCRYPTION_VALUE)
        } else {
            builder
                .header(AUTHORIZATION, self.settings.api_key.bearer())
                .header(CONTENT_TYPE, headers::JSON)
        };
        if let Some(body) = route.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            error!(request = name, error = %e, "request failed");
            TransportError::Request {
                request: name,
                reason: e.to_string(),
                timeout: e.is_timeout(),
            }
        })?;

        let status = response.status();
        debug!(request = name, status = status.as_u16(), "response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let hint = status_hint(status.as_u16());
            error!(
                request = name,
                status = status.as_u16(),
                hint = hint.unwrap_or(""),
                body = %body,
                "request rejected"
            );
            return Err(TransportError::Status {
                request: name,
                status: status.as_u16(),
                body,
                hint,
            });
        }

        response.bytes().await.map_err(|e| {
            error!(request = name, error = %e, "reading response failed");
            TransportError::Request {
                request: name,
                reason: e.to_string(),
                timeout: e.is_timeout(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::body::Bytes as AxumBytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, Method as AxumMethod, StatusCode, Uri};
    use axum::response::IntoResponse;
    use axum::Router;
    use pushline_protocol::SourceStatus;

    use super::*;

    #[derive(Clone, Debug)]
    struct Seen {
        method: String,
        path: String,
        query: String,
        headers: HeaderMap,
        body: Vec<u8>,
    }

    type Log = Arc<Mutex<Vec<Seen>>>;

    async fn capture(
        State(log): State<Log>,
        method: AxumMethod,
        uri: Uri,
        headers: HeaderMap,
        body: AxumBytes,
    ) -> impl IntoResponse {
        let path = uri.path().to_string();
        log.lock().unwrap().push(Seen {
            method: method.to_string(),
            path: path.clone(),
            query: uri.query().unwrap_or_default().to_string(),
            headers,
            body: body.to_vec(),
        });
        if path.ends_with("/files") {
            return (
                StatusCode::CREATED,
                r#"{"uploadUri":"http://bucket/x","fileId":"file-1"}"#.to_string(),
            );
        }
        if path.contains("src-denied") {
            return (StatusCode::FORBIDDEN, "no access".to_string());
        }
        (StatusCode::OK, String::new())
    }

    async fn serve() -> (SocketAddr, Log) {
        let log: Log = Arc::default();
        let app = Router::new().fallback(capture).with_state(log.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, log)
    }

    const KEY: &str = "xx12345678-abcd-ef01-2345-6789abcdef01";

    fn transport(addr: SocketAddr, source: &str) -> HttpTransport {
        let base = format!("http://{addr}");
        let endpoints = ServiceEndpoints::custom(&format!("{base}/push/v1"), &base).unwrap();
        let settings = HttpSettings::new(
            endpoints,
            SourceScope::new("org1", source),
            ApiKey::new(KEY).unwrap(),
        );
        HttpTransport::new(settings).unwrap()
    }

    #[tokio::test]
    async fn status_call_shape() {
        let (addr, log) = serve().await;
        let http = transport(addr, "src1");
        http.execute(&PushRequest::UpdateStatus {
            status: SourceStatus::Idle,
        })
        .await
        .unwrap();

        let seen = log.lock().unwrap()[0].clone();
        assert_eq!(seen.method, "POST");
        assert_eq!(seen.path, "/push/v1/organizations/org1/sources/src1/status");
        assert_eq!(seen.query, "statusType=IDLE");
        assert_eq!(seen.headers["authorization"], format!("Bearer {KEY}"));
        assert_eq!(seen.headers["content-type"], "application/json");
    }

    #[tokio::test]
    async fn location_response_is_returned() {
        let (addr, _log) = serve().await;
        let http = transport(addr, "src1");
        let body = http.execute(&PushRequest::AcquireLocation).await.unwrap();
        let location = pushline_protocol::PushCodec::decode_location(&body).unwrap();
        assert_eq!(location.file_id, "file-1");
    }

    #[tokio::test]
    async fn upload_uses_blob_headers() {
        let (addr, log) = serve().await;
        let http = transport(addr, "src1");
        http.execute(&PushRequest::Upload {
            upload_uri: format!("http://{addr}/bucket/object?sig=abc"),
            body: Bytes::from_static(b"{\"AddOrUpdate\":[]}"),
        })
        .await
        .unwrap();

        let seen = log.lock().unwrap()[0].clone();
        assert_eq!(seen.method, "PUT");
        assert_eq!(seen.path, "/bucket/object");
        assert_eq!(seen.query, "sig=abc");
        assert_eq!(seen.headers["content-type"], "application/octet-stream");
        assert_eq!(seen.headers["x-amz-server-side-encryption"], "AES256");
        assert!(seen.headers.get("authorization").is_none());
        assert_eq!(seen.body, b"{\"AddOrUpdate\":[]}");
    }

    #[tokio::test]
    async fn rejection_carries_status_and_hint() {
        let (addr, _log) = serve().await;
        let http = transport(addr, "src-denied");
        let err = http
            .execute(&PushRequest::RegisterBatch {
                file_id: "f".into(),
            })
            .await
            .unwrap_err();
        match err {
            TransportError::Status {
                request,
                status,
                body,
                hint,
            } => {
                assert_eq!(request, "RegisterBatch");
                assert_eq!(status, 403);
                assert_eq!(body, "no access");
                assert!(hint.unwrap().starts_with("Access denied"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_host_is_a_request_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let http = transport(addr, "src1");
        let err = http.execute(&PushRequest::OpenStream).await.unwrap_err();
        assert!(matches!(err, TransportError::Request { .. }));
    }
}
