use std::sync::Arc;

use bytes::Bytes;
use pushline_protocol::{PushCodec, PushRequest, StreamLocation, TransferLocation};
use tracing::{debug, info};

use crate::error::{TransportError, TransportResult};
use crate::transport::PushTransport;

/// Client for transfer locations: write-once blob destinations used to move
/// payloads outside the synchronous request path.
#[derive(Clone)]
pub struct TransferChannel {
    transport: Arc<dyn PushTransport>,
}

impl TransferChannel {
    pub fn new(transport: Arc<dyn PushTransport>) -> Self {
        Self { transport }
    }

    /// Request a fresh location.
    pub async fn acquire(&self) -> TransportResult<TransferLocation> {
        let request = PushRequest::AcquireLocation;
        let body = self.transport.execute(&request).await?;
        let location = PushCodec::decode_location(&body).map_err(|source| {
            TransportError::InvalidResponse {
                request: request.type_name(),
                source,
            }
        })?;
        debug!(file_id = %location.file_id, "acquired transfer location");
        Ok(location)
    }

    /// PUT the payload to the location. The location must not be reused.
    pub async fn upload(&self, location: &TransferLocation, payload: Bytes) -> TransportResult<()> {
        debug!(file_id = %location.file_id, bytes = payload.len(), "uploading");
        self.transport
            .execute(&PushRequest::Upload {
                upload_uri: location.upload_uri.clone(),
                body: payload,
            })
            .await?;
        Ok(())
    }

    /// Acquire a location and upload the payload to it, returning the file
    /// id that references the upload.
    pub async fn acquire_and_upload(&self, payload: Bytes) -> TransportResult<String> {
        let location = self.acquire().await?;
        self.upload(&location, payload).await?;
        Ok(location.file_id)
    }

    /// Open a stream and get its first location.
    pub async fn open_stream(&self) -> TransportResult<StreamLocation> {
        let request = PushRequest::OpenStream;
        let body = self.transport.execute(&request).await?;
        let location = PushCodec::decode_stream_location(&body).map_err(|source| {
            TransportError::InvalidResponse {
                request: request.type_name(),
                source,
            }
        })?;
        info!(stream_id = %location.stream_id, "stream opened");
        Ok(location)
    }

    /// Request the next chunk location of an open stream.
    pub async fn next_chunk(&self, stream_id: &str) -> TransportResult<TransferLocation> {
        let request = PushRequest::StreamChunk {
            stream_id: stream_id.to_string(),
        };
        let body = self.transport.execute(&request).await?;
        let location = PushCodec::decode_location(&body).map_err(|source| {
            TransportError::InvalidResponse {
                request: request.type_name(),
                source,
            }
        })?;
        debug!(stream_id, file_id = %location.file_id, "rotated stream chunk");
        Ok(location)
    }

    pub async fn close_stream(&self, stream_id: &str) -> TransportResult<()> {
        self.transport
            .execute(&PushRequest::CloseStream {
                stream_id: stream_id.to_string(),
            })
            .await?;
        info!(stream_id, "stream closed");
        Ok(())
    }

    /// Register an uploaded batch of documents.
    pub async fn register_batch(&self, file_id: &str) -> TransportResult<()> {
        self.transport
            .execute(&PushRequest::RegisterBatch {
                file_id: file_id.to_string(),
            })
            .await?;
        Ok(())
    }

    /// Register an uploaded batch against the stream-update endpoint.
    pub async fn register_stream_update(&self, file_id: &str) -> TransportResult<()> {
        self.transport
            .execute(&PushRequest::RegisterStreamUpdate {
                file_id: file_id.to_string(),
            })
            .await?;
        Ok(())
    }

    /// Register an uploaded permission batch for a security provider.
    pub async fn register_permission_batch(&self, provider: &str, file_id: &str) -> TransportResult<()> {
        self.transport
            .execute(&PushRequest::RegisterPermissionBatch {
                provider: provider.to_string(),
                file_id: file_id.to_string(),
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;

    fn channel() -> (Arc<MemoryTransport>, TransferChannel) {
        let memory = Arc::new(MemoryTransport::new());
        (memory.clone(), TransferChannel::new(memory))
    }

    #[tokio::test]
    async fn acquire_then_upload() {
        let (memory, channel) = channel();
        let file_id = channel
            .acquire_and_upload(Bytes::from_static(b"data"))
            .await
            .unwrap();
        assert_eq!(file_id, "file-1");
        assert_eq!(memory.call_names(), ["AcquireLocation", "Upload"]);
        assert_eq!(memory.uploads()[0].0, "memory://upload/1");
    }

    #[tokio::test]
    async fn stream_lifecycle() {
        let (memory, channel) = channel();
        let opened = channel.open_stream().await.unwrap();
        let next = channel.next_chunk(&opened.stream_id).await.unwrap();
        assert_ne!(next.file_id, opened.file_id);
        channel.close_stream(&opened.stream_id).await.unwrap();
        assert_eq!(
            memory.call_names(),
            ["OpenStream", "StreamChunk", "CloseStream"]
        );
    }

    #[tokio::test]
    async fn failure_propagates() {
        let (memory, channel) = channel();
        memory.fail_next("AcquireLocation", 401);
        let err = channel.acquire().await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }
}
