use async_trait::async_trait;
use pushline_protocol::TransferLocation;
use pushline_transport::TransferChannel;
use tracing::{debug, info};

use crate::buffer::EncodedBatch;
use crate::error::{BatchError, BatchResult};
use crate::strategy::{FlushStrategy, StrategyKind};

struct OpenedStream {
    stream_id: String,
    current: TransferLocation,
}

/// Upload into the chunks of one open stream.
///
/// Each flush consumes the current chunk location and asks for the next
/// one. `close` ends the stream on the service side.
pub struct OpenStreamStrategy {
    channel: TransferChannel,
    stream: Option<OpenedStream>,
}

impl OpenStreamStrategy {
    pub fn new(channel: TransferChannel) -> Self {
        Self {
            channel,
            stream: None,
        }
    }
}

#[async_trait]
impl FlushStrategy for OpenStreamStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::OpenStream
    }

    async fn open(&mut self) -> BatchResult<()> {
        let location = self.channel.open_stream().await?;
        self.stream = Some(OpenedStream {
            current: location.transfer(),
            stream_id: location.stream_id,
        });
        Ok(())
    }

    async fn flush(&mut self, batch: EncodedBatch) -> BatchResult<()> {
        let stream = self.stream.as_mut().ok_or(BatchError::StreamClosed)?;
        let items = batch.items();
        self.channel.upload(&stream.current, batch.payload).await?;
        debug!(stream_id = %stream.stream_id, file_id = %stream.current.file_id, items, "chunk uploaded");
        stream.current = self.channel.next_chunk(&stream.stream_id).await?;
        info!(stream_id = %stream.stream_id, items, "stream chunk flushed");
        Ok(())
    }

    async fn close(&mut self) -> BatchResult<()> {
        let stream = self.stream.as_ref().ok_or(BatchError::StreamClosed)?;
        self.channel.close_stream(&stream.stream_id).await?;
        self.stream = None;
        Ok(())
    }

    fn requires_close(&self) -> bool {
        true
    }

    fn stream_id(&self) -> Option<&str> {
        self.stream.as_ref().map(|s| s.stream_id.as_str())
    }
}
