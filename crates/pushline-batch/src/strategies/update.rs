use async_trait::async_trait;
use pushline_transport::TransferChannel;
use tracing::info;

use crate::buffer::EncodedBatch;
use crate::error::BatchResult;
use crate::strategy::{FlushStrategy, StrategyKind};

/// Acquire a location, upload, and register it as an update of the
/// source's stream.
pub struct UpdateStreamStrategy {
    channel: TransferChannel,
}

impl UpdateStreamStrategy {
    pub fn new(channel: TransferChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl FlushStrategy for UpdateStreamStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::UpdateStream
    }

    async fn open(&mut self) -> BatchResult<()> {
        Ok(())
    }

    async fn flush(&mut self, batch: EncodedBatch) -> BatchResult<()> {
        let items = batch.items();
        let file_id = self.channel.acquire_and_upload(batch.payload).await?;
        self.channel.register_stream_update(&file_id).await?;
        info!(items, file_id = %file_id, "stream update registered");
        Ok(())
    }

    async fn close(&mut self) -> BatchResult<()> {
        Ok(())
    }
}
