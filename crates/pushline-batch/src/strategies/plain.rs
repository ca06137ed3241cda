use async_trait::async_trait;
use pushline_transport::TransferChannel;
use tracing::info;

use crate::buffer::EncodedBatch;
use crate::error::BatchResult;
use crate::strategy::{FlushStrategy, StrategyKind};

/// Acquire a location, upload, and register it as a document batch.
pub struct PlainBatchStrategy {
    channel: TransferChannel,
}

impl PlainBatchStrategy {
    pub fn new(channel: TransferChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl FlushStrategy for PlainBatchStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PlainBatch
    }

    async fn open(&mut self) -> BatchResult<()> {
        Ok(())
    }

    async fn flush(&mut self, batch: EncodedBatch) -> BatchResult<()> {
        let items = batch.items();
        let bytes = batch.payload.len();
        let file_id = self.channel.acquire_and_upload(batch.payload).await?;
        self.channel.register_batch(&file_id).await?;
        info!(items, bytes, file_id = %file_id, "batch registered");
        Ok(())
    }

    async fn close(&mut self) -> BatchResult<()> {
        Ok(())
    }
}
