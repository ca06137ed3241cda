use async_trait::async_trait;
use tracing::info;

use crate::buffer::EncodedBatch;
use crate::config::SpoolConfig;
use crate::error::BatchResult;
use crate::strategy::{FlushStrategy, StrategyKind};

/// Write every batch to `<dir>/<n>_batch.json`, numbering files from the
/// configured offset. Nothing is sent.
pub struct LocalSpoolStrategy {
    config: SpoolConfig,
    next: u64,
}

impl LocalSpoolStrategy {
    pub fn new(config: SpoolConfig) -> Self {
        let next = config.offset;
        Self { config, next }
    }

    /// Number of the next file to be written.
    pub fn next_file(&self) -> u64 {
        self.next
    }
}

#[async_trait]
impl FlushStrategy for LocalSpoolStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LocalSpool
    }

    async fn open(&mut self) -> BatchResult<()> {
        tokio::fs::create_dir_all(&self.config.dir).await?;
        Ok(())
    }

    async fn flush(&mut self, batch: EncodedBatch) -> BatchResult<()> {
        let path = self.config.dir.join(format!("{}_batch.json", self.next));
        tokio::fs::write(&path, &batch.payload).await?;
        self.next += 1;
        info!(path = %path.display(), items = batch.items(), "batch spooled");
        Ok(())
    }

    async fn close(&mut self) -> BatchResult<()> {
        Ok(())
    }
}
