use async_trait::async_trait;

use crate::buffer::EncodedBatch;
use crate::error::BatchResult;

/// Which strategy drives a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    PlainBatch,
    OpenStream,
    UpdateStream,
    LocalSpool,
}

impl StrategyKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::PlainBatch => "plain-batch",
            Self::OpenStream => "open-stream",
            Self::UpdateStream => "update-stream",
            Self::LocalSpool => "local-spool",
        }
    }

    /// Source status updates and delete-older-than only apply to plain
    /// batches.
    pub fn manages_source_lifecycle(self) -> bool {
        matches!(self, Self::PlainBatch)
    }
}

/// How a session delivers its batches.
///
/// `open` runs once per session before any flush, `flush` once per
/// non-empty batch, and `close` once at the end of the session.
#[async_trait]
pub trait FlushStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn open(&mut self) -> BatchResult<()>;

    async fn flush(&mut self, batch: EncodedBatch) -> BatchResult<()>;

    async fn close(&mut self) -> BatchResult<()>;

    /// Whether leaving the session without `close` strands remote state.
    fn requires_close(&self) -> bool {
        false
    }

    /// Id of the remote stream, once opened.
    fn stream_id(&self) -> Option<&str> {
        None
    }
}
