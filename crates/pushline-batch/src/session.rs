use std::sync::Arc;

use pushline_transport::{PushTransport, TransferChannel};
use pushline_types::{BatchItem, OrderingClock, OrderingToken};
use serde_json::Value;
use tracing::{info, warn};

use crate::accumulator::{BatchAccumulator, EndOptions, SessionSummary, StartOptions};
use crate::config::SpoolConfig;
use crate::error::{BatchError, BatchResult};
use crate::strategies::{LocalSpoolStrategy, OpenStreamStrategy, UpdateStreamStrategy};
use crate::strategy::{FlushStrategy, StrategyKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Unopened,
    Open,
    Closed,
    Failed,
}

/// A stream-mode push with an explicit lifecycle.
///
/// `Unopened → Open → Closed`; every flush while open rotates to a fresh
/// chunk (open stream) or registers an update (update stream). `close`
/// consumes the session. Dropping an open stream leaves it dangling on the
/// service and is logged.
pub struct StreamSession {
    accumulator: BatchAccumulator,
    state: StreamState,
}

impl StreamSession {
    /// Session over a full stream: open, chunks, close.
    pub fn open_stream(
        transport: Arc<dyn PushTransport>,
        clock: Arc<dyn OrderingClock>,
        ceiling: usize,
    ) -> Self {
        let strategy = OpenStreamStrategy::new(TransferChannel::new(transport.clone()));
        Self::with_strategy(Box::new(strategy), ceiling, transport, clock)
    }

    /// Session that registers each batch as an update of the source's
    /// stream.
    pub fn update_stream(
        transport: Arc<dyn PushTransport>,
        clock: Arc<dyn OrderingClock>,
        ceiling: usize,
    ) -> Self {
        let strategy = UpdateStreamStrategy::new(TransferChannel::new(transport.clone()));
        Self::with_strategy(Box::new(strategy), ceiling, transport, clock)
    }

    /// Session that writes each batch to the spool directory instead of a
    /// remote stream.
    pub fn spooled(
        spool: SpoolConfig,
        transport: Arc<dyn PushTransport>,
        clock: Arc<dyn OrderingClock>,
        ceiling: usize,
    ) -> Self {
        let strategy = LocalSpoolStrategy::new(spool);
        Self::with_strategy(Box::new(strategy), ceiling, transport, clock)
    }

    fn with_strategy(
        strategy: Box<dyn FlushStrategy>,
        ceiling: usize,
        transport: Arc<dyn PushTransport>,
        clock: Arc<dyn OrderingClock>,
    ) -> Self {
        Self {
            accumulator: BatchAccumulator::with_strategy(strategy, ceiling, transport, clock),
            state: StreamState::Unopened,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn kind(&self) -> StrategyKind {
        self.accumulator.kind()
    }

    /// Remote stream id once opened (open stream only).
    pub fn stream_id(&self) -> Option<&str> {
        self.accumulator.stream_id()
    }

    pub async fn open(&mut self) -> BatchResult<OrderingToken> {
        match self.state {
            StreamState::Unopened => {}
            StreamState::Open => return Err(BatchError::SessionActive),
            StreamState::Closed => return Err(BatchError::StreamClosed),
            StreamState::Failed => return Err(BatchError::SessionFailed),
        }
        let result = self
            .accumulator
            .start(StartOptions {
                reset_state: true,
                update_status: false,
            })
            .await;
        self.track(result)
    }

    pub async fn add(&mut self, item: impl Into<BatchItem>) -> BatchResult<()> {
        self.ensure_open()?;
        let result = self.accumulator.add(item).await;
        self.track(result)
    }

    pub async fn add_json(&mut self, value: &Value) -> BatchResult<()> {
        self.ensure_open()?;
        let result = self.accumulator.add_json(value).await;
        self.track(result)
    }

    pub async fn flush(&mut self) -> BatchResult<()> {
        self.ensure_open()?;
        let result = self.accumulator.flush().await;
        self.track(result)
    }

    /// Flush what is left and close the stream.
    pub async fn close(mut self) -> BatchResult<SessionSummary> {
        self.ensure_open()?;
        let result = self
            .accumulator
            .end(EndOptions {
                delete_older: false,
                update_status: false,
            })
            .await;
        let summary = self.track(result)?;
        self.state = StreamState::Closed;
        info!(
            mode = self.kind().name(),
            batches = summary.batches,
            items = summary.items,
            "stream session closed"
        );
        Ok(summary)
    }

    fn ensure_open(&self) -> BatchResult<()> {
        match self.state {
            StreamState::Open => Ok(()),
            StreamState::Unopened => Err(BatchError::NotStarted),
            StreamState::Closed => Err(BatchError::StreamClosed),
            StreamState::Failed => Err(BatchError::SessionFailed),
        }
    }

    /// Follow the accumulator into `Open` or `Failed`. Validation errors
    /// leave the session usable.
    fn track<T>(&mut self, result: BatchResult<T>) -> BatchResult<T> {
        match &result {
            Ok(_) => self.state = StreamState::Open,
            Err(BatchError::Validation(_)) => {}
            Err(_) => self.state = StreamState::Failed,
        }
        result
    }
}

impl StreamSession {
    /// A remote stream was opened and never successfully closed.
    fn is_dangling(&self) -> bool {
        self.state != StreamState::Closed
            && self.accumulator.requires_close()
            && self.stream_id().is_some()
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if self.is_dangling() {
            warn!(
                stream_id = self.stream_id().unwrap_or_default(),
                state = ?self.state,
                buffered = self.accumulator.buffered(),
                "stream session dropped without closing; the remote stream is left dangling"
            );
        }
    }
}
