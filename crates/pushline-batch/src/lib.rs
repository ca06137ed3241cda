//! Batch accumulation for pushline.
//!
//! Items are validated and serialized as they arrive, packed greedily into
//! batches that stay under a byte ceiling, and handed to a
//! [`FlushStrategy`] that decides where each batch goes: a registered
//! document batch, a chunk of an open stream, a stream update, or a file on
//! local disk.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use pushline_batch::{BatchAccumulator, BatchConfig, EndOptions, PushMode, StartOptions};
//! use pushline_transport::MemoryTransport;
//! use pushline_types::{Document, ManualClock};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let transport = Arc::new(MemoryTransport::new());
//! let config = BatchConfig::new(PushMode::PlainBatch);
//! let mut acc =
//!     BatchAccumulator::new(&config, transport.clone(), Arc::new(ManualClock::new(1, 1))).unwrap();
//!
//! acc.start(StartOptions::default()).await.unwrap();
//! acc.add(Document::new("https://example.com/a").with_title("A")).await.unwrap();
//! let summary = acc.end(EndOptions::default()).await.unwrap();
//!
//! assert_eq!(summary.batches, 1);
//! assert_eq!(transport.uploads().len(), 1);
//! # }
//! ```

pub mod accumulator;
pub mod buffer;
pub mod config;
pub mod error;
pub mod permission;
pub mod session;
pub mod strategies;
pub mod strategy;

pub use accumulator::{BatchAccumulator, EndOptions, SessionSummary, StartOptions};
pub use buffer::{BatchBuffer, EncodedBatch};
pub use config::{BatchConfig, PushMode, SpoolConfig};
pub use error::{BatchError, BatchResult};
pub use permission::PermissionBatch;
pub use session::{StreamSession, StreamState};
pub use strategies::{
    LocalSpoolStrategy, OpenStreamStrategy, PlainBatchStrategy, UpdateStreamStrategy,
};
pub use strategy::{FlushStrategy, StrategyKind};
