pub mod plain;
pub mod spool;
pub mod stream;
pub mod update;

use std::sync::Arc;

use pushline_transport::{PushTransport, TransferChannel};

pub use plain::PlainBatchStrategy;
pub use spool::LocalSpoolStrategy;
pub use stream::OpenStreamStrategy;
pub use update::UpdateStreamStrategy;

use crate::config::{BatchConfig, PushMode};
use crate::strategy::FlushStrategy;

/// Strategy for a configuration. A spool directory takes precedence over
/// the mode.
pub fn for_config(config: &BatchConfig, transport: Arc<dyn PushTransport>) -> Box<dyn FlushStrategy> {
    if let Some(spool) = &config.spool {
        return Box::new(LocalSpoolStrategy::new(spool.clone()));
    }
    let channel = TransferChannel::new(transport);
    match config.mode {
        PushMode::PlainBatch => Box::new(PlainBatchStrategy::new(channel)),
        PushMode::OpenStream => Box::new(OpenStreamStrategy::new(channel)),
        PushMode::UpdateStream => Box::new(UpdateStreamStrategy::new(channel)),
    }
}
