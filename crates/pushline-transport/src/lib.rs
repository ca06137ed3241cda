//! Transports for pushline.
//!
//! [`PushTransport`] is the seam between the pipeline and the network.
//! [`HttpTransport`] talks to the real service with `reqwest`,
//! [`MemoryTransport`] records calls for tests, and [`RetryingTransport`]
//! adds opt-in bounded retries. [`TransferChannel`] and [`StatusNotifier`]
//! are the typed clients built on top of a transport.

pub mod channel;
pub mod error;
pub mod http;
pub mod memory;
pub mod notifier;
pub mod retry;
pub mod transport;

pub use channel::TransferChannel;
pub use error::{TransportError, TransportResult};
pub use http::{HttpSettings, HttpTransport};
pub use memory::{MemoryTransport, RecordedCall};
pub use notifier::StatusNotifier;
pub use retry::{RetryPolicy, RetryingTransport};
pub use transport::PushTransport;
