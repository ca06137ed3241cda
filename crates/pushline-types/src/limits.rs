//! Size limits enforced by the Push API.

/// Hard ceiling for one request or batch payload.
///
/// The service rejects anything above 256 MiB; 250 MiB is used to stay clear
/// of that, and 32 bytes are reserved for the JSON envelope of the batch.
pub const MAX_REQUEST_SIZE: usize = 250 * 1024 * 1024 - 32;

/// Largest inline payload a single-document call may embed. Larger payloads
/// must travel through a transfer location instead.
pub const COMPRESSED_DATA_MAX_SIZE: usize = 5 * 1024 * 1024;

/// Upper bound (inclusive) of the queue delay accepted by delete-older-than.
pub const MAX_QUEUE_DELAY_MINUTES: i64 = 1440;

/// Default HTTP request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 100;
