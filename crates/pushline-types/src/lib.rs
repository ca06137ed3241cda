//! Foundation types for pushline.
//!
//! Records, permission models, ordering tokens, and the validation rules
//! that run before anything is buffered or sent. Every other pushline crate
//! depends on `pushline-types`.
//!
//! # Key Types
//!
//! - [`Document`]: A record to add or update, with its derived permanent id
//! - [`BatchItem`]: Add, delete, or partial update, decided at construction
//! - [`PendingItem`]: A validated item in its serialized form
//! - [`OrderingToken`]: Positive millisecond timestamp sequencing a session
//! - [`PermissionIdentity`] / [`IdentityExpansion`]: Document and provider identities
//! - [`ValidationError`] / [`ConfigError`]: Failures raised before any network call

pub mod canonical;
pub mod error;
pub mod item;
pub mod limits;
pub mod ordering;
pub mod permission;
pub mod record;
pub mod reserved;
pub mod validate;

pub use canonical::CanonicalJson;
pub use error::{ConfigError, ValidationError, ValidationResult};
pub use item::{BatchItem, BatchPayload, ItemKind, PendingItem};
pub use limits::{COMPRESSED_DATA_MAX_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS, MAX_REQUEST_SIZE};
pub use ordering::{ManualClock, OrderingClock, OrderingToken, WallClock};
pub use permission::{
    parse_identity_list, BatchPermissions, IdentityExpansion, IdentityList, IdentityType,
    PermissionIdentity, PermissionIdentityBody, PermissionLevel, PermissionSet, SecurityProvider,
    SecurityProviderReference,
};
pub use record::{
    permanent_id, CompressionType, Document, DocumentToDelete, PartialUpdate,
    PartialUpdateOperator,
};
pub use reserved::{is_reserved_key, ReservedKeySet};
