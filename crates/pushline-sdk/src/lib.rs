//! High-level SDK for pushline.
//!
//! [`PushClient`] is the main entry point for applications pushing records
//! and permissions into a source. It is built from a [`PushConfig`], usually
//! loaded from TOML, and hands out batch accumulators, stream sessions, and
//! permission batches that share its transport.

pub mod client;
pub mod config;
pub mod error;

pub use client::PushClient;
pub use config::{PushConfig, API_KEY_ENV};
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use pushline_batch::{
    BatchAccumulator, EndOptions, PermissionBatch, PushMode, SessionSummary, SpoolConfig,
    StartOptions, StreamSession,
};
pub use pushline_protocol::{ApiKey, Environment, SourceStatus};
pub use pushline_transport::RetryPolicy;
pub use pushline_types::{
    CompressionType, Document, DocumentToDelete, IdentityExpansion, IdentityType, OrderingToken,
    PartialUpdate, PartialUpdateOperator, PermissionIdentity, PermissionIdentityBody,
};
