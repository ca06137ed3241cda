use thiserror::Error;

/// Errors raised synchronously, before any network call, when a record,
/// permission, or call argument breaks a validation rule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("document id is empty")]
    EmptyDocumentId,

    #[error("document id is not a valid URL ({reason}): {id}")]
    InvalidDocumentId { id: String, reason: String },

    #[error("both Data and CompressedBinaryData are set on {0}")]
    ConflictingPayloads(String),

    #[error("{0} is a reserved field and cannot be set as metadata")]
    ReservedKey(String),

    #[error("metadata key is empty")]
    EmptyKey,

    #[error("{field}: value not set")]
    EmptyValue { field: &'static str },

    #[error("value for {field} must be base64 encoded")]
    InvalidBase64 { field: &'static str },

    #[error("item of {size} bytes exceeds the maximum of {max} bytes")]
    ItemTooLarge { size: usize, max: usize },

    #[error("identity list mixes record shapes: expected {expected}, found {found} at index {index}")]
    MixedIdentityList {
        expected: &'static str,
        found: &'static str,
        index: usize,
    },

    #[error("malformed identity record at index {index}: {reason}")]
    MalformedIdentity { index: usize, reason: String },

    #[error("ordering token must be a positive 64 bit integer")]
    NonPositiveOrderingToken,

    #[error("queue delay must be between 0 and 1440 minutes, got {0}")]
    QueueDelayOutOfRange(i64),

    #[error("invalid date `{value}`: {reason}")]
    InvalidDate { value: String, reason: String },

    #[error("nothing to push: no documents to add or delete")]
    EmptyBatch,

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Errors in client configuration: limits, credentials, and mode choices.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("requested ceiling of {requested} bytes exceeds the hard maximum of {max} bytes")]
    CeilingTooLarge { requested: usize, max: usize },

    #[error("ceiling must be greater than zero")]
    ZeroCeiling,

    #[error("invalid API key format")]
    MalformedCredential,

    #[error("{operation} is not available in {mode} mode")]
    InvalidModeCombination {
        operation: &'static str,
        mode: String,
    },

    #[error("missing configuration value: {0}")]
    Missing(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ValidationResult<T> = Result<T, ValidationError>;
