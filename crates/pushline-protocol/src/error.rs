use pushline_types::{ConfigError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("response is missing `{0}`")]
    MissingField(&'static str),

    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Human readable explanation for the status codes the Push API is known
/// to return.
pub fn status_hint(status: u16) -> Option<&'static str> {
    match status {
        429 => Some("Too many requests. Slow down your pushes! Are you using batch calls?"),
        413 => Some("Request too large. The document is too large to be processed. It should be under 5 MB."),
        412 => Some("Invalid or missing parameter - invalid source id"),
        403 => Some("Access denied. Validate that your API key has the proper access and that your organization and source id are properly specified"),
        401 => Some("Unauthorized or invalid token. Ensure your API key has the appropriate permissions."),
        400 => Some("Organization is paused (reactivate it) or the JSON body is invalid"),
        504 => Some("Timeout"),
        _ => None,
    }
}
