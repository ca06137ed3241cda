use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("validation failed: {0}")]
    Validation(#[from] pushline_types::ValidationError),

    #[error("configuration error: {0}")]
    Config(#[from] pushline_types::ConfigError),

    #[error("cannot read config {}: {reason}", path.display())]
    ConfigFile { path: PathBuf, reason: String },

    #[error("protocol error: {0}")]
    Protocol(#[from] pushline_protocol::ProtocolError),

    #[error("transport error: {0}")]
    Transport(#[from] pushline_transport::TransportError),

    #[error("batch error: {0}")]
    Batch(#[from] pushline_batch::BatchError),
}

impl From<serde_json::Error> for SdkError {
    fn from(e: serde_json::Error) -> Self {
        Self::Validation(e.into())
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
