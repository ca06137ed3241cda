use pushline_protocol::ProtocolError;
use pushline_transport::TransportError;
use pushline_types::{ConfigError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("session not started; call start() first")]
    NotStarted,

    #[error("session already started; end it before starting another")]
    SessionActive,

    #[error("session failed during an earlier flush; call start() to begin a new one")]
    SessionFailed,

    #[error("stream session is closed")]
    StreamClosed,

    #[error("spool error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for BatchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Validation(e.into())
    }
}

pub type BatchResult<T> = Result<T, BatchError>;
