use pushline_protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{request} failed with HTTP {status}{}: {body}", hint_suffix(.hint))]
    Status {
        request: &'static str,
        status: u16,
        body: String,
        hint: Option<&'static str>,
    },

    #[error("{request} could not be sent: {reason}")]
    Request {
        request: &'static str,
        reason: String,
        timeout: bool,
    },

    #[error("{request} returned an unusable response: {source}")]
    InvalidResponse {
        request: &'static str,
        #[source]
        source: ProtocolError,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl TransportError {
    /// HTTP status of a failed response, if the service answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Throttling, server-side failures, and timeouts are worth retrying;
    /// everything else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Request { timeout, .. } => *timeout,
            _ => false,
        }
    }
}

fn hint_suffix(hint: &Option<&'static str>) -> String {
    hint.map(|h| format!(" ({h})")).unwrap_or_default()
}

pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> TransportError {
        TransportError::Status {
            request: "RegisterBatch",
            status: code,
            body: String::new(),
            hint: pushline_protocol::status_hint(code),
        }
    }

    #[test]
    fn retryable_statuses() {
        assert!(status(429).is_retryable());
        assert!(status(500).is_retryable());
        assert!(status(504).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(403).is_retryable());
        assert!(!status(413).is_retryable());
    }

    #[test]
    fn message_includes_hint() {
        let msg = status(412).to_string();
        assert!(msg.contains("HTTP 412"));
        assert!(msg.contains("invalid source id"));
        assert!(!status(418).to_string().contains('('));
    }

    #[test]
    fn timeouts_are_retryable() {
        let err = TransportError::Request {
            request: "Upload",
            reason: "timed out".into(),
            timeout: true,
        };
        assert!(err.is_retryable());
        assert_eq!(err.status(), None);
    }
}
