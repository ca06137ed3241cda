//! Validation rules applied before anything is buffered or sent.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

use crate::error::{ValidationError, ValidationResult};
use crate::limits::MAX_QUEUE_DELAY_MINUTES;

/// A document id must be a URL with a scheme and either a host or a path.
///
/// # Examples
///
/// ```
/// use pushline_types::validate::validate_document_id;
///
/// assert!(validate_document_id("https://example.com/doc?id=1").is_ok());
/// assert!(validate_document_id("file:///share/report.pdf").is_ok());
/// assert!(validate_document_id("").is_err());
/// assert!(validate_document_id("no-scheme-here").is_err());
/// ```
pub fn validate_document_id(id: &str) -> ValidationResult<()> {
    if id.is_empty() {
        return Err(ValidationError::EmptyDocumentId);
    }

    let parsed = Url::parse(id).map_err(|e| ValidationError::InvalidDocumentId {
        id: id.to_string(),
        reason: e.to_string(),
    })?;

    if parsed.scheme().is_empty() {
        return Err(ValidationError::InvalidDocumentId {
            id: id.to_string(),
            reason: "missing scheme".into(),
        });
    }

    let has_host = parsed.host_str().is_some_and(|h| !h.is_empty());
    let has_path = !parsed.path().is_empty();
    if !has_host && !has_path {
        return Err(ValidationError::InvalidDocumentId {
            id: id.to_string(),
            reason: "missing path".into(),
        });
    }

    Ok(())
}

/// Queue delay for delete-older-than must lie in `[0, 1440]` minutes.
pub fn validate_queue_delay(minutes: i64) -> ValidationResult<u32> {
    if !(0..=MAX_QUEUE_DELAY_MINUTES).contains(&minutes) {
        return Err(ValidationError::QueueDelayOutOfRange(minutes));
    }
    Ok(minutes as u32)
}

/// Returns `true` if `s` is canonical standard base64 (decodes and
/// re-encodes to the same text).
pub fn is_base64(s: &str) -> bool {
    match STANDARD.decode(s) {
        Ok(bytes) => STANDARD.encode(bytes) == s,
        Err(_) => false,
    }
}
