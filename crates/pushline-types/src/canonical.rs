use std::io;

use serde::Serialize;
use serde_json::value::RawValue;

/// Canonical serialized form shared by every record and permission value.
///
/// The canonical form is compact JSON. Its byte length is what the batch
/// accumulator charges against the size ceiling.
pub trait CanonicalJson: Serialize {
    /// Serialize to compact JSON text.
    fn to_canonical(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serialize into a raw JSON value that can be embedded in a larger
    /// payload without being re-encoded.
    fn to_raw(&self) -> serde_json::Result<Box<RawValue>> {
        RawValue::from_string(self.to_canonical()?)
    }

    /// Byte length of the canonical form, computed without allocating it.
    fn serialized_len(&self) -> serde_json::Result<usize> {
        let mut counter = ByteCounter(0);
        serde_json::to_writer(&mut counter, self)?;
        Ok(counter.0)
    }
}

struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CanonicalJson for serde_json::Value {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn length_matches_text() {
        let value = json!({"DocumentId": "https://a.example/x", "Title": "héllo"});
        let text = value.to_canonical().unwrap();
        assert_eq!(value.serialized_len().unwrap(), text.len());
    }

    #[test]
    fn raw_preserves_text() {
        let value = json!({"k": [1, 2, 3]});
        let raw = value.to_raw().unwrap();
        assert_eq!(raw.get(), r#"{"k":[1,2,3]}"#);
    }
}
