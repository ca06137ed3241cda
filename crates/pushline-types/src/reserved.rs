use std::collections::HashSet;
use std::sync::LazyLock;

/// Field names that collide with structural document fields.
const RESERVED_KEYS: &[&str] = &[
    "author",
    "clickableUri",
    "compressedBinaryData",
    "compressedBinaryDataFileId",
    "compressionType",
    "data",
    "date",
    "documentId",
    "fileExtension",
    "parentId",
    "permissions",
    "orderingId",
];

static RESERVED: LazyLock<ReservedKeySet> = LazyLock::new(ReservedKeySet::build);

/// Case-insensitive set of metadata keys that may not be set by callers.
#[derive(Debug)]
pub struct ReservedKeySet {
    keys: HashSet<String>,
}

impl ReservedKeySet {
    fn build() -> Self {
        Self {
            keys: RESERVED_KEYS.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// The process-wide reserved key set.
    pub fn global() -> &'static ReservedKeySet {
        &RESERVED
    }

    /// Returns `true` if `key` names a reserved field, ignoring case.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(&key.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Shorthand for `ReservedKeySet::global().contains(key)`.
pub fn is_reserved_key(key: &str) -> bool {
    ReservedKeySet::global().contains(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_regardless_of_case() {
        assert!(is_reserved_key("documentid"));
        assert!(is_reserved_key("DOCUMENTID"));
        assert!(is_reserved_key("DocumentId"));
        assert!(is_reserved_key("compressedbinarydatafileid"));
    }

    #[test]
    fn ordinary_keys_pass() {
        assert!(!is_reserved_key("connectortype"));
        assert!(!is_reserved_key("title"));
        assert!(!is_reserved_key(""));
    }

    #[test]
    fn holds_every_structural_field() {
        assert_eq!(ReservedKeySet::global().len(), RESERVED_KEYS.len());
        for key in RESERVED_KEYS {
            assert!(is_reserved_key(key));
        }
    }
}
