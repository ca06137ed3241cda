use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::Value;

use crate::canonical::CanonicalJson;
use crate::error::{ValidationError, ValidationResult};
use crate::record::{Document, DocumentToDelete, PartialUpdate};
use crate::validate::validate_document_id;

/// Which section of a batch payload an item belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemKind {
    AddOrUpdate,
    Delete,
    PartialUpdate,
}

impl ItemKind {
    /// Key of the section in the serialized batch.
    pub fn section(self) -> &'static str {
        match self {
            Self::AddOrUpdate => "AddOrUpdate",
            Self::Delete => "Delete",
            Self::PartialUpdate => "partialUpdate",
        }
    }
}

/// One unit of work for the batch accumulator.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchItem {
    AddOrUpdate(Document),
    Delete(DocumentToDelete),
    PartialUpdate(PartialUpdate),
}

impl BatchItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::AddOrUpdate(_) => ItemKind::AddOrUpdate,
            Self::Delete(_) => ItemKind::Delete,
            Self::PartialUpdate(_) => ItemKind::PartialUpdate,
        }
    }

    pub fn document_id(&self) -> &str {
        match self {
            Self::AddOrUpdate(doc) => doc.document_id(),
            Self::Delete(del) => &del.document_id,
            Self::PartialUpdate(patch) => &patch.document_id,
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        match self {
            Self::AddOrUpdate(doc) => doc.validate(),
            Self::Delete(del) => validate_document_id(&del.document_id),
            Self::PartialUpdate(patch) => validate_document_id(&patch.document_id),
        }
    }
}

impl From<Document> for BatchItem {
    fn from(doc: Document) -> Self {
        Self::AddOrUpdate(doc)
    }
}

impl From<DocumentToDelete> for BatchItem {
    fn from(del: DocumentToDelete) -> Self {
        Self::Delete(del)
    }
}

impl From<PartialUpdate> for BatchItem {
    fn from(patch: PartialUpdate) -> Self {
        Self::PartialUpdate(patch)
    }
}

/// A validated item in its serialized form, ready to be buffered.
///
/// The JSON text is produced once; its length is what the accumulator
/// charges against the ceiling.
#[derive(Debug)]
pub struct PendingItem {
    kind: ItemKind,
    raw: Box<RawValue>,
}

impl PendingItem {
    /// Validate and serialize an item.
    pub fn new(item: &BatchItem) -> ValidationResult<Self> {
        item.validate()?;
        let raw = match item {
            BatchItem::AddOrUpdate(doc) => doc.to_raw()?,
            BatchItem::Delete(del) => del.to_raw()?,
            BatchItem::PartialUpdate(patch) => patch.to_raw()?,
        };
        Ok(Self {
            kind: item.kind(),
            raw,
        })
    }

    /// Wrap a pre-built JSON object as an add, skipping record validation.
    pub fn raw_add(value: &Value) -> ValidationResult<Self> {
        if !value.is_object() {
            return Err(ValidationError::Serialization(
                "raw item must be a JSON object".into(),
            ));
        }
        Ok(Self {
            kind: ItemKind::AddOrUpdate,
            raw: value.to_raw()?,
        })
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    /// Serialized length in bytes.
    pub fn len(&self) -> usize {
        self.raw.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.get().is_empty()
    }

    pub fn as_json(&self) -> &str {
        self.raw.get()
    }
}

/// The three sections of one batch upload.
///
/// Items keep their insertion order within each section. Empty sections
/// are omitted from the payload.
#[derive(Debug, Default, Serialize)]
pub struct BatchPayload {
    #[serde(rename = "AddOrUpdate", skip_serializing_if = "Vec::is_empty")]
    add_or_update: Vec<Box<RawValue>>,
    #[serde(rename = "Delete", skip_serializing_if = "Vec::is_empty")]
    delete: Vec<Box<RawValue>>,
    #[serde(rename = "partialUpdate", skip_serializing_if = "Vec::is_empty")]
    partial_update: Vec<Box<RawValue>>,
}

impl BatchPayload {
    pub fn push(&mut self, item: PendingItem) {
        let section = match item.kind {
            ItemKind::AddOrUpdate => &mut self.add_or_update,
            ItemKind::Delete => &mut self.delete,
            ItemKind::PartialUpdate => &mut self.partial_update,
        };
        section.push(item.raw);
    }

    pub fn len(&self) -> usize {
        self.add_or_update.len() + self.delete.len() + self.partial_update.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, kind: ItemKind) -> usize {
        match kind {
            ItemKind::AddOrUpdate => self.add_or_update.len(),
            ItemKind::Delete => self.delete.len(),
            ItemKind::PartialUpdate => self.partial_update.len(),
        }
    }

    /// Encode the payload and empty every section.
    pub fn take_encoded(&mut self) -> serde_json::Result<Vec<u8>> {
        let bytes = serde_json::to_vec(self)?;
        *self = Self::default();
        Ok(bytes)
    }
}
