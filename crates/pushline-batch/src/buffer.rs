use bytes::Bytes;
use pushline_types::{BatchPayload, ItemKind, PendingItem, ValidationError, ValidationResult};

/// One encoded batch, ready to upload.
#[derive(Clone, Debug)]
pub struct EncodedBatch {
    pub payload: Bytes,
    pub adds: usize,
    pub deletes: usize,
    pub patches: usize,
}

impl EncodedBatch {
    pub fn items(&self) -> usize {
        self.adds + self.deletes + self.patches
    }
}

/// Greedy size-bounded buffer.
///
/// Every item is charged its serialized length plus one byte for the
/// separator. Before an item is admitted, the running size plus the item's
/// charge is compared against the ceiling minus the number of items
/// already buffered; when it does not fit, the buffer must be flushed
/// first.
#[derive(Debug)]
pub struct BatchBuffer {
    payload: BatchPayload,
    running: usize,
    ceiling: usize,
}

impl BatchBuffer {
    pub fn new(ceiling: usize) -> Self {
        Self {
            payload: BatchPayload::default(),
            running: 0,
            ceiling,
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn running_size(&self) -> usize {
        self.running
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Size charged for an item, or an error if it can never fit.
    pub fn charge(&self, item: &PendingItem) -> ValidationResult<usize> {
        let size = item.len() + 1;
        if size > self.ceiling {
            return Err(ValidationError::ItemTooLarge {
                size,
                max: self.ceiling,
            });
        }
        Ok(size)
    }

    /// Whether the buffer has to be flushed before an item of `size` bytes
    /// may be appended.
    pub fn needs_flush_for(&self, size: usize) -> bool {
        !self.is_empty() && self.running + size > self.ceiling.saturating_sub(self.len())
    }

    pub fn push(&mut self, item: PendingItem, size: usize) {
        self.payload.push(item);
        self.running += size;
    }

    /// Encode and drain the buffer. `None` when nothing is buffered.
    pub fn take(&mut self) -> serde_json::Result<Option<EncodedBatch>> {
        if self.is_empty() {
            return Ok(None);
        }
        let adds = self.payload.count(ItemKind::AddOrUpdate);
        let deletes = self.payload.count(ItemKind::Delete);
        let patches = self.payload.count(ItemKind::PartialUpdate);
        let payload = self.payload.take_encoded()?;
        self.running = 0;
        Ok(Some(EncodedBatch {
            payload: Bytes::from(payload),
            adds,
            deletes,
            patches,
        }))
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.payload = BatchPayload::default();
        self.running = 0;
    }
}
