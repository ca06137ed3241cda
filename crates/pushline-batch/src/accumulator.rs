use std::sync::Arc;

use pushline_protocol::{PushRequest, SourceStatus};
use pushline_transport::{PushTransport, StatusNotifier};
use pushline_types::{
    BatchItem, Document, DocumentToDelete, OrderingClock, OrderingToken, PartialUpdate,
    PendingItem, ValidationError,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::buffer::BatchBuffer;
use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult};
use crate::strategies;
use crate::strategy::{FlushStrategy, StrategyKind};

// ---------------------------------------------------------------------------
// Options and summary
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartOptions {
    /// Drop anything still buffered from an earlier session.
    pub reset_state: bool,
    /// Report the source as rebuilding (plain batches only).
    pub update_status: bool,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            reset_state: true,
            update_status: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndOptions {
    /// Delete everything older than the session's start token (plain
    /// batches only).
    pub delete_older: bool,
    /// Report the source as idle (plain batches only).
    pub update_status: bool,
}

impl Default for EndOptions {
    fn default() -> Self {
        Self {
            delete_older: false,
            update_status: true,
        }
    }
}

/// What a session delivered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub batches: usize,
    pub items: usize,
    pub bytes: usize,
    pub token: Option<OrderingToken>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionState {
    Idle,
    Active,
    Failed,
}

// ---------------------------------------------------------------------------
// BatchAccumulator
// ---------------------------------------------------------------------------

/// Collects items into size-bounded batches and hands each full batch to a
/// [`FlushStrategy`].
///
/// Incremental use is `start` → `add`* → `end`; [`Self::submit`] does the
/// same for a complete set of items in one call. Every mutating operation
/// takes `&mut self`, so one accumulator is never driven concurrently;
/// independent accumulators are independent sessions.
pub struct BatchAccumulator {
    strategy: Box<dyn FlushStrategy>,
    buffer: BatchBuffer,
    transport: Arc<dyn PushTransport>,
    notifier: StatusNotifier,
    clock: Arc<dyn OrderingClock>,
    state: SessionState,
    token: Option<OrderingToken>,
    summary: SessionSummary,
}

impl BatchAccumulator {
    /// Accumulator with the strategy the configuration selects.
    pub fn new(
        config: &BatchConfig,
        transport: Arc<dyn PushTransport>,
        clock: Arc<dyn OrderingClock>,
    ) -> BatchResult<Self> {
        config.validate()?;
        let strategy = strategies::for_config(config, transport.clone());
        Ok(Self::with_strategy(strategy, config.ceiling, transport, clock))
    }

    /// Accumulator driving an explicit strategy.
    pub fn with_strategy(
        strategy: Box<dyn FlushStrategy>,
        ceiling: usize,
        transport: Arc<dyn PushTransport>,
        clock: Arc<dyn OrderingClock>,
    ) -> Self {
        Self {
            strategy,
            buffer: BatchBuffer::new(ceiling),
            notifier: StatusNotifier::new(transport.clone()),
            transport,
            clock,
            state: SessionState::Idle,
            token: None,
            summary: SessionSummary::default(),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn ceiling(&self) -> usize {
        self.buffer.ceiling()
    }

    /// Token minted by the last `start`.
    pub fn token(&self) -> Option<OrderingToken> {
        self.token
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn running_size(&self) -> usize {
        self.buffer.running_size()
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.strategy.stream_id()
    }

    pub(crate) fn requires_close(&self) -> bool {
        self.strategy.requires_close()
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// Begin a session: mint its ordering token and open the strategy.
    pub async fn start(&mut self, options: StartOptions) -> BatchResult<OrderingToken> {
        if self.state == SessionState::Active {
            return Err(BatchError::SessionActive);
        }
        if options.reset_state || self.state == SessionState::Failed {
            self.buffer.clear();
        }
        let token = self.clock.mint();
        self.token = Some(token);
        self.summary = SessionSummary {
            token: Some(token),
            ..SessionSummary::default()
        };
        debug!(mode = self.kind().name(), %token, "starting session");

        // The session counts as failed until everything below succeeds.
        self.state = SessionState::Failed;
        if options.update_status && self.kind().manages_source_lifecycle() {
            self.notifier.notify(SourceStatus::Rebuild).await?;
        }
        self.strategy.open().await?;
        self.state = SessionState::Active;
        Ok(token)
    }

    /// Validate and buffer an item, flushing first when it would overflow
    /// the current batch.
    pub async fn add(&mut self, item: impl Into<BatchItem>) -> BatchResult<()> {
        self.ensure_active()?;
        let item = item.into();
        let pending = PendingItem::new(&item)?;
        debug!(document_id = item.document_id(), bytes = pending.len(), "add");
        self.admit(pending).await
    }

    pub async fn add_document(&mut self, document: Document) -> BatchResult<()> {
        self.add(document).await
    }

    pub async fn delete_document(&mut self, delete: DocumentToDelete) -> BatchResult<()> {
        self.add(delete).await
    }

    pub async fn update_document(&mut self, patch: PartialUpdate) -> BatchResult<()> {
        self.add(patch).await
    }

    /// Buffer a pre-built JSON object as an add without record validation.
    pub async fn add_json(&mut self, value: &Value) -> BatchResult<()> {
        self.ensure_active()?;
        let pending = PendingItem::raw_add(value)?;
        self.admit(pending).await
    }

    /// Send whatever is buffered. Does nothing when the buffer is empty.
    pub async fn flush(&mut self) -> BatchResult<()> {
        self.ensure_active()?;
        self.flush_buffered().await
    }

    /// Flush the rest, close the strategy, and run the end-of-session
    /// source actions.
    pub async fn end(&mut self, options: EndOptions) -> BatchResult<SessionSummary> {
        self.ensure_active()?;
        self.flush_buffered().await?;

        self.state = SessionState::Failed;
        self.strategy.close().await?;
        if self.kind().manages_source_lifecycle() {
            if options.delete_older {
                if let Some(token) = self.token {
                    self.delete_older_than(token).await?;
                }
            }
            if options.update_status {
                self.notifier.notify(SourceStatus::Idle).await?;
            }
        }
        self.state = SessionState::Idle;
        info!(
            batches = self.summary.batches,
            items = self.summary.items,
            bytes = self.summary.bytes,
            "session ended"
        );
        Ok(self.summary)
    }

    /// Push a complete set of items in one call.
    ///
    /// Items are packed in input order (adds, then deletes, then patches)
    /// with the same size rules as [`Self::add`]. Fails without any network
    /// call when there is nothing to add or delete, or when any item is
    /// invalid.
    pub async fn submit(
        &mut self,
        adds: Vec<Document>,
        deletes: Vec<DocumentToDelete>,
        patches: Vec<PartialUpdate>,
        update_status: bool,
        delete_older: bool,
    ) -> BatchResult<SessionSummary> {
        if self.state == SessionState::Active {
            return Err(BatchError::SessionActive);
        }
        if adds.is_empty() && deletes.is_empty() {
            return Err(ValidationError::EmptyBatch.into());
        }

        let items = adds
            .into_iter()
            .map(BatchItem::from)
            .chain(deletes.into_iter().map(BatchItem::from))
            .chain(patches.into_iter().map(BatchItem::from));
        let mut pending = Vec::new();
        for item in items {
            let item = PendingItem::new(&item)?;
            self.buffer.charge(&item)?;
            pending.push(item);
        }

        let token = self.start(StartOptions {
            reset_state: true,
            update_status: false,
        })
        .await?;
        if update_status {
            self.state = SessionState::Failed;
            self.notifier.notify(SourceStatus::Rebuild).await?;
            self.state = SessionState::Active;
        }
        for item in pending {
            self.admit(item).await?;
        }
        self.flush_buffered().await?;

        self.state = SessionState::Failed;
        self.strategy.close().await?;
        if delete_older && self.kind().manages_source_lifecycle() {
            self.delete_older_than(token).await?;
        }
        if update_status {
            self.notifier.notify(SourceStatus::Idle).await?;
        }
        self.state = SessionState::Idle;
        info!(
            batches = self.summary.batches,
            items = self.summary.items,
            "one-shot push complete"
        );
        Ok(self.summary)
    }

    fn ensure_active(&self) -> BatchResult<()> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Idle => Err(BatchError::NotStarted),
            SessionState::Failed => Err(BatchError::SessionFailed),
        }
    }

    async fn admit(&mut self, pending: PendingItem) -> BatchResult<()> {
        let size = self.buffer.charge(&pending)?;
        if self.buffer.needs_flush_for(size) {
            debug!(
                running = self.buffer.running_size(),
                size,
                ceiling = self.buffer.ceiling(),
                "ceiling reached, flushing"
            );
            self.flush_buffered().await?;
        }
        self.buffer.push(pending, size);
        Ok(())
    }

    async fn flush_buffered(&mut self) -> BatchResult<()> {
        let batch = match self.buffer.take() {
            Ok(Some(batch)) => batch,
            Ok(None) => return Ok(()),
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e.into());
            }
        };
        let items = batch.items();
        let bytes = batch.payload.len();
        if let Err(e) = self.strategy.flush(batch).await {
            warn!(mode = self.kind().name(), error = %e, "flush failed, session aborted");
            self.state = SessionState::Failed;
            return Err(e);
        }
        self.summary.batches += 1;
        self.summary.items += items;
        self.summary.bytes += bytes;
        Ok(())
    }

    async fn delete_older_than(&self, token: OrderingToken) -> BatchResult<()> {
        info!(%token, "deleting documents older than session start");
        self.transport
            .execute(&PushRequest::DeleteOlderThan {
                ordering: token,
                queue_delay: None,
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PushMode, SpoolConfig};
    use pushline_transport::MemoryTransport;
    use pushline_types::{CanonicalJson, ManualClock, PartialUpdateOperator};

    fn setup(mode: PushMode, ceiling: usize) -> (Arc<MemoryTransport>, BatchAccumulator) {
        let memory = Arc::new(MemoryTransport::new());
        let config = BatchConfig::new(mode).with_ceiling(ceiling).unwrap();
        let acc = BatchAccumulator::new(
            &config,
            memory.clone(),
            Arc::new(ManualClock::new(1_000, 1)),
        )
        .unwrap();
        (memory, acc)
    }

    fn doc(n: usize) -> Document {
        Document::new(format!("https://example.com/doc/{n}"))
    }

    /// A document whose canonical form is exactly `len` bytes.
    fn sized_doc(n: usize, len: usize) -> Document {
        let base = doc(n);
        let base_len = base.serialized_len().unwrap();
        // ,"Title":"" adds 11 bytes of framing.
        base.with_title("x".repeat(len - base_len - 11))
    }

    /// A raw add of exactly `len` bytes.
    fn sized_raw(id: &str, len: usize) -> Value {
        // {"DocumentId":"","pad":""} is 26 bytes before the id and padding.
        serde_json::json!({"DocumentId": id, "pad": "p".repeat(len - 26 - id.len())})
    }

    fn uploaded(memory: &MemoryTransport) -> Vec<Value> {
        memory
            .uploads()
            .iter()
            .map(|(_, body)| serde_json::from_slice(body).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn ceiling_scenario_flushes_before_second_item() {
        let (memory, mut acc) = setup(PushMode::PlainBatch, 150);
        let d1 = sized_raw("d1", 100);
        let d2 = sized_raw("d2", 100);
        assert_eq!(d1.serialized_len().unwrap(), 100);

        acc.start(StartOptions::default()).await.unwrap();
        acc.add_json(&d1).await.unwrap();
        assert!(memory.uploads().is_empty());
        acc.add_json(&d2).await.unwrap();

        let batches = uploaded(&memory);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0]["AddOrUpdate"].as_array().unwrap().len(), 1);
        assert_eq!(batches[0]["AddOrUpdate"][0]["DocumentId"], "d1");
        assert_eq!(acc.buffered(), 1);

        acc.end(EndOptions::default()).await.unwrap();
        let batches = uploaded(&memory);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1]["AddOrUpdate"][0]["DocumentId"], "d2");
    }

    #[tokio::test]
    async fn oversize_item_leaves_buffer_untouched() {
        let (memory, mut acc) = setup(PushMode::PlainBatch, 400);
        acc.start(StartOptions::default()).await.unwrap();
        acc.add(sized_doc(1, 150)).await.unwrap();
        let running = acc.running_size();
        assert_eq!(running, 151);

        let err = acc.add(sized_doc(2, 400)).await.unwrap_err();
        assert!(matches!(
            err,
            BatchError::Validation(ValidationError::ItemTooLarge { size: 401, max: 400 })
        ));
        assert_eq!(acc.buffered(), 1);
        assert_eq!(acc.running_size(), running);
        assert!(memory.uploads().is_empty());
        assert!(acc.is_active());
    }

    #[tokio::test]
    async fn invalid_item_leaves_buffer_untouched() {
        let (_memory, mut acc) = setup(PushMode::PlainBatch, 1000);
        acc.start(StartOptions::default()).await.unwrap();
        let err = acc.add(Document::new("not a url")).await.unwrap_err();
        assert!(matches!(err, BatchError::Validation(_)));
        assert_eq!(acc.buffered(), 0);
        assert!(acc.is_active());
    }

    #[tokio::test]
    async fn start_then_end_uploads_nothing() {
        let (memory, mut acc) = setup(PushMode::PlainBatch, 1000);
        acc.start(StartOptions::default()).await.unwrap();
        let summary = acc.end(EndOptions::default()).await.unwrap();
        assert_eq!(summary.batches, 0);
        assert!(memory.uploads().is_empty());
        assert_eq!(memory.call_names(), ["UpdateStatus", "UpdateStatus"]);
    }

    #[tokio::test]
    async fn plain_batch_call_sequence() {
        let (memory, mut acc) = setup(PushMode::PlainBatch, 10_000);
        acc.start(StartOptions::default()).await.unwrap();
        acc.add(doc(1)).await.unwrap();
        acc.add(DocumentToDelete::new("https://example.com/doc/2")).await.unwrap();
        acc.end(EndOptions {
            delete_older: true,
            update_status: true,
        })
        .await
        .unwrap();

        assert_eq!(
            memory.call_names(),
            [
                "UpdateStatus",
                "AcquireLocation",
                "Upload",
                "RegisterBatch",
                "DeleteOlderThan",
                "UpdateStatus"
            ]
        );
        let batch = &uploaded(&memory)[0];
        assert_eq!(batch["AddOrUpdate"].as_array().unwrap().len(), 1);
        assert_eq!(batch["Delete"].as_array().unwrap().len(), 1);
        assert!(batch.get("partialUpdate").is_none());
    }

    #[tokio::test]
    async fn delete_older_uses_session_token() {
        let (memory, mut acc) = setup(PushMode::PlainBatch, 10_000);
        let token = acc.start(StartOptions::default()).await.unwrap();
        acc.add(doc(1)).await.unwrap();
        acc.end(EndOptions {
            delete_older: true,
            update_status: false,
        })
        .await
        .unwrap();

        let delete = memory
            .calls()
            .into_iter()
            .find(|c| c.name == "DeleteOlderThan")
            .unwrap();
        assert_eq!(
            delete.route.query,
            vec![("orderingId", token.get().to_string())]
        );
        assert_eq!(token.get(), 1_000);
    }

    #[tokio::test]
    async fn open_stream_call_sequence() {
        let (memory, mut acc) = setup(PushMode::OpenStream, 10_000);
        acc.start(StartOptions::default()).await.unwrap();
        assert_eq!(acc.stream_id(), Some("stream-1"));
        acc.add(doc(1)).await.unwrap();
        acc.flush().await.unwrap();
        acc.add(doc(2)).await.unwrap();
        acc.end(EndOptions {
            delete_older: true,
            update_status: true,
        })
        .await
        .unwrap();

        assert_eq!(
            memory.call_names(),
            [
                "OpenStream",
                "Upload",
                "StreamChunk",
                "Upload",
                "StreamChunk",
                "CloseStream"
            ]
        );
        let uris: Vec<String> = memory.uploads().into_iter().map(|(uri, _)| uri).collect();
        assert_eq!(uris, ["memory://upload/1", "memory://upload/2"]);
    }

    #[tokio::test]
    async fn update_stream_call_sequence() {
        let (memory, mut acc) = setup(PushMode::UpdateStream, 10_000);
        acc.start(StartOptions::default()).await.unwrap();
        acc.add(PartialUpdate::new(
            "https://example.com/doc/1",
            PartialUpdateOperator::FieldValueReplace,
            "price",
            10,
        ))
        .await
        .unwrap();
        acc.end(EndOptions::default()).await.unwrap();

        assert_eq!(
            memory.call_names(),
            ["AcquireLocation", "Upload", "RegisterStreamUpdate"]
        );
        assert_eq!(
            uploaded(&memory)[0]["partialUpdate"][0]["operator"],
            "fieldValueReplace"
        );
    }

    #[tokio::test]
    async fn add_requires_start() {
        let (_memory, mut acc) = setup(PushMode::PlainBatch, 1000);
        assert!(matches!(
            acc.add(doc(1)).await,
            Err(BatchError::NotStarted)
        ));
        assert!(matches!(acc.flush().await, Err(BatchError::NotStarted)));
    }

    #[tokio::test]
    async fn flush_failure_fails_session_until_restart() {
        let (memory, mut acc) = setup(PushMode::PlainBatch, 10_000);
        acc.start(StartOptions::default()).await.unwrap();
        acc.add(doc(1)).await.unwrap();
        memory.fail_next("RegisterBatch", 500);

        assert!(matches!(acc.flush().await, Err(BatchError::Transport(_))));
        assert!(matches!(acc.add(doc(2)).await, Err(BatchError::SessionFailed)));
        assert!(matches!(
            acc.end(EndOptions::default()).await,
            Err(BatchError::SessionFailed)
        ));

        acc.start(StartOptions::default()).await.unwrap();
        acc.add(doc(3)).await.unwrap();
        acc.end(EndOptions::default()).await.unwrap();
        assert_eq!(acc.summary().batches, 1);
    }

    #[tokio::test]
    async fn add_json_skips_record_validation() {
        let (memory, mut acc) = setup(PushMode::PlainBatch, 10_000);
        acc.start(StartOptions::default()).await.unwrap();
        acc.add_json(&serde_json::json!({"DocumentId": "anything", "title": "raw"}))
            .await
            .unwrap();
        acc.end(EndOptions::default()).await.unwrap();
        assert_eq!(uploaded(&memory)[0]["AddOrUpdate"][0]["title"], "raw");
    }

    #[tokio::test]
    async fn submit_requires_adds_or_deletes() {
        let (memory, mut acc) = setup(PushMode::PlainBatch, 10_000);
        let patch = PartialUpdate::new(
            "https://example.com/doc/1",
            PartialUpdateOperator::ArrayAppend,
            "tags",
            serde_json::json!(["a"]),
        );
        let err = acc
            .submit(vec![], vec![], vec![patch], true, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BatchError::Validation(ValidationError::EmptyBatch)
        ));
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn submit_packs_in_input_order() {
        let (memory, mut acc) = setup(PushMode::PlainBatch, 450);
        let adds = vec![sized_doc(1, 200), sized_doc(2, 200), sized_doc(3, 200)];
        let deletes = vec![DocumentToDelete::new("https://example.com/doc/9")];
        let summary = acc
            .submit(adds, deletes, vec![], true, true)
            .await
            .unwrap();

        assert_eq!(summary.items, 4);
        let batches = uploaded(&memory);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0]["AddOrUpdate"].as_array().unwrap().len(), 2);
        assert_eq!(batches[1]["AddOrUpdate"].as_array().unwrap().len(), 1);
        assert_eq!(batches[1]["Delete"].as_array().unwrap().len(), 1);

        let names = memory.call_names();
        assert_eq!(names.first(), Some(&"UpdateStatus"));
        assert_eq!(names.last(), Some(&"UpdateStatus"));
        assert!(names.contains(&"DeleteOlderThan"));
    }

    #[tokio::test]
    async fn submit_rejects_invalid_items_before_any_call() {
        let (memory, mut acc) = setup(PushMode::PlainBatch, 10_000);
        let err = acc
            .submit(vec![doc(1), Document::new("")], vec![], vec![], true, false)
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Validation(ValidationError::EmptyDocumentId)));
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn submit_in_stream_mode_closes_stream() {
        let (memory, mut acc) = setup(PushMode::OpenStream, 10_000);
        acc.submit(vec![doc(1)], vec![], vec![], false, true)
            .await
            .unwrap();
        assert_eq!(
            memory.call_names(),
            ["OpenStream", "Upload", "StreamChunk", "CloseStream"]
        );
    }

    #[tokio::test]
    async fn submit_during_session_is_rejected() {
        let (_memory, mut acc) = setup(PushMode::PlainBatch, 10_000);
        acc.start(StartOptions::default()).await.unwrap();
        assert!(matches!(
            acc.submit(vec![doc(1)], vec![], vec![], false, false).await,
            Err(BatchError::SessionActive)
        ));
    }

    #[tokio::test]
    async fn spool_writes_numbered_files() {
        let dir = tempfile::tempdir().unwrap();
        let memory = Arc::new(MemoryTransport::new());
        let mut spool = SpoolConfig::new(dir.path().join("batch"));
        spool.offset = 5;
        let config = BatchConfig::new(PushMode::OpenStream)
            .with_ceiling(450)
            .unwrap()
            .with_spool(spool);
        let mut acc =
            BatchAccumulator::new(&config, memory.clone(), Arc::new(ManualClock::new(1, 1))).unwrap();
        assert_eq!(acc.kind(), StrategyKind::LocalSpool);

        acc.start(StartOptions::default()).await.unwrap();
        for n in 0..3 {
            acc.add(sized_doc(n, 200)).await.unwrap();
        }
        acc.end(EndOptions::default()).await.unwrap();

        let first = std::fs::read(dir.path().join("batch/5_batch.json")).unwrap();
        let second = std::fs::read(dir.path().join("batch/6_batch.json")).unwrap();
        assert!(!dir.path().join("batch/7_batch.json").exists());
        let first: Value = serde_json::from_slice(&first).unwrap();
        let second: Value = serde_json::from_slice(&second).unwrap();
        assert_eq!(first["AddOrUpdate"].as_array().unwrap().len(), 2);
        assert_eq!(second["AddOrUpdate"].as_array().unwrap().len(), 1);
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn start_during_session_keeps_open_stream() {
        let (memory, mut acc) = setup(PushMode::OpenStream, 10_000);
        let token = acc.start(StartOptions::default()).await.unwrap();
        assert!(matches!(
            acc.start(StartOptions::default()).await,
            Err(BatchError::SessionActive)
        ));
        assert_eq!(acc.token(), Some(token));
        assert_eq!(acc.stream_id(), Some("stream-1"));

        acc.end(EndOptions::default()).await.unwrap();
        assert_eq!(memory.call_names(), ["OpenStream", "CloseStream"]);
    }

    #[tokio::test]
    async fn tokens_are_per_session() {
        let (_memory, mut acc) = setup(PushMode::PlainBatch, 1000);
        let a = acc.start(StartOptions::default()).await.unwrap();
        acc.end(EndOptions::default()).await.unwrap();
        let b = acc.start(StartOptions::default()).await.unwrap();
        assert!(b > a);
        assert_eq!(acc.token(), Some(b));
    }

    mod ceiling {
        use super::*;
        use proptest::prelude::*;
        use serde_json::value::RawValue;

        #[derive(serde::Deserialize)]
        struct Sections<'a> {
            #[serde(rename = "AddOrUpdate", borrow, default)]
            adds: Vec<&'a RawValue>,
            #[serde(rename = "Delete", borrow, default)]
            deletes: Vec<&'a RawValue>,
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(48))]

            #[test]
            fn batches_never_exceed_ceiling(
                ceiling in 200usize..2_000,
                items in proptest::collection::vec((0usize..400, any::<bool>()), 1..40),
            ) {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap();
                let (memory, outcome) = runtime.block_on(async {
                    let (memory, mut acc) = setup(PushMode::PlainBatch, ceiling);
                    acc.start(StartOptions::default()).await.unwrap();
                    let mut accepted = 0usize;
                    for (n, (title_len, delete)) in items.iter().enumerate() {
                        let result = if *delete {
                            acc.add(DocumentToDelete::new(format!("https://example.com/{n}"))).await
                        } else {
                            acc.add(doc(n).with_title("t".repeat(*title_len))).await
                        };
                        match result {
                            Ok(()) => accepted += 1,
                            Err(BatchError::Validation(ValidationError::ItemTooLarge { .. })) => {}
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                    let summary = acc.end(EndOptions::default()).await.unwrap();
                    (memory, (accepted, summary))
                });
                let (accepted, summary) = outcome;

                let mut seen = 0usize;
                for (_, body) in memory.uploads() {
                    let sections: Sections = serde_json::from_slice(&body).unwrap();
                    let lens: Vec<usize> = sections
                        .adds
                        .iter()
                        .chain(sections.deletes.iter())
                        .map(|raw| raw.get().len())
                        .collect();
                    prop_assert!(!lens.is_empty());
                    let separators = lens.len() - 1;
                    prop_assert!(lens.iter().sum::<usize>() + separators <= ceiling);
                    seen += lens.len();
                }
                prop_assert_eq!(seen, accepted);
                prop_assert_eq!(summary.items, accepted);
            }
        }
    }
}
