use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use communal_core::{Document, DocumentPath, DocumentStore, StoreError, StoreResult, Transaction};
use log::debug;
use parking_lot::Mutex;
use serde_json::{Map, Value};

/// An in-memory document store with optimistic transactions.
///
/// Every committed document carries the version of the commit that wrote it.
/// A transaction remembers the version it observed for each read (0 when missing),
/// and its commit is rejected if any of those versions changed in the meantime.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
    latency: Option<Duration>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<MemoryState>,
    unavailable: AtomicBool,
    operations: AtomicUsize,
}

#[derive(Default)]
struct MemoryState {
    documents: BTreeMap<DocumentPath, StoredDocument>,
    /// The version of the latest commit
    version: u64,
}

struct StoredDocument {
    version: u64,
    fields: Map<String, Value>,
}

struct MemoryTransaction {
    inner: Arc<Inner>,
    latency: Option<Duration>,
    reads: HashMap<DocumentPath, u64>,
    writes: Vec<(DocumentPath, Option<Document>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every transactional read by the given duration after the read is made,
    /// simulating the round trip to a remote store.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Simulates an outage. While unavailable, every operation fails with [StoreError::Unavailable].
    pub fn set_available(&self, available: bool) {
        self.inner.unavailable.store(!available, Ordering::SeqCst);
    }

    /// How many store operations have been attempted, including failed ones
    pub fn operation_count(&self) -> usize {
        self.inner.operations.load(Ordering::SeqCst)
    }

    /// How many documents are stored
    pub fn len(&self) -> usize {
        self.inner.state.lock().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The paths of all stored documents, in order
    pub fn paths(&self) -> Vec<DocumentPath> {
        self.inner.state.lock().documents.keys().cloned().collect()
    }
}

impl Inner {
    fn operation(&self) -> StoreResult<()> {
        self.operations.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }

        Ok(())
    }

    /// Returns the document and its version, 0 if it doesn't exist
    fn read(&self, path: &DocumentPath) -> (u64, Option<Document>) {
        let state = self.state.lock();

        match state.documents.get(path) {
            Some(stored) => (
                stored.version,
                Some(Document::from_fields(stored.fields.clone())),
            ),
            None => (0, None),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        self.inner.operation()?;

        Ok(Box::new(MemoryTransaction {
            inner: self.inner.clone(),
            latency: self.latency,
            reads: HashMap::new(),
            writes: Vec::new(),
        }))
    }

    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        self.inner.operation()?;

        Ok(self.inner.read(path).1)
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn get(&mut self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        self.inner.operation()?;

        let (version, document) = self.inner.read(path);
        self.reads.entry(path.clone()).or_insert(version);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        Ok(document)
    }

    fn set(&mut self, path: DocumentPath, document: Document) {
        self.writes.push((path, Some(document)));
    }

    fn delete(&mut self, path: DocumentPath) {
        self.writes.push((path, None));
    }

    async fn commit(self: Box<Self>) -> StoreResult<DateTime<Utc>> {
        let MemoryTransaction {
            inner,
            reads,
            writes,
            ..
        } = *self;

        inner.operation()?;

        let mut state = inner.state.lock();

        for (path, observed) in &reads {
            let current = state.documents.get(path).map(|d| d.version).unwrap_or(0);

            if current != *observed {
                debug!("Commit rejected, {path} changed from version {observed} to {current}");
                return Err(StoreError::Conflict);
            }
        }

        // Stored timestamps keep microsecond precision
        let committed_at = Utc::now().trunc_subsecs(6);

        if writes.is_empty() {
            return Ok(committed_at);
        }

        state.version += 1;
        let version = state.version;

        for (path, document) in writes {
            match document {
                Some(document) => {
                    let fields = document.resolve_server_timestamps(committed_at).into_fields();
                    state
                        .documents
                        .insert(path, StoredDocument { version, fields });
                }
                None => {
                    state.documents.remove(&path);
                }
            }
        }

        debug!("Committed version {version}");
        Ok(committed_at)
    }
}
