//! In-process document store.
//!
//! Backs the catalog in development and in tests. An optional per-call
//! latency simulates the network round trip of a remote store; cursors pay
//! it when they first fetch, not when they are created.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::query::{apply_update, matches, run_pipeline};
use super::{
    Collection, Cursor, Database, DeleteResult, Document, InsertOneResult, StoreError, StoreResult,
    UpdateResult,
};

type Shared = Arc<RwLock<Vec<Document>>>;

/// A set of named in-memory collections.
#[derive(Clone, Debug, Default)]
pub struct MemoryDatabase {
    collections: Arc<Mutex<HashMap<String, Shared>>>,
    latency: Duration,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every data-access call (and every cursor fetch) by `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }
}

impl Database for MemoryDatabase {
    type Collection = MemoryCollection;

    fn collection(&self, name: &str) -> MemoryCollection {
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let data = collections.entry(name.to_string()).or_default().clone();
        MemoryCollection {
            name: name.to_string(),
            data,
            latency: self.latency,
        }
    }
}

/// Handle to one in-memory collection. Clones share the same documents.
#[derive(Clone, Debug)]
pub struct MemoryCollection {
    name: String,
    data: Shared,
    latency: Duration,
}

impl MemoryCollection {
    /// A standalone collection not registered in any database.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Shared::default(),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn delay(&self) {
        simulate(self.latency).await;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Document>> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Document>> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, filter: &Document, update: &Document, many: bool) -> StoreResult<UpdateResult> {
        let mut docs = self.write();
        let mut result = UpdateResult {
            matched_count: 0,
            modified_count: 0,
        };

        // Every replacement is computed before any is written.
        let mut changes = Vec::new();
        for (i, doc) in docs.iter().enumerate() {
            if !matches(doc, filter)? {
                continue;
            }
            result.matched_count += 1;
            let next = apply_update(doc, update)?;
            if next != *doc {
                changes.push((i, next));
            }
            if !many {
                break;
            }
        }

        result.modified_count = changes.len() as u64;
        for (i, next) in changes {
            docs[i] = next;
        }
        Ok(result)
    }

    fn delete(&self, filter: &Document, many: bool) -> StoreResult<DeleteResult> {
        let mut docs = self.write();
        let mut deleted = 0u64;
        let mut i = 0;
        while i < docs.len() {
            if matches(&docs[i], filter)? && (many || deleted == 0) {
                docs.remove(i);
                deleted += 1;
            } else {
                i += 1;
            }
        }
        Ok(DeleteResult {
            deleted_count: deleted,
        })
    }
}

async fn simulate(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

/// A 24-hex-digit identifier in the shape of a document-store object id.
pub fn new_object_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..24].to_string()
}

#[async_trait]
impl Collection for MemoryCollection {
    type Cursor = MemoryCursor;

    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, filter: Document) -> MemoryCursor {
        MemoryCursor::new(self.data.clone(), Query::Filter(filter), self.latency)
    }

    async fn find_one(&self, filter: Document) -> StoreResult<Option<Document>> {
        self.delay().await;
        let docs = self.read();
        for doc in docs.iter() {
            if matches(doc, &filter)? {
                return Ok(Some(doc.clone()));
            }
        }
        Ok(None)
    }

    async fn insert_one(&self, mut document: Document) -> StoreResult<InsertOneResult> {
        self.delay().await;
        let fields = document
            .as_object_mut()
            .ok_or_else(|| StoreError::InvalidDocument("document must be an object".into()))?;
        let id = fields
            .entry("_id")
            .or_insert_with(|| Value::String(new_object_id()))
            .clone();

        let mut docs = self.write();
        if docs.iter().any(|d| d.get("_id") == Some(&id)) {
            return Err(StoreError::DuplicateId(id.to_string()));
        }
        docs.push(document);
        Ok(InsertOneResult { inserted_id: id })
    }

    async fn update_one(&self, filter: Document, update: Document) -> StoreResult<UpdateResult> {
        self.delay().await;
        self.update(&filter, &update, false)
    }

    async fn update_many(&self, filter: Document, update: Document) -> StoreResult<UpdateResult> {
        self.delay().await;
        self.update(&filter, &update, true)
    }

    async fn delete_one(&self, filter: Document) -> StoreResult<DeleteResult> {
        self.delay().await;
        self.delete(&filter, false)
    }

    async fn delete_many(&self, filter: Document) -> StoreResult<DeleteResult> {
        self.delay().await;
        self.delete(&filter, true)
    }

    fn aggregate(&self, pipeline: Vec<Document>) -> MemoryCursor {
        MemoryCursor::new(self.data.clone(), Query::Pipeline(pipeline), self.latency)
    }

    async fn count_documents(&self, filter: Document) -> StoreResult<u64> {
        self.delay().await;
        let docs = self.read();
        let mut count = 0;
        for doc in docs.iter() {
            if matches(doc, &filter)? {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[derive(Debug)]
enum Query {
    Filter(Document),
    Pipeline(Vec<Document>),
}

/// Lazy cursor over an in-memory collection.
///
/// Results are snapshotted on the first fetch; later writes are not seen.
#[derive(Debug)]
pub struct MemoryCursor {
    data: Shared,
    query: Query,
    latency: Duration,
    buffer: Option<VecDeque<Document>>,
}

impl MemoryCursor {
    fn new(data: Shared, query: Query, latency: Duration) -> Self {
        Self {
            data,
            query,
            latency,
            buffer: None,
        }
    }

    async fn fill(&mut self) -> StoreResult<&mut VecDeque<Document>> {
        if self.buffer.is_none() {
            simulate(self.latency).await;
            let snapshot = self.data.read().unwrap_or_else(|p| p.into_inner()).clone();
            let results = match &self.query {
                Query::Filter(filter) => {
                    let mut kept = Vec::new();
                    for doc in snapshot {
                        if matches(&doc, filter)? {
                            kept.push(doc);
                        }
                    }
                    kept
                }
                Query::Pipeline(stages) => run_pipeline(snapshot, stages)?,
            };
            self.buffer = Some(results.into());
        }
        Ok(self.buffer.get_or_insert_with(VecDeque::new))
    }
}

#[async_trait]
impl Cursor for MemoryCursor {
    async fn next(&mut self) -> StoreResult<Option<Document>> {
        Ok(self.fill().await?.pop_front())
    }

    async fn to_vec(&mut self) -> StoreResult<Vec<Document>> {
        Ok(self.fill().await?.drain(..).collect())
    }
}
