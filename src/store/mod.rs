//! Document-store capability.
//!
//! # Data Flow
//! ```text
//! handler
//!     → Model<T> (model.rs, typed, schema-level audit)     ┐
//!     → AuditedCollection (audit::collection, driver-level) ├─▶ Collection impl
//!     → Collection (raw handle)                             ┘       (memory.rs)
//! ```
//!
//! # Design Decisions
//! - Documents are JSON objects; `_id` is assigned on insert when absent
//! - `find` and `aggregate` return lazy cursors; no work happens until the
//!   cursor is iterated or materialized with `to_vec`
//! - The traits mirror a document driver's surface so a real driver can be
//!   slotted in behind them

pub mod memory;
pub mod model;
pub mod query;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub use memory::{MemoryCollection, MemoryCursor, MemoryDatabase};
pub use model::Model;

/// A stored document (always a JSON object).
pub type Document = Value;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("duplicate key: _id {0} already exists")]
    DuplicateId(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOneResult {
    pub inserted_id: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// A lazy sequence of query results.
#[async_trait]
pub trait Cursor: Send {
    /// Pull the next document, fetching from the store on first use.
    async fn next(&mut self) -> StoreResult<Option<Document>>;

    /// Whether `to_vec` is a native bulk fetch. When false, `to_vec` falls
    /// back to draining `next` one document at a time.
    fn can_materialize(&self) -> bool {
        true
    }

    /// Pull every remaining result into memory.
    async fn to_vec(&mut self) -> StoreResult<Vec<Document>> {
        let mut documents = Vec::new();
        while let Some(doc) = self.next().await? {
            documents.push(doc);
        }
        Ok(documents)
    }
}

/// A handle to one named collection.
#[async_trait]
pub trait Collection: Send + Sync {
    type Cursor: Cursor;

    fn name(&self) -> &str;

    fn find(&self, filter: Document) -> Self::Cursor;

    async fn find_one(&self, filter: Document) -> StoreResult<Option<Document>>;

    async fn insert_one(&self, document: Document) -> StoreResult<InsertOneResult>;

    async fn update_one(&self, filter: Document, update: Document) -> StoreResult<UpdateResult>;

    async fn update_many(&self, filter: Document, update: Document) -> StoreResult<UpdateResult>;

    async fn delete_one(&self, filter: Document) -> StoreResult<DeleteResult>;

    async fn delete_many(&self, filter: Document) -> StoreResult<DeleteResult>;

    fn aggregate(&self, pipeline: Vec<Document>) -> Self::Cursor;

    async fn count_documents(&self, filter: Document) -> StoreResult<u64>;
}

/// Source of collection handles.
pub trait Database: Send + Sync {
    type Collection: Collection;

    fn collection(&self, name: &str) -> Self::Collection;
}
