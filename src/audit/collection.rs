//! Driver-level auditing of collection handles.
//!
//! # Responsibilities
//! - Wrap every handle at acquisition (`AuditedDatabase::collection`)
//! - Time the allowlisted methods without changing their signatures
//! - Defer cursor timing to materialization (`to_vec`)
//!
//! # Design Decisions
//! - `find`/`aggregate` cursors are built in microseconds; the cost is in
//!   the fetch, so the window stays open until `to_vec`
//! - A cursor without native bulk fetch is closed at call time instead
//! - Each materialization is its own observation
//! - A native cursor dropped without being materialized, or a call dropped
//!   mid-flight, is reported as `cancelled`; iterating with `next` is not
//!   timed
//! - `count_documents` is not on the allowlist and is forwarded untimed

use std::future::Future;

use async_trait::async_trait;
use serde::Serialize;

use super::{Outcome, SlowPolicy, TimingWindow, WindowGuard};
use crate::observability::{metrics, sink, LogSink};
use crate::store::{
    Collection, Cursor, Database, DeleteResult, Document, InsertOneResult, StoreResult,
    UpdateResult,
};

const SUMMARY_MAX_CHARS: usize = 256;

/// Audited collection methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMethod {
    Find,
    FindOne,
    InsertOne,
    UpdateOne,
    UpdateMany,
    DeleteOne,
    DeleteMany,
    Aggregate,
}

impl QueryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMethod::Find => "find",
            QueryMethod::FindOne => "findOne",
            QueryMethod::InsertOne => "insertOne",
            QueryMethod::UpdateOne => "updateOne",
            QueryMethod::UpdateMany => "updateMany",
            QueryMethod::DeleteOne => "deleteOne",
            QueryMethod::DeleteMany => "deleteMany",
            QueryMethod::Aggregate => "aggregate",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRecord<'a> {
    time: String,
    collection: &'a str,
    method: &'static str,
    duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    args_summary: Option<&'a str>,
    outcome: Outcome,
}

/// Serialized first argument, truncated.
fn summarize<T: Serialize + ?Sized>(arg: &T) -> Option<String> {
    let mut json = serde_json::to_string(arg).ok()?;
    if let Some((cut, _)) = json.char_indices().nth(SUMMARY_MAX_CHARS) {
        json.truncate(cut);
        json.push_str("...");
    }
    Some(json)
}

/// Reports slow collection calls to the query log.
#[derive(Debug, Clone, Default)]
pub struct QueryAuditor {
    sink: LogSink,
    policy: SlowPolicy,
}

impl QueryAuditor {
    pub fn new(sink: LogSink, policy: SlowPolicy) -> Self {
        Self { sink, policy }
    }

    fn report(
        &self,
        collection: &str,
        method: QueryMethod,
        duration_ms: f64,
        args_summary: Option<&str>,
        outcome: Outcome,
    ) {
        if !self.policy.is_slow(duration_ms) {
            return;
        }

        let record = QueryRecord {
            time: sink::timestamp(),
            collection,
            method: method.as_str(),
            duration_ms,
            args_summary,
            outcome,
        };
        tracing::warn!(
            collection = collection,
            method = method.as_str(),
            duration_ms = duration_ms,
            args = args_summary.unwrap_or(""),
            outcome = ?outcome,
            "Slow DB query"
        );
        metrics::record_slow_operation("driver", method.as_str());
        self.sink.append(&record);
    }
}

/// Database whose collection handles come back audited.
#[derive(Debug, Clone)]
pub struct AuditedDatabase<D> {
    inner: D,
    auditor: QueryAuditor,
}

impl<D: Database> AuditedDatabase<D> {
    pub fn new(inner: D, auditor: QueryAuditor) -> Self {
        Self { inner, auditor }
    }
}

impl<D: Database> Database for AuditedDatabase<D> {
    type Collection = AuditedCollection<D::Collection>;

    fn collection(&self, name: &str) -> Self::Collection {
        AuditedCollection::new(self.inner.collection(name), self.auditor.clone())
    }
}

/// A collection handle whose allowlisted methods are timed.
#[derive(Debug, Clone)]
pub struct AuditedCollection<C> {
    inner: C,
    auditor: QueryAuditor,
}

impl<C: Collection> AuditedCollection<C> {
    pub fn new(inner: C, auditor: QueryAuditor) -> Self {
        Self { inner, auditor }
    }

    async fn observe<T, F>(&self, method: QueryMethod, args: Option<String>, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>> + Send,
    {
        let guard = WindowGuard::open(move |duration_ms, outcome| {
            self.auditor
                .report(self.inner.name(), method, duration_ms, args.as_deref(), outcome)
        });
        let result = call.await;
        guard.close(Outcome::of(&result));
        result
    }

    fn defer(
        &self,
        method: QueryMethod,
        args: Option<String>,
        window: TimingWindow,
        cursor: C::Cursor,
    ) -> AuditedCursor<C::Cursor> {
        let mut pending = PendingQuery {
            auditor: self.auditor.clone(),
            collection: self.inner.name().to_string(),
            method,
            args,
            window: Some(window),
        };

        let native = cursor.can_materialize();
        if !native {
            pending.finish(Outcome::Ok);
        }
        AuditedCursor {
            inner: cursor,
            pending,
            native,
        }
    }
}

#[async_trait]
impl<C: Collection> Collection for AuditedCollection<C> {
    type Cursor = AuditedCursor<C::Cursor>;

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn find(&self, filter: Document) -> Self::Cursor {
        let args = summarize(&filter);
        let window = TimingWindow::open();
        let cursor = self.inner.find(filter);
        self.defer(QueryMethod::Find, args, window, cursor)
    }

    async fn find_one(&self, filter: Document) -> StoreResult<Option<Document>> {
        let args = summarize(&filter);
        self.observe(QueryMethod::FindOne, args, self.inner.find_one(filter)).await
    }

    async fn insert_one(&self, document: Document) -> StoreResult<InsertOneResult> {
        let args = summarize(&document);
        self.observe(QueryMethod::InsertOne, args, self.inner.insert_one(document)).await
    }

    async fn update_one(&self, filter: Document, update: Document) -> StoreResult<UpdateResult> {
        let args = summarize(&filter);
        self.observe(QueryMethod::UpdateOne, args, self.inner.update_one(filter, update)).await
    }

    async fn update_many(&self, filter: Document, update: Document) -> StoreResult<UpdateResult> {
        let args = summarize(&filter);
        self.observe(QueryMethod::UpdateMany, args, self.inner.update_many(filter, update)).await
    }

    async fn delete_one(&self, filter: Document) -> StoreResult<DeleteResult> {
        let args = summarize(&filter);
        self.observe(QueryMethod::DeleteOne, args, self.inner.delete_one(filter)).await
    }

    async fn delete_many(&self, filter: Document) -> StoreResult<DeleteResult> {
        let args = summarize(&filter);
        self.observe(QueryMethod::DeleteMany, args, self.inner.delete_many(filter)).await
    }

    fn aggregate(&self, pipeline: Vec<Document>) -> Self::Cursor {
        let args = summarize(&pipeline);
        let window = TimingWindow::open();
        let cursor = self.inner.aggregate(pipeline);
        self.defer(QueryMethod::Aggregate, args, window, cursor)
    }

    async fn count_documents(&self, filter: Document) -> StoreResult<u64> {
        self.inner.count_documents(filter).await
    }
}

#[derive(Debug)]
struct PendingQuery {
    auditor: QueryAuditor,
    collection: String,
    method: QueryMethod,
    args: Option<String>,
    window: Option<TimingWindow>,
}

impl PendingQuery {
    /// Close the call-time window, or a fresh one for repeat materializations.
    fn take_window(&mut self) -> TimingWindow {
        self.window.take().unwrap_or_else(TimingWindow::open)
    }

    fn finish(&mut self, outcome: Outcome) {
        let duration_ms = self.take_window().close();
        self.report(duration_ms, outcome);
    }

    /// Stop timing without a record.
    fn disarm(&mut self) {
        self.window = None;
    }

    fn report(&self, duration_ms: f64, outcome: Outcome) {
        self.auditor.report(
            &self.collection,
            self.method,
            duration_ms,
            self.args.as_deref(),
            outcome,
        );
    }
}

impl Drop for PendingQuery {
    fn drop(&mut self) {
        if let Some(window) = self.window.take() {
            self.report(window.close(), Outcome::Cancelled);
        }
    }
}

/// Cursor whose materialization closes the originating call's window.
#[derive(Debug)]
pub struct AuditedCursor<K> {
    inner: K,
    pending: PendingQuery,
    native: bool,
}

#[async_trait]
impl<K: Cursor> Cursor for AuditedCursor<K> {
    async fn next(&mut self) -> StoreResult<Option<Document>> {
        self.pending.disarm();
        self.inner.next().await
    }

    fn can_materialize(&self) -> bool {
        self.native
    }

    async fn to_vec(&mut self) -> StoreResult<Vec<Document>> {
        if !self.native {
            return self.inner.to_vec().await;
        }

        let window = self.pending.take_window();
        let pending = &self.pending;
        let guard =
            WindowGuard::new(window, move |duration_ms, outcome| pending.report(duration_ms, outcome));
        let result = self.inner.to_vec().await;
        guard.close(Outcome::of(&result));
        result
    }
}
