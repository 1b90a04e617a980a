//! Schema-level auditing of typed model operations.
//!
//! Every [`Model`](crate::store::Model) operation is routed through
//! [`ModelAuditor::observe`] with its [`ModelOp`]. The window opens before
//! the operation future is first polled and closes when it resolves, on
//! success or failure alike. Dropping the future first closes it as
//! `cancelled`.

use std::future::Future;

use serde::Serialize;

use super::{Outcome, SlowPolicy, WindowGuard};
use crate::observability::{metrics, sink, LogSink};

/// Observable model operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelOp {
    Find,
    FindOne,
    UpdateOne,
    UpdateMany,
    Save,
    Remove,
}

impl ModelOp {
    pub const ALL: [ModelOp; 6] = [
        ModelOp::Find,
        ModelOp::FindOne,
        ModelOp::UpdateOne,
        ModelOp::UpdateMany,
        ModelOp::Save,
        ModelOp::Remove,
    ];

    /// Hook name as written to the log.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelOp::Find => "find",
            ModelOp::FindOne => "findOne",
            ModelOp::UpdateOne => "updateOne",
            ModelOp::UpdateMany => "updateMany",
            ModelOp::Save => "save",
            ModelOp::Remove => "remove",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelOpRecord<'a> {
    time: String,
    model: &'a str,
    hook: &'static str,
    duration_ms: f64,
    outcome: Outcome,
}

/// Times model operations and reports the slow ones.
#[derive(Debug, Clone, Default)]
pub struct ModelAuditor {
    sink: LogSink,
    policy: SlowPolicy,
}

impl ModelAuditor {
    pub fn new(sink: LogSink, policy: SlowPolicy) -> Self {
        Self { sink, policy }
    }

    /// Run `operation`, timing it. The result is returned untouched.
    pub async fn observe<T, E, F>(&self, model: &str, op: ModelOp, operation: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let guard =
            WindowGuard::open(move |duration_ms, outcome| self.report(model, op, duration_ms, outcome));
        let result = operation.await;
        guard.close(Outcome::of(&result));
        result
    }

    fn report(&self, model: &str, op: ModelOp, duration_ms: f64, outcome: Outcome) {
        if !self.policy.is_slow(duration_ms) {
            return;
        }

        let record = ModelOpRecord {
            time: sink::timestamp(),
            model,
            hook: op.as_str(),
            duration_ms,
            outcome,
        };
        tracing::warn!(
            model = model,
            hook = op.as_str(),
            duration_ms = duration_ms,
            outcome = ?outcome,
            "Slow model operation"
        );
        metrics::record_slow_operation("model", op.as_str());
        self.sink.append(&record);
    }
}
