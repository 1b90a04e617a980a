//! Aggregates over the slow-operation logs.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Per-operation statistics for one audit log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSummary {
    /// `model.hook` or `collection.method`.
    pub operation: String,
    pub count: usize,
    pub errors: usize,
    pub max_ms: f64,
    pub mean_ms: f64,
}

/// Group slow-operation records by operation, slowest mean first.
///
/// Records missing a target, an operation name or a duration are ignored.
pub fn summarize(records: &[Value]) -> Vec<OperationSummary> {
    let mut groups: BTreeMap<String, (usize, usize, f64, f64)> = BTreeMap::new();

    for record in records {
        let Some(operation) = operation_key(record) else {
            continue;
        };
        let Some(duration) = record.get("durationMs").and_then(Value::as_f64) else {
            continue;
        };
        let failed = record.get("outcome").and_then(Value::as_str) == Some("error");

        let entry = groups.entry(operation).or_insert((0, 0, 0.0, 0.0));
        entry.0 += 1;
        entry.1 += usize::from(failed);
        entry.2 = entry.2.max(duration);
        entry.3 += duration;
    }

    let mut out: Vec<OperationSummary> = groups
        .into_iter()
        .map(|(operation, (count, errors, max_ms, total))| OperationSummary {
            operation,
            count,
            errors,
            max_ms,
            mean_ms: (total / count as f64 * 100.0).round() / 100.0,
        })
        .collect();
    out.sort_by(|a, b| b.mean_ms.total_cmp(&a.mean_ms));
    out
}

fn operation_key(record: &Value) -> Option<String> {
    let field = |k: &str| record.get(k).and_then(Value::as_str);
    let (target, op) = match (field("model"), field("hook")) {
        (Some(model), Some(hook)) => (model, hook),
        _ => (field("collection")?, field("method")?),
    };
    Some(format!("{}.{}", target, op))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_groups_both_record_shapes() {
        let records = vec![
            json!({"model": "basket", "hook": "find", "durationMs": 120.0, "outcome": "ok"}),
            json!({"model": "basket", "hook": "find", "durationMs": 180.0, "outcome": "error"}),
            json!({"collection": "products", "method": "find", "durationMs": 400.5, "outcome": "ok"}),
            json!({"collection": "products", "durationMs": 999.0}),
        ];

        let summary = summarize(&records);
        assert_eq!(summary.len(), 2);

        assert_eq!(summary[0].operation, "products.find");
        assert_eq!(summary[0].count, 1);
        assert_eq!(summary[0].max_ms, 400.5);

        assert_eq!(summary[1].operation, "basket.find");
        assert_eq!(summary[1].count, 2);
        assert_eq!(summary[1].errors, 1);
        assert_eq!(summary[1].max_ms, 180.0);
        assert_eq!(summary[1].mean_ms, 150.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(summarize(&[]).is_empty());
    }
}
