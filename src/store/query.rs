//! Filter matching, update operators and aggregation stages.
//!
//! Supported:
//! - filters: equality (arrays match by element), dotted paths, `$and`, `$or`,
//!   `$eq $ne $gt $gte $lt $lte $in $nin $exists`
//! - updates: `$set $unset $inc`
//! - pipeline stages: `$match $sort $skip $limit`

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::{Document, StoreError, StoreResult};

/// Test a document against a filter.
pub fn matches(doc: &Document, filter: &Document) -> StoreResult<bool> {
    let conditions = filter
        .as_object()
        .ok_or_else(|| StoreError::InvalidFilter("filter must be an object".into()))?;

    for (key, condition) in conditions {
        let ok = match key.as_str() {
            "$and" => all_of(doc, condition)?,
            "$or" => any_of(doc, condition)?,
            k if k.starts_with('$') => {
                return Err(StoreError::InvalidFilter(format!("unknown top-level operator {}", k)))
            }
            path => field_matches(get_path(doc, path), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses(condition: &Value) -> StoreResult<&Vec<Value>> {
    condition
        .as_array()
        .ok_or_else(|| StoreError::InvalidFilter("$and/$or expects an array".into()))
}

fn all_of(doc: &Document, condition: &Value) -> StoreResult<bool> {
    for clause in clauses(condition)? {
        if !matches(doc, clause)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_of(doc: &Document, condition: &Value) -> StoreResult<bool> {
    for clause in clauses(condition)? {
        if matches(doc, clause)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn is_operator_object(condition: &Value) -> bool {
    condition
        .as_object()
        .is_some_and(|m| !m.is_empty() && m.keys().all(|k| k.starts_with('$')))
}

fn field_matches(field: Option<&Value>, condition: &Value) -> StoreResult<bool> {
    if !is_operator_object(condition) {
        return Ok(equals_or_contains(field, condition));
    }

    let operators = condition.as_object().into_iter().flatten();
    for (op, arg) in operators {
        let ok = match op.as_str() {
            "$eq" => equals_or_contains(field, arg),
            "$ne" => !equals_or_contains(field, arg),
            "$gt" => compare_field(field, arg, |o| o == Ordering::Greater),
            "$gte" => compare_field(field, arg, |o| o != Ordering::Less),
            "$lt" => compare_field(field, arg, |o| o == Ordering::Less),
            "$lte" => compare_field(field, arg, |o| o != Ordering::Greater),
            "$in" => in_list(field, arg)?,
            "$nin" => !in_list(field, arg)?,
            "$exists" => field.is_some() == is_truthy(arg),
            other => return Err(StoreError::InvalidFilter(format!("unsupported operator {}", other))),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn in_list(field: Option<&Value>, arg: &Value) -> StoreResult<bool> {
    let candidates = arg
        .as_array()
        .ok_or_else(|| StoreError::InvalidFilter("$in/$nin expects an array".into()))?;
    Ok(candidates.iter().any(|c| equals_or_contains(field, c)))
}

fn equals_or_contains(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => items.iter().any(|i| values_equal(i, expected)),
        Some(value) => values_equal(value, expected),
    }
}

fn compare_field(field: Option<&Value>, arg: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match field {
        Some(value) => comparable(value, arg).is_some_and(accept),
        None => false,
    }
}

/// Numbers compare numerically regardless of integer/float representation.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn comparable(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Resolve a dotted path inside a document.
/// Loose truthiness: `1` and `"yes"` count, `0`, `""` and `null` do not.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn set_path(doc: &mut Value, path: &str, value: Value) -> StoreResult<()> {
    let mut segments = path.split('.').peekable();
    let mut current = doc;
    while let Some(segment) = segments.next() {
        let map = current
            .as_object_mut()
            .ok_or_else(|| StoreError::InvalidUpdate(format!("cannot set {} on a non-object", path)))?;
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return Ok(());
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    Ok(())
}

fn unset_path(doc: &mut Value, path: &str) {
    let (parent, last) = match path.rsplit_once('.') {
        Some((parent, last)) => (get_path_mut(doc, parent), last),
        None => (Some(doc), path),
    };
    if let Some(Value::Object(map)) = parent {
        map.remove(last);
    }
}

fn get_path_mut<'a>(doc: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.')
        .try_fold(doc, |current, segment| current.as_object_mut()?.get_mut(segment))
}

/// Compute the document an update produces. `doc` itself is never
/// modified, so a failing operator leaves nothing half-applied.
pub fn apply_update(doc: &Document, update: &Document) -> StoreResult<Document> {
    let operators = update
        .as_object()
        .ok_or_else(|| StoreError::InvalidUpdate("update must be an object".into()))?;
    if operators.is_empty() || !operators.keys().all(|k| k.starts_with('$')) {
        return Err(StoreError::InvalidUpdate(
            "update document requires atomic operators ($set, $unset, $inc)".into(),
        ));
    }

    let mut out = doc.clone();
    for (op, fields) in operators {
        let fields = fields
            .as_object()
            .ok_or_else(|| StoreError::InvalidUpdate(format!("{} expects an object", op)))?;
        for (path, arg) in fields {
            if path == "_id" {
                return Err(StoreError::InvalidUpdate("_id is immutable".into()));
            }
            match op.as_str() {
                "$set" => set_path(&mut out, path, arg.clone())?,
                "$unset" => unset_path(&mut out, path),
                "$inc" => {
                    let delta = arg
                        .as_f64()
                        .ok_or_else(|| StoreError::InvalidUpdate(format!("$inc on {} needs a number", path)))?;
                    let next = match get_path(&out, path) {
                        None | Some(Value::Null) => arg.clone(),
                        Some(Value::Number(n)) => add_numbers(n, arg, delta),
                        Some(_) => {
                            return Err(StoreError::InvalidUpdate(format!("{} is not numeric", path)))
                        }
                    };
                    set_path(&mut out, path, next)?;
                }
                other => return Err(StoreError::InvalidUpdate(format!("unsupported operator {}", other))),
            }
        }
    }
    Ok(out)
}

fn add_numbers(current: &serde_json::Number, arg: &Value, delta: f64) -> Value {
    match (current.as_i64(), arg.as_i64()) {
        (Some(a), Some(b)) => Value::from(a.saturating_add(b)),
        _ => Value::from(current.as_f64().unwrap_or(0.0) + delta),
    }
}

/// Run an aggregation pipeline over a snapshot of documents.
pub fn run_pipeline(mut docs: Vec<Document>, pipeline: &[Document]) -> StoreResult<Vec<Document>> {
    for stage in pipeline {
        let (name, arg) = stage
            .as_object()
            .filter(|m| m.len() == 1)
            .and_then(|m| m.iter().next())
            .ok_or_else(|| StoreError::InvalidFilter("pipeline stage must have exactly one key".into()))?;

        docs = match name.as_str() {
            "$match" => {
                let mut kept = Vec::with_capacity(docs.len());
                for doc in docs {
                    if matches(&doc, arg)? {
                        kept.push(doc);
                    }
                }
                kept
            }
            "$sort" => {
                let keys = sort_keys(arg)?;
                docs.sort_by(|a, b| compare_by_keys(a, b, &keys));
                docs
            }
            "$skip" => {
                let n = stage_count(name, arg)?;
                docs.into_iter().skip(n).collect()
            }
            "$limit" => {
                let n = stage_count(name, arg)?;
                docs.truncate(n);
                docs
            }
            other => return Err(StoreError::InvalidFilter(format!("unsupported stage {}", other))),
        };
    }
    Ok(docs)
}

fn stage_count(name: &str, arg: &Value) -> StoreResult<usize> {
    arg.as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| StoreError::InvalidFilter(format!("{} expects a non-negative integer", name)))
}

fn sort_keys(arg: &Value) -> StoreResult<Vec<(String, bool)>> {
    let fields = arg
        .as_object()
        .ok_or_else(|| StoreError::InvalidFilter("$sort expects an object".into()))?;
    fields.iter()
        .map(|(field, dir)| match dir.as_i64() {
            Some(1) => Ok((field.clone(), true)),
            Some(-1) => Ok((field.clone(), false)),
            _ => Err(StoreError::InvalidFilter(format!("sort direction for {} must be 1 or -1", field))),
        })
        .collect()
}

fn compare_by_keys(a: &Value, b: &Value, keys: &[(String, bool)]) -> Ordering {
    for (field, ascending) in keys {
        let ord = sort_order(get_path(a, field), get_path(b, field));
        let ord = if *ascending { ord } else { ord.reverse() };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Missing/null sort first, then numbers, strings, booleans, everything else.
fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(Value::Bool(_)) => 3,
            Some(_) => 4,
        }
    }
    match (a, b) {
        (Some(x), Some(y)) => comparable(x, y).unwrap_or_else(|| rank(a).cmp(&rank(b))),
        _ => rank(a).cmp(&rank(b)),
    }
}
