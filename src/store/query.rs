//! Query evaluation shared by the store backends.
//!
//! Pure functions over documents: matching, ordering, paging, projection,
//! and bookkeeping-field stamping.

use std::cmp::Ordering;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::{Document, Filter, FindOptions, SortOrder, ID_FIELD};

pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";
pub const VERSION_FIELD: &str = "__v";

/// Current time in the format every stored timestamp uses
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Fresh document id
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Assign id, timestamps and version to a document about to be inserted
pub fn stamp_new(mut document: Document) -> Document {
    let now = now_timestamp();
    document.insert(ID_FIELD.to_string(), Value::String(new_id()));
    document.insert(CREATED_AT_FIELD.to_string(), Value::String(now.clone()));
    document.insert(UPDATED_AT_FIELD.to_string(), Value::String(now));
    document.insert(VERSION_FIELD.to_string(), Value::from(0));
    document
}

/// Version of a stored document. `Null` when it predates versioning.
pub fn version_of(document: &Document) -> Value {
    document.get(VERSION_FIELD).cloned().unwrap_or(Value::Null)
}

/// Apply a `$set`-style update and bump the version. Bookkeeping fields in
/// `update` are ignored.
pub fn apply_set(document: &mut Document, update: Document) {
    for (field, value) in update {
        if matches!(
            field.as_str(),
            ID_FIELD | CREATED_AT_FIELD | UPDATED_AT_FIELD | VERSION_FIELD
        ) {
            continue;
        }
        document.insert(field, value);
    }
    let version = document
        .get(VERSION_FIELD)
        .and_then(Value::as_u64)
        .unwrap_or(0);
    document.insert(VERSION_FIELD.to_string(), Value::from(version + 1));
    document.insert(
        UPDATED_AT_FIELD.to_string(),
        Value::String(now_timestamp()),
    );
}

/// Whether a document satisfies every condition of the filter
pub fn matches(document: &Document, filter: &Filter) -> bool {
    filter
        .conditions()
        .iter()
        .all(|(field, expected)| document.get(field).unwrap_or(&Value::Null) == expected)
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order over JSON values: null < numbers < strings < objects < arrays < booleans
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Sort, skip, limit and project an already-filtered result set.
/// The sort is stable, so ties keep their incoming order.
pub fn apply_options(mut documents: Vec<Document>, options: &FindOptions) -> Vec<Document> {
    if let Some((field, order)) = &options.sort {
        documents.sort_by(|a, b| {
            let l = a.get(field).unwrap_or(&Value::Null);
            let r = b.get(field).unwrap_or(&Value::Null);
            let ord = compare_values(l, r);
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
    }

    let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
    let limit = options
        .limit
        .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
        .unwrap_or(usize::MAX);

    documents
        .into_iter()
        .skip(skip)
        .take(limit)
        .map(|mut doc| {
            for field in &options.exclude {
                doc.remove(field);
            }
            doc
        })
        .collect()
}
