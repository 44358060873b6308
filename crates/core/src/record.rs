//! Field access on raw backend records.
//!
//! The backend returns records as JSON objects. Relational (many2one) fields
//! come back either as a bare id or as an `[id, "display name"]` pair, and
//! empty scalar fields come back as `false` rather than `null`.

use serde_json::Value;

use crate::error::{DomainError, DomainResult};

/// A record as returned by `read` / `search_read`.
pub type Record = serde_json::Map<String, Value>;

/// The record's own `id`.
pub fn record_id(record: &Record) -> DomainResult<i64> {
    many2one(record, "id")?.ok_or_else(|| DomainError::malformed("record has no id"))
}

/// A many2one (or plain integer) field; `false`/`null`/missing map to `None`.
pub fn many2one(record: &Record, field: &str) -> DomainResult<Option<i64>> {
    match record.get(field) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| DomainError::malformed(format!("{field}: not an integer id"))),
        Some(Value::Array(pair)) => match pair.first() {
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| DomainError::malformed(format!("{field}: not an integer id"))),
            _ => Err(DomainError::malformed(format!("{field}: empty relation pair"))),
        },
        Some(other) => Err(DomainError::malformed(format!(
            "{field}: unexpected relation value {other}"
        ))),
    }
}

/// A required many2one field.
pub fn required_many2one(record: &Record, field: &str) -> DomainResult<i64> {
    many2one(record, field)?.ok_or_else(|| DomainError::malformed(format!("{field}: missing")))
}

/// A float field; `false`/missing count as zero the way the backend reports
/// unset numeric fields.
pub fn float(record: &Record, field: &str) -> DomainResult<f64> {
    match record.get(field) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(0.0),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| DomainError::malformed(format!("{field}: not a number"))),
        Some(other) => Err(DomainError::malformed(format!(
            "{field}: expected number, got {other}"
        ))),
    }
}

/// A char/selection field; `false` maps to `None`.
pub fn text(record: &Record, field: &str) -> Option<String> {
    match record.get(field) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

pub fn flag(record: &Record, field: &str) -> bool {
    matches!(record.get(field), Some(Value::Bool(true)))
}
