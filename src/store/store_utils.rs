//!
//! Documentation of the Store Utilities module.
//! Filters and the conversions between models and records.
//!

use super::store::{Record, StoreError};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Whether every field of `filter` is equal in `record`
pub fn matches_filter(record: &Record, filter: &Record) -> bool {
    filter.iter().all(|(key, value)| record.get(key) == Some(value))
}

/// A single field-equals filter
pub fn by_field<V: Into<Value>>(field: &str, value: V) -> Record {
    let mut filter = Record::new();
    filter.insert(field.to_string(), value.into());
    filter
}

/// Converts a model to its record
pub fn to_record<T: Serialize>(entity: &str, model: &T) -> Result<Record, StoreError> {
    match serde_json::to_value(model)? {
        Value::Object(record) => Ok(record),
        other => Err(StoreError::InvalidRecord {
            entity: entity.to_string(),
            reason: format!("expected an object, got {}", other),
        }),
    }
}

/// Converts a record back to its model
pub fn from_record<T: DeserializeOwned>(record: &Record) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(record.clone()))?)
}

/// Get the max `id` of a collection plus one, 1 on an empty collection
pub fn next_id(records: &[Record]) -> u64 {
    records
        .iter()
        .filter_map(|record| record.get("id").and_then(Value::as_u64))
        .max()
        .unwrap_or(0)
        + 1
}

/// Reads an ISO-8601 timestamp, with or without offset, or a bare date.
/// An offset is dropped and the wall-clock value kept.
pub fn parse_iso_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// `deserialize_with` for stored timestamps
pub fn deserialize_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_iso_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("'{}' is not an ISO-8601 timestamp", raw)))
}

/// `deserialize_with` for stored timestamps that may be null
pub fn deserialize_optional_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_iso_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("'{}' is not an ISO-8601 timestamp", raw))),
    }
}
