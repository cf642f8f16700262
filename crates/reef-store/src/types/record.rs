//! Typed record bag with optimistic-save metadata.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::fmt;

/// Fixed-width RFC 3339 rendering (microseconds, `Z` suffix) so that
/// lexicographic order on the strings matches chronological order.
pub fn timestamp_str(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Identifier of a record: a type name plus a key unique within that type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct RecordId {
    pub record_type: String,
    pub key: String,
}

impl RecordId {
    pub fn new(record_type: impl Into<String>, key: impl Into<String>) -> Self {
        RecordId {
            record_type: record_type.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.record_type, self.key)
    }
}

/// A record as seen by the gateway.
///
/// `revision` is 0 for a record that was never saved; the store assigns
/// 1, 2, ... on each successful save. A save whose revision does not match
/// the stored one fails with a conflict. `created_at`/`updated_at` are
/// stamped by the store, never by the caller.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub owner_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub revision: u64,
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new(record_type: impl Into<String>, key: impl Into<String>) -> Self {
        Record {
            id: RecordId::new(record_type, key),
            owner_id: None,
            created_at: None,
            updated_at: None,
            revision: 0,
            data: Map::new(),
        }
    }

    #[must_use]
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(Value::as_bool)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(Value::as_f64)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.data.get(key).and_then(Value::as_u64)
    }

    /// String-array field; non-string elements are skipped.
    pub fn get_str_array(&self, key: &str) -> Option<Vec<String>> {
        self.data.get(key).and_then(Value::as_array).map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
    }

    pub fn get_object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.data.get(key).and_then(Value::as_object)
    }

    /// Gateway-maintained fields addressable in queries under `_`-prefixed
    /// keys, alongside the caller's own data fields.
    pub fn field(&self, key: &str) -> Option<Value> {
        match key {
            "_key" => Some(Value::String(self.id.key.clone())),
            "_owner" => self.owner_id.clone().map(Value::String),
            "_created_at" => self.created_at.map(|t| Value::String(timestamp_str(t))),
            "_updated_at" => self.updated_at.map(|t| Value::String(timestamp_str(t))),
            _ => self.data.get(key).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_display() {
        let id = RecordId::new("message", "abc");
        assert_eq!(id.to_string(), "message/abc");
    }

    #[test]
    fn test_new_record_is_unsaved() {
        let record = Record::new("conversation", "c1");
        assert_eq!(record.revision, 0);
        assert!(record.created_at.is_none());
        assert!(record.data.is_empty());
    }

    #[test]
    fn test_with_field_accessors() {
        let record = Record::new("message", "m1")
            .with_owner("alice")
            .with_field("body", "hello")
            .with_field("deleted", false)
            .with_field("duration", 1.5);
        assert_eq!(record.get_str("body"), Some("hello"));
        assert_eq!(record.get_bool("deleted"), Some(false));
        assert_eq!(record.get_f64("duration"), Some(1.5));
        assert_eq!(record.owner_id.as_deref(), Some("alice"));
    }

    #[test]
    fn test_str_array_skips_non_strings() {
        let record = Record::new("conversation", "c1")
            .with_field("participants", serde_json::json!(["a", 1, "b"]));
        assert_eq!(
            record.get_str_array("participants"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_meta_fields() {
        let record = Record::new("message", "m1").with_owner("alice");
        assert_eq!(
            record.field("_key"),
            Some(Value::String("m1".to_string()))
        );
        assert_eq!(
            record.field("_owner"),
            Some(Value::String("alice".to_string()))
        );
        assert_eq!(record.field("_created_at"), None);
    }
}
