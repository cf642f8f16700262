//! Typed query predicates evaluated by record gateways.

use crate::types::Record;
use serde_json::Value;
use std::collections::BTreeSet;

/// A single predicate over one record field.
///
/// Field keys address the caller's data fields, or gateway metadata under
/// `_`-prefixed keys (`_key`, `_owner`, `_created_at`, `_updated_at`).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Filter {
    /// Field equals the value exactly.
    Eq { key: String, value: Value },
    /// String-array field contains every listed value.
    ContainsAll { key: String, values: Vec<String> },
    /// String-array field equals the listed values as a set, order irrelevant.
    SetEq { key: String, values: Vec<String> },
    /// Field is strictly less than the value. Strings compare
    /// lexicographically (RFC 3339 timestamps order correctly), numbers
    /// numerically.
    Lt { key: String, value: Value },
    /// Field is strictly greater than the value, same comparison rules
    /// as `Lt`. Records without the field never match.
    Gt { key: String, value: Value },
}

impl Filter {
    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn contains_all(key: impl Into<String>, values: Vec<String>) -> Self {
        Filter::ContainsAll {
            key: key.into(),
            values,
        }
    }

    pub fn set_eq(key: impl Into<String>, values: Vec<String>) -> Self {
        Filter::SetEq {
            key: key.into(),
            values,
        }
    }

    pub fn lt(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lt {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn gt(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gt {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::Eq { key, value } => record.field(key).as_ref() == Some(value),
            Filter::ContainsAll { key, values } => match record.get_str_array(key) {
                Some(have) => {
                    let have: BTreeSet<&str> = have.iter().map(String::as_str).collect();
                    values.iter().all(|v| have.contains(v.as_str()))
                }
                None => false,
            },
            Filter::SetEq { key, values } => match record.get_str_array(key) {
                Some(have) => {
                    let have: BTreeSet<&str> = have.iter().map(String::as_str).collect();
                    let want: BTreeSet<&str> = values.iter().map(String::as_str).collect();
                    have == want
                }
                None => false,
            },
            Filter::Lt { key, value } => match (record.field(key), value) {
                (Some(Value::String(have)), Value::String(want)) => have < *want,
                (Some(Value::Number(have)), Value::Number(want)) => {
                    match (have.as_f64(), want.as_f64()) {
                        (Some(h), Some(w)) => h < w,
                        _ => false,
                    }
                }
                _ => false,
            },
            Filter::Gt { key, value } => match (record.field(key), value) {
                (Some(Value::String(have)), Value::String(want)) => have > *want,
                (Some(Value::Number(have)), Value::Number(want)) => {
                    match (have.as_f64(), want.as_f64()) {
                        (Some(h), Some(w)) => h > w,
                        _ => false,
                    }
                }
                _ => false,
            },
        }
    }
}

/// Sort order applied by the gateway before the limit.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Sort {
    pub key: String,
    pub descending: bool,
}

/// A query over one record type.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Query {
    pub record_type: String,
    pub filters: Vec<Filter>,
    pub sort: Option<Sort>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(record_type: impl Into<String>) -> Self {
        Query {
            record_type: record_type.into(),
            filters: Vec::new(),
            sort: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn sort_by(mut self, key: impl Into<String>, descending: bool) -> Self {
        self.sort = Some(Sort {
            key: key.into(),
            descending,
        });
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.id.record_type == self.record_type && self.filters.iter().all(|f| f.matches(record))
    }
}
