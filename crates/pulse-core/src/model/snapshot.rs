// ── Property snapshot ──
//
// Immutable view of the cache handed to consumers on every mutation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::property::{MAIN_SOURCE, SOURCE_LIST};

/// Every cached property at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    values: BTreeMap<String, Value>,
    /// When the cache last changed. `None` before the first mutation.
    updated_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub(crate) fn new(values: BTreeMap<String, Value>, updated_at: DateTime<Utc>) -> Self {
        Self {
            values,
            updated_at: Some(updated_at),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Names from the last `image.source.list` reply.
    pub fn source_list(&self) -> Vec<String> {
        self.get(SOURCE_LIST)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn current_source(&self) -> Option<&str> {
        self.str(MAIN_SOURCE)
    }
}
