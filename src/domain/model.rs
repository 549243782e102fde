use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::outcome::Outcome;

/// An input row as read from a file, or why it could not be turned into a record.
pub type DecodedRecord = Outcome<Record, String>;

/// One transaction: field name → scalar value, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.data.contains_key(field)
    }

    /// Replaces the value in place when the field exists, otherwise appends it.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(field.into(), value.into());
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<IndexMap<String, Value>> for Record {
    fn from(data: IndexMap<String, Value>) -> Self {
        Self { data }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            data: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A rejected record and where it sat in the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordError {
    pub row: usize,
    pub error: String,
}

/// Partitioned output of a batch: accepted records and rejections, both in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub valid: Vec<Record>,
    pub errors: Vec<RecordError>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.valid.len() + self.errors.len()
    }

    /// Error messages with their frequency, most common first.
    /// Ties keep the order in which the message first appeared.
    pub fn error_counts(&self) -> Vec<(String, usize)> {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for err in &self.errors {
            *counts.entry(err.error.as_str()).or_insert(0) += 1;
        }

        let mut counts: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(message, count)| (message.to_string(), count))
            .collect();
        // stable sort keeps first-seen order among equal counts
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }
}

/// What a finished run reports back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub error_counts: Vec<(String, usize)>,
    pub output_path: String,
}
