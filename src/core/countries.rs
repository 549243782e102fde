use std::collections::HashMap;

use serde_json::Value;

use crate::domain::model::Record;

pub const COUNTRY_FIELD: &str = "Merchant_Country";

const DEFAULT_ALIASES: [(&str, &str); 14] = [
    ("India", "IN"),
    ("México", "MX"),
    ("Mexico", "MX"),
    ("USA", "US"),
    ("United States", "US"),
    ("UK", "GB"),
    ("United Kingdom", "GB"),
    ("Canada", "CA"),
    ("Deutschland", "DE"),
    ("Germany", "DE"),
    ("France", "FR"),
    ("UAE", "AE"),
    ("United Arab Emirates", "AE"),
    ("Singapore", "SG"),
];

/// Free-text country name → two-letter code. Lookups are exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryTable {
    aliases: HashMap<String, String>,
}

impl CountryTable {
    pub fn empty() -> Self {
        Self {
            aliases: HashMap::new(),
        }
    }

    /// Adds or overrides aliases, keeping everything else.
    pub fn with_aliases<I, K, V>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.aliases
            .extend(aliases.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// The code for a known alias, otherwise the input unchanged.
    pub fn normalize<'a>(&'a self, name: &'a str) -> &'a str {
        self.lookup(name).unwrap_or(name)
    }

    /// Rewrites the country field of `record` when it holds a known alias.
    /// Absent and non-string values are left alone.
    pub fn normalize_record(&self, mut record: Record) -> Record {
        if let Some(Value::String(name)) = record.data.get_mut(COUNTRY_FIELD) {
            if let Some(code) = self.lookup(name) {
                *name = code.to_string();
            }
        }
        record
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl Default for CountryTable {
    fn default() -> Self {
        Self::empty().with_aliases(DEFAULT_ALIASES)
    }
}
