use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use super::countries::CountryTable;
use super::outcome::compose;
use crate::domain::model::Record;
use crate::domain::ports::Clock;

pub const CHANNEL_FIELD: &str = "Channel";
pub const CHANNEL_TYPE_FIELD: &str = "Channel_Type";
pub const PROCESSED_AT_FIELD: &str = "Processed_At";

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn channel_type(channel: &str) -> &'static str {
    match channel.to_uppercase().as_str() {
        "POS" => "Presencial",
        "ONLINE" => "Digital",
        "ATM" => "Cajero",
        _ => "Otro",
    }
}

/// Adds `Channel_Type` derived from `Channel`. Missing or non-text channels are "Otro".
pub fn enrich_channel(mut record: Record) -> Record {
    let label = match record.get(CHANNEL_FIELD) {
        Some(Value::String(channel)) => channel_type(channel),
        _ => "Otro",
    };
    record.insert(CHANNEL_TYPE_FIELD, label);
    record
}

pub fn add_timestamp(mut record: Record, clock: &dyn Clock) -> Record {
    let stamp = clock.now().to_rfc3339_opts(SecondsFormat::Micros, true);
    record.insert(PROCESSED_AT_FIELD, stamp);
    record
}

/// Country normalization, channel enrichment and processing timestamp, in that order.
#[derive(Clone)]
pub struct Transformer {
    countries: Arc<CountryTable>,
    clock: Arc<dyn Clock>,
}

impl Transformer {
    pub fn new(countries: Arc<CountryTable>, clock: Arc<dyn Clock>) -> Self {
        Self { countries, clock }
    }

    pub fn apply(&self, record: Record) -> Record {
        let countries = Arc::clone(&self.countries);
        let clock = Arc::clone(&self.clock);
        let steps: Vec<Box<dyn Fn(Record) -> Record>> = vec![
            Box::new(move |r: Record| countries.normalize_record(r)),
            Box::new(enrich_channel),
            Box::new(move |r: Record| add_timestamp(r, clock.as_ref())),
        ];
        compose(steps)(record)
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new(Arc::new(CountryTable::default()), Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer")
            .field("countries", &self.countries.len())
            .finish_non_exhaustive()
    }
}
