//! The per-record pipeline: optional sanitize, optional transform, then validate.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::countries::CountryTable;
use super::outcome::Outcome;
use super::sanitizers::Sanitizer;
use super::schema::{Schema, ValidationFailure, ValidationOptions};
use super::transforms::{SystemClock, Transformer};
use crate::domain::model::{BatchReport, DecodedRecord, Record, RecordError};
use crate::domain::ports::Clock;

/// Which pre-validation steps run. Sanitizing always runs before transforming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Stages {
    /// Clean raw values (batch file runs).
    #[default]
    Sanitize,
    /// Enrich with country code, channel type and timestamp (CSV and API flows).
    Transform,
    Both,
    /// Validate the record as given.
    None,
}

impl Stages {
    pub fn sanitizes(self) -> bool {
        matches!(self, Stages::Sanitize | Stages::Both)
    }

    pub fn transforms(self) -> bool {
        matches!(self, Stages::Transform | Stages::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stages::Sanitize => "sanitize",
            Stages::Transform => "transform",
            Stages::Both => "both",
            Stages::None => "none",
        }
    }
}

impl FromStr for Stages {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sanitize" => Ok(Stages::Sanitize),
            "transform" => Ok(Stages::Transform),
            "both" => Ok(Stages::Both),
            "none" => Ok(Stages::None),
            other => Err(format!("unknown stages '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordProcessor {
    schema: Schema,
    options: ValidationOptions,
    sanitizer: Option<Sanitizer>,
    transformer: Option<Transformer>,
}

impl RecordProcessor {
    /// Validation only, no pre-processing.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            options: ValidationOptions::default(),
            sanitizer: None,
            transformer: None,
        }
    }

    /// Builds the steps `stages` asks for, sharing one country table and clock.
    pub fn with_stages(
        schema: Schema,
        stages: Stages,
        countries: Arc<CountryTable>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut processor = Self::new(schema);
        if stages.sanitizes() {
            processor.sanitizer = Some(Sanitizer::new(Arc::clone(&countries)));
        }
        if stages.transforms() {
            processor.transformer = Some(Transformer::new(countries, clock));
        }
        processor
    }

    /// Default transaction schema, default country table, wall clock.
    pub fn transaction(stages: Stages) -> Self {
        Self::with_stages(
            Schema::transaction(),
            stages,
            Arc::new(CountryTable::default()),
            Arc::new(SystemClock),
        )
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    pub fn with_transformer(mut self, transformer: Transformer) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Runs the pre-validation steps only.
    pub fn prepare(&self, mut record: Record) -> Record {
        if let Some(sanitizer) = &self.sanitizer {
            record = sanitizer.apply(record);
        }
        if let Some(transformer) = &self.transformer {
            record = transformer.apply(record);
        }
        record
    }

    pub fn process(&self, record: Record) -> Outcome<Record, ValidationFailure> {
        let prepared = self.prepare(record);
        self.schema.validate_with(&prepared, &self.options)
    }

    /// Processes every record. One bad record never stops the batch; both
    /// output lists keep input order and errors carry the 0-based input row.
    pub fn process_batch<I>(&self, records: I) -> BatchReport
    where
        I: IntoIterator<Item = Record>,
    {
        self.process_decoded(records.into_iter().map(Outcome::Success))
    }

    /// Same as [`process_batch`](Self::process_batch) for rows straight out of a
    /// decoder. A row that failed to decode is reported at its own index.
    pub fn process_decoded<I>(&self, rows: I) -> BatchReport
    where
        I: IntoIterator<Item = DecodedRecord>,
    {
        let mut report = BatchReport::default();

        for (row, decoded) in rows.into_iter().enumerate() {
            let error = match decoded {
                Outcome::Success(record) => match self.process(record) {
                    Outcome::Success(valid) => {
                        report.valid.push(valid);
                        continue;
                    }
                    Outcome::Failure(failure) => failure.to_string(),
                },
                Outcome::Failure(reason) => reason,
            };

            tracing::debug!("Row {} rejected: {}", row, error);
            report.errors.push(RecordError { row, error });
        }

        tracing::debug!(
            "Processed {} records: {} valid, {} invalid",
            report.total(),
            report.valid.len(),
            report.errors.len()
        );
        report
    }
}
