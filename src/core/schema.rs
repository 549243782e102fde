//! Schemas and the validation engine.
//!
//! A [`Schema`] is an ordered list of `(field, validator)` pairs. Its keys are
//! the required fields of a record. [`Schema::validate`] checks presence first
//! (all missing fields reported together), then runs each validator in
//! declaration order.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::countries::COUNTRY_FIELD;
use super::outcome::Outcome;
use super::validators::{CountryWhitelist, DateValidator, FieldValidator, PositiveFloat, TypeCheck};
use crate::domain::model::Record;

pub const DEFAULT_ALLOWED_COUNTRIES: [&str; 7] = ["IN", "GB", "US", "AE", "MX", "CA", "SG"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ValidationPolicy {
    /// Stop at the first failing field.
    #[default]
    FailFast,
    /// Run every validator and report all failing fields.
    CollectAll,
}

/// What a successful validation hands back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordOutput {
    /// The input record, untouched. Validator coercions are dropped.
    #[default]
    Original,
    /// The input record with every schema field replaced by its validator's output.
    Coerced,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOptions {
    pub policy: ValidationPolicy,
    pub output: RecordOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFailure {
    pub field: String,
    pub reason: String,
}

impl fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.field, self.reason)
    }
}

/// Why a record was rejected. `Display` gives the reported message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationFailure {
    /// Required fields absent, in schema order.
    MissingFields(Vec<String>),
    /// First failing field under [`ValidationPolicy::FailFast`].
    Field(FieldFailure),
    /// Every failing field under [`ValidationPolicy::CollectAll`].
    Fields(Vec<FieldFailure>),
}

impl ValidationFailure {
    /// Names of the fields this failure is about.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            ValidationFailure::MissingFields(fields) => fields.iter().map(String::as_str).collect(),
            ValidationFailure::Field(failure) => vec![failure.field.as_str()],
            ValidationFailure::Fields(failures) => {
                failures.iter().map(|f| f.field.as_str()).collect()
            }
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::MissingFields(fields) => {
                write!(f, "Missing fields: [{}]", fields.join(", "))
            }
            ValidationFailure::Field(failure) => write!(f, "{}", failure),
            ValidationFailure::Fields(failures) => {
                let messages: Vec<String> = failures.iter().map(ToString::to_string).collect();
                write!(f, "{}", messages.join("; "))
            }
        }
    }
}

impl std::error::Error for ValidationFailure {}

#[derive(Clone, Default)]
pub struct Schema {
    fields: Vec<(String, Arc<dyn FieldValidator>)>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("fields", &self.field_names().collect::<Vec<_>>())
            .finish()
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field. Declaring a field twice replaces its validator but keeps its position.
    pub fn field(mut self, name: impl Into<String>, validator: impl FieldValidator + 'static) -> Self {
        let name = name.into();
        let validator: Arc<dyn FieldValidator> = Arc::new(validator);
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = validator,
            None => self.fields.push((name, validator)),
        }
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The card-transaction contract with the default allow-list and date formats.
    pub fn transaction() -> Self {
        Self::transaction_with(
            CountryWhitelist::new(DEFAULT_ALLOWED_COUNTRIES),
            DateValidator::default(),
        )
    }

    pub fn transaction_with(countries: CountryWhitelist, dates: DateValidator) -> Self {
        Self::new()
            .field("Transaction_ID", TypeCheck::Text)
            .field("Card_ID", TypeCheck::Text)
            .field("Timestamp", dates)
            .field("Amount", PositiveFloat)
            .field("Merchant_City", TypeCheck::Text)
            .field(COUNTRY_FIELD, countries)
            .field("Latitude", TypeCheck::Number)
            .field("Longitude", TypeCheck::Number)
            .field("Device_ID", TypeCheck::Text)
            .field("Channel", TypeCheck::Text)
            .field("Entry_Mode", TypeCheck::Text)
            .field("Auth_Method", TypeCheck::Text)
            .field("Merchant_Category", TypeCheck::Text)
            .field("Transaction_Status", TypeCheck::Text)
    }

    pub fn missing_fields(&self, record: &Record) -> Vec<String> {
        self.field_names()
            .filter(|name| !record.contains_key(name))
            .map(str::to_string)
            .collect()
    }

    /// Fail-fast validation returning the original record on success.
    pub fn validate(&self, record: &Record) -> Outcome<Record, ValidationFailure> {
        self.validate_with(record, &ValidationOptions::default())
    }

    pub fn validate_with(
        &self,
        record: &Record,
        options: &ValidationOptions,
    ) -> Outcome<Record, ValidationFailure> {
        let missing = self.missing_fields(record);
        if !missing.is_empty() {
            return Outcome::Failure(ValidationFailure::MissingFields(missing));
        }

        let mut accepted = record.clone();
        let mut failures = Vec::new();

        for (name, validator) in &self.fields {
            let Some(raw) = record.get(name) else {
                continue;
            };

            match validator.validate(raw) {
                Outcome::Success(value) => {
                    if options.output == RecordOutput::Coerced {
                        accepted.insert(name.clone(), value);
                    }
                }
                Outcome::Failure(reason) => {
                    let failure = FieldFailure {
                        field: name.clone(),
                        reason,
                    };
                    if options.policy == ValidationPolicy::FailFast {
                        return Outcome::Failure(ValidationFailure::Field(failure));
                    }
                    failures.push(failure);
                }
            }
        }

        if failures.is_empty() {
            Outcome::Success(accepted)
        } else {
            Outcome::Failure(ValidationFailure::Fields(failures))
        }
    }
}

/// Validates against an explicit schema with default options.
pub fn validate_record(record: &Record, schema: &Schema) -> Outcome<Record, ValidationFailure> {
    schema.validate(record)
}

/// Validates against the default transaction schema.
pub fn validate_transaction(record: &Record) -> Outcome<Record, ValidationFailure> {
    Schema::transaction().validate(record)
}
