//! Per-field validators.
//!
//! A validator takes one raw value and either accepts it (possibly coerced) or
//! rejects it with a human-readable reason. Validators are stateless apart
//! from the configuration they were built with.

use chrono::NaiveDateTime;
use serde_json::{Number, Value};

use super::outcome::Outcome;

pub const DEFAULT_DATE_FORMATS: [&str; 4] = [
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

/// Accept a raw value, produce the accepted value or a rejection reason.
pub trait FieldValidator: Send + Sync {
    fn validate(&self, value: &Value) -> Outcome<Value, String>;
}

impl<F> FieldValidator for F
where
    F: Fn(&Value) -> Outcome<Value, String> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Outcome<Value, String> {
        self(value)
    }
}

/// Renders a value the way it appears in failure messages: strings bare, the rest as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Primitive type checks for plain schema columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCheck {
    /// Any scalar. Numbers and booleans pass too: sanitizing turns
    /// numeric-looking identifiers into numbers.
    Text,
    /// A number, or a string that parses as one. Yields the number.
    Number,
}

impl FieldValidator for TypeCheck {
    fn validate(&self, value: &Value) -> Outcome<Value, String> {
        match self {
            TypeCheck::Text => match value {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                    Outcome::Success(value.clone())
                }
                _ => Outcome::Failure("Expected text".to_string()),
            },
            TypeCheck::Number => match coerce_f64(value).and_then(Number::from_f64) {
                Some(n) => Outcome::Success(Value::Number(n)),
                None => Outcome::Failure("Expected number".to_string()),
            },
        }
    }
}

/// Accepts a strictly positive amount, as a number or a numeric string, and
/// yields it as a float.
///
/// Booleans are not amounts: `true` fails with `Invalid float` rather than
/// counting as `1.0`. Null and infinities fail the same way; NaN fails as
/// non-positive.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositiveFloat;

impl FieldValidator for PositiveFloat {
    fn validate(&self, value: &Value) -> Outcome<Value, String> {
        let Some(amount) = coerce_f64(value) else {
            return Outcome::Failure("Invalid float".to_string());
        };

        // NaN fails this comparison as well
        if !(amount > 0.0) {
            return Outcome::Failure("Amount must be positive".to_string());
        }

        match Number::from_f64(amount) {
            Some(n) => Outcome::Success(Value::Number(n)),
            None => Outcome::Failure("Invalid float".to_string()),
        }
    }
}

/// Accepts a date-time string matching any of its formats, tried in order.
///
/// The value is returned unchanged, not parsed. An ambiguous value such as
/// `01/02/2025 10:00` is accepted under the first format that parses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateValidator {
    formats: Vec<String>,
}

impl DateValidator {
    /// `primary` first, then the remaining default formats.
    pub fn new(primary: &str) -> Self {
        let mut formats = vec![primary.to_string()];
        formats.extend(
            DEFAULT_DATE_FORMATS
                .iter()
                .filter(|f| **f != primary)
                .map(|f| f.to_string()),
        );
        Self { formats }
    }

    pub fn with_formats<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for format in formats {
            let format = format.into();
            if !unique.contains(&format) {
                unique.push(format);
            }
        }
        Self { formats: unique }
    }

    pub fn formats(&self) -> &[String] {
        &self.formats
    }
}

impl Default for DateValidator {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMATS[0])
    }
}

impl FieldValidator for DateValidator {
    fn validate(&self, value: &Value) -> Outcome<Value, String> {
        let text = display_value(value);
        let matched = self
            .formats
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(&text, format).is_ok());

        if matched {
            Outcome::Success(value.clone())
        } else {
            Outcome::Failure(format!(
                "Date must match one of: [{}]",
                self.formats.join(", ")
            ))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryWhitelist {
    allowed: Vec<String>,
}

impl CountryWhitelist {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }
}

impl FieldValidator for CountryWhitelist {
    fn validate(&self, value: &Value) -> Outcome<Value, String> {
        match value {
            Value::String(code) if self.allowed.iter().any(|a| a == code) => {
                Outcome::Success(value.clone())
            }
            other => Outcome::Failure(format!("Country {} not allowed", display_value(other))),
        }
    }
}
