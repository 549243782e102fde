use std::path::Path;

use indexmap::IndexSet;
use serde_json::Value;

use crate::core::outcome::Outcome;
use crate::core::validators::display_value;
use crate::domain::model::{DecodedRecord, Record, RecordError};
use crate::utils::error::{EtlError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    pub fn from_path(path: &str) -> Result<Self> {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(InputFormat::Csv),
            Some("json") => Ok(InputFormat::Json),
            _ => Err(EtlError::UnsupportedFormatError {
                path: path.to_string(),
            }),
        }
    }

    /// Decodes every row. File-level problems (bad header, invalid JSON, a
    /// non-array top level) are errors; a bad row only fails its own slot.
    pub fn decode(self, data: &[u8]) -> Result<Vec<DecodedRecord>> {
        match self {
            InputFormat::Csv => records_from_csv(data),
            InputFormat::Json => records_from_json(data),
        }
    }
}

/// Header row → field names; every cell stays a string.
/// Short rows are kept, their trailing fields are simply absent.
pub fn records_from_csv(data: &[u8]) -> Result<Vec<DecodedRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let mut records = Vec::new();

    for row in reader.byte_records() {
        let decoded = match row {
            Ok(row) => csv_row_to_record(&headers, &row),
            Err(e) => Outcome::Failure(format!("Unreadable CSV row: {}", e)),
        };
        records.push(decoded);
    }

    tracing::debug!("Decoded {} CSV rows ({} columns)", records.len(), headers.len());
    Ok(records)
}

fn csv_row_to_record(headers: &csv::StringRecord, row: &csv::ByteRecord) -> DecodedRecord {
    let mut record = Record::new();
    for (field, cell) in headers.iter().zip(row.iter()) {
        match std::str::from_utf8(cell) {
            Ok(text) => record.insert(field, text),
            Err(_) => return Outcome::Failure(format!("Invalid UTF-8 in field {}", field)),
        }
    }
    Outcome::Success(record)
}

/// A top-level JSON array of objects.
pub fn records_from_json(data: &[u8]) -> Result<Vec<DecodedRecord>> {
    let parsed: Value = serde_json::from_slice(data)?;

    let Value::Array(items) = parsed else {
        return Err(EtlError::ProcessingError {
            message: "JSON input must be an array of transaction objects".to_string(),
        });
    };

    let records: Vec<DecodedRecord> = items
        .into_iter()
        .map(|item| match item {
            Value::Object(obj) => Outcome::Success(obj.into_iter().collect::<Record>()),
            other => Outcome::Failure(format!(
                "Record must be an object, got {}",
                display_value(&other)
            )),
        })
        .collect();

    tracing::debug!("Decoded {} JSON records", records.len());
    Ok(records)
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(value) => display_value(value),
    }
}

/// Columns are the union of all fields, in first-seen order.
pub fn records_to_csv(records: &[Record]) -> Result<String> {
    let columns: IndexSet<&str> = records
        .iter()
        .flat_map(|record| record.data.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns.iter())?;
    for record in records {
        writer.write_record(columns.iter().map(|column| cell(record.get(column))))?;
    }

    into_string(writer)
}

pub fn records_to_json(records: &[Record]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

pub fn errors_to_csv(errors: &[RecordError]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if errors.is_empty() {
        writer.write_record(["row", "error"])?;
    }
    for error in errors {
        writer.serialize(error)?;
    }
    into_string(writer)
}

pub fn errors_to_json(errors: &[RecordError]) -> Result<String> {
    Ok(serde_json::to_string_pretty(errors)?)
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
        message: format!("CSV output is not valid UTF-8: {}", e),
    })
}
