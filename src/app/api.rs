use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::outcome::Outcome;
use crate::core::processor::RecordProcessor;
use crate::domain::model::Record;

/// Response body for a single submitted transaction.
///
/// Serializes as `{"status": "success", "data": {...}}` or
/// `{"status": "failure", "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse {
    Success { data: Record },
    Failure { error: String },
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success { .. })
    }
}

/// Runs one payload through `processor`. Malformed payloads produce a
/// failure response, never an error.
pub fn validate_api_payload(payload: Value, processor: &RecordProcessor) -> ApiResponse {
    let Value::Object(fields) = payload else {
        return ApiResponse::Failure {
            error: "Payload must be a JSON object".to_string(),
        };
    };

    let record: Record = fields.into_iter().collect();
    match processor.process(record) {
        Outcome::Success(data) => ApiResponse::Success { data },
        Outcome::Failure(failure) => {
            tracing::debug!("API payload rejected: {}", failure);
            ApiResponse::Failure {
                error: failure.to_string(),
            }
        }
    }
}

/// Same as [`validate_api_payload`] for a raw request body.
pub fn validate_api_body(body: &str, processor: &RecordProcessor) -> ApiResponse {
    match serde_json::from_str::<Value>(body) {
        Ok(payload) => validate_api_payload(payload, processor),
        Err(e) => ApiResponse::Failure {
            error: format!("Invalid JSON: {}", e),
        },
    }
}
