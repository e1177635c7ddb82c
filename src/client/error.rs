//! Errors reported by the Splitwise API or by local request validation.
//!
//! Client methods return [`anyhow::Result`]; these types are the underlying causes and can be
//! recovered with `err.downcast_ref::<ApiError>()`.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A non-2xx response. `message` comes from the body's `error`/`errors` field when present.
    #[error("Splitwise returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A 2xx response that carries an `errors` payload, e.g. failed validation of an expense.
    #[error("Splitwise rejected the request: {errors}")]
    Rejected { errors: Value },

    /// Input refused before sending anything.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("unexpected response from Splitwise: {0}")]
    MalformedResponse(String),
}

impl ApiError {
    /// Builds a [`ApiError::Status`] from a raw error body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| {
                json.get("error")
                    .or_else(|| json.get("errors"))
                    .map(|e| match e {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
            })
            .unwrap_or_else(|| body.to_string());

        ApiError::Status { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Whether an `errors` field actually reports something; absent, null and empty don't count.
pub(crate) fn has_errors(errors: Option<&Value>) -> bool {
    match errors {
        None | Some(Value::Null) => false,
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}
