//! Proxy response builders.

use serde_json::{Value, json};
use tracing::error;

use crate::core::models::JobResult;

/// Returns a 200 response whose body is the serialized Job Result.
///
/// Logical failures are reported in the body, never through the status code.
#[must_use]
pub fn job_response(result: &JobResult) -> Value {
    match serde_json::to_string(result) {
        Ok(body) => json!({
            "statusCode": 200,
            "headers": { "Content-Type": "application/json" },
            "body": body
        }),
        Err(e) => {
            error!("Failed to serialize job result: {}", e);
            err_response(500, "Failed to serialize job result")
        }
    }
}

/// Returns an error response with the given status code and message.
#[must_use]
pub fn err_response(status_code: u16, message: &str) -> Value {
    json!({
        "statusCode": status_code,
        "headers": { "Content-Type": "application/json" },
        "body": json!({ "success": false, "message": message, "error": "InternalError" }).to_string()
    })
}
