use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::core::models::JobRequest;
use crate::errors::StitchError;

/// Pulls the Job Request out of an API-gateway proxy event or a direct invocation.
///
/// # Errors
///
/// Returns `StitchError::Validation` if no job object can be read from the event.
pub fn extract_job_request(payload: &Value) -> Result<JobRequest, StitchError> {
    match payload.get("body") {
        Some(Value::String(body)) => {
            let text = if is_base64_encoded(payload) {
                decode_base64_body(body)?
            } else {
                body.clone()
            };
            serde_json::from_str(&text)
                .map_err(|e| StitchError::Validation(format!("body is not a valid job: {e}")))
        }
        Some(body) if body.is_object() => job_from_value(body),
        Some(Value::Null) | None if looks_like_job(payload) => job_from_value(payload),
        Some(Value::Null) | None => Err(StitchError::Validation(
            "event has no body".to_string(),
        )),
        Some(other) => Err(StitchError::Validation(format!(
            "body must be a JSON string or object, got {other}"
        ))),
    }
}

fn job_from_value(value: &Value) -> Result<JobRequest, StitchError> {
    serde_json::from_value(value.clone())
        .map_err(|e| StitchError::Validation(format!("body is not a valid job: {e}")))
}

fn looks_like_job(payload: &Value) -> bool {
    ["message", "audios", "output"]
        .iter()
        .any(|field| payload.get(*field).is_some())
}

fn is_base64_encoded(payload: &Value) -> bool {
    payload
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn decode_base64_body(body: &str) -> Result<String, StitchError> {
    let bytes = STANDARD
        .decode(body.trim())
        .map_err(|e| StitchError::Validation(format!("body is not valid base64: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| StitchError::Validation(format!("body is not valid UTF-8: {e}")))
}

/// Case-insensitive header lookup over the proxy event's `headers` object.
pub fn get_header_value<'a>(headers: &'a Value, name: &str) -> Option<&'a str> {
    if let Some(v) = headers.get(name).and_then(|s| s.as_str()) {
        return Some(v);
    }
    headers.as_object().and_then(|map| {
        map.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                v.as_str()
            } else {
                None
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_body() {
        let event = json!({
            "body": r#"{"message":"hi","audios":"bucket","output":"out.mp3"}"#
        });
        let job = extract_job_request(&event).unwrap();
        assert_eq!(job, JobRequest::new("hi", "bucket", "out.mp3"));
    }

    #[test]
    fn base64_body() {
        let raw = r#"{"message":"hi","audios":"bucket","output":"out.mp3"}"#;
        let event = json!({ "body": STANDARD.encode(raw), "isBase64Encoded": true });
        assert_eq!(extract_job_request(&event).unwrap().message, "hi");
    }

    #[test]
    fn object_body_and_direct_invocation() {
        let job = json!({"message":"hi","audios":"bucket","output":"out.mp3"});
        assert!(extract_job_request(&json!({ "body": job.clone() })).is_ok());
        assert!(extract_job_request(&job).is_ok());
    }

    #[test]
    fn malformed_events_are_validation_errors() {
        for event in [
            json!({ "body": "{not json" }),
            json!({ "body": 42 }),
            json!({ "headers": {} }),
            json!({ "body": "@@@", "isBase64Encoded": true }),
            json!({ "message": 5 }),
        ] {
            let err = extract_job_request(&event).unwrap_err();
            assert_eq!(err.kind(), "ValidationError", "{event}");
        }
    }

    #[test]
    fn header_lookup_ignores_case() {
        let headers = json!({ "x-amzn-trace-id": "Root=1-abc" });
        assert_eq!(
            get_header_value(&headers, "X-Amzn-Trace-Id"),
            Some("Root=1-abc")
        );
        assert_eq!(get_header_value(&headers, "Missing"), None);
    }
}
