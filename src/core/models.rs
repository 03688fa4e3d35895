use serde::{Deserialize, Serialize};

use crate::errors::StitchError;

/// One unit of work: speak `message`, then append the clips found at `audio_source`.
///
/// Missing fields deserialize as empty strings so that validation, not serde,
/// decides what the caller is told.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "audios", default)]
    pub audio_source: String,
    #[serde(rename = "output", default)]
    pub output_path: String,
}

impl JobRequest {
    #[must_use]
    pub fn new(message: &str, audio_source: &str, output_path: &str) -> Self {
        Self {
            message: message.to_string(),
            audio_source: audio_source.to_string(),
            output_path: output_path.to_string(),
        }
    }

    /// # Errors
    ///
    /// Returns `StitchError::Validation` describing the first offending field.
    pub fn validate(&self, max_message_chars: usize) -> Result<(), StitchError> {
        if self.message.trim().is_empty() {
            return Err(StitchError::Validation(
                "message must not be empty".to_string(),
            ));
        }

        let chars = self.message.chars().count();
        if chars > max_message_chars {
            return Err(StitchError::Validation(format!(
                "message is {chars} characters long, the limit is {max_message_chars}"
            )));
        }

        if self.audio_source.trim().is_empty() {
            return Err(StitchError::Validation(
                "audios must name a storage location".to_string(),
            ));
        }

        validate_output_path(&self.output_path)
    }
}

/// Rejects output keys that cannot name a single writable object.
///
/// # Errors
///
/// Returns `StitchError::Validation` when the path is malformed.
pub fn validate_output_path(path: &str) -> Result<(), StitchError> {
    let reject = |why: &str| Err(StitchError::Validation(format!("output path '{path}' {why}")));

    if path.trim().is_empty() {
        return Err(StitchError::Validation(
            "output must name a destination key".to_string(),
        ));
    }
    if path.starts_with('/') {
        return reject("must be relative");
    }
    if path.ends_with('/') {
        return reject("must name a file, not a folder");
    }
    if path.chars().any(char::is_control) {
        return reject("contains control characters");
    }
    if path
        .split('/')
        .any(|segment| segment.trim().is_empty() || segment == "." || segment == "..")
    {
        return reject("contains an empty or relative segment");
    }

    Ok(())
}

/// Reply for one request; also the JSON body returned to HTTP callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_size_bytes: Option<u64>,
    /// Base64 of the encoded artifact, when small enough to inline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Failure classification such as `NotFoundError`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_wire_names() {
        let req: JobRequest = serde_json::from_str(
            r#"{"message":"hello shreeshail","audios":"clips","output":"output/test_1.mp3"}"#,
        )
        .unwrap();
        assert_eq!(req, JobRequest::new("hello shreeshail", "clips", "output/test_1.mp3"));
    }

    #[test]
    fn missing_fields_become_validation_errors() {
        let req: JobRequest = serde_json::from_str(r#"{"audios":"clips"}"#).unwrap();
        let err = req.validate(100).unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert!(err.to_string().contains("message"));
    }

    #[test]
    fn caps_message_length() {
        let req = JobRequest::new(&"a".repeat(11), "clips", "out.mp3");
        assert!(req.validate(10).is_err());
        assert!(req.validate(11).is_ok());
    }

    #[test]
    fn output_path_rules() {
        for bad in ["", "/abs.mp3", "dir/", "a//b.mp3", "../up.mp3", "a/./b.mp3", "bad\n.mp3"] {
            assert!(validate_output_path(bad).is_err(), "{bad:?} should be rejected");
        }
        for good in ["out.mp3", "output/test_1.mp3", "deep/nested/clip.wav"] {
            assert!(validate_output_path(good).is_ok(), "{good:?} should be accepted");
        }
    }

    #[test]
    fn failure_result_omits_empty_fields() {
        let result = JobResult {
            success: false,
            message: "nope".to_string(),
            error: Some("FetchError".to_string()),
            ..JobResult::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("audio_data").is_none());
        assert!(json.get("output_file").is_none());
    }
}
