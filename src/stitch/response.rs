use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::warn;

use crate::core::models::JobResult;
use crate::errors::StageFailure;

/// Result for a written artifact; inlines it as base64 when it fits under `inline_limit`.
#[must_use]
pub fn success(output_file: &str, bytes: &[u8], cached: bool, inline_limit: usize) -> JobResult {
    let size = bytes.len();
    let origin = if cached { " from cache" } else { "" };

    if size > inline_limit {
        warn!(
            size_bytes = size,
            inline_limit, "audio too large for the response, returning location only"
        );
        return JobResult {
            success: true,
            message: format!("Audio file created successfully{origin} (too large for response)"),
            output_file: Some(output_file.to_string()),
            audio_size_bytes: Some(size as u64),
            note: Some(format!(
                "Audio file is {size} bytes, above the {inline_limit} byte inline limit; it is available in storage only"
            )),
            ..JobResult::default()
        };
    }

    JobResult {
        success: true,
        message: format!("Audio file created successfully{origin}"),
        output_file: Some(output_file.to_string()),
        audio_size_bytes: Some(size as u64),
        audio_data: Some(STANDARD.encode(bytes)),
        ..JobResult::default()
    }
}

#[must_use]
pub fn failure(failure: &StageFailure) -> JobResult {
    JobResult {
        success: false,
        message: failure.to_string(),
        error: Some(failure.source.kind().to_string()),
        ..JobResult::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Stage, StitchError};

    #[test]
    fn small_payloads_are_inlined() {
        let result = success("output/test_1.mp3", b"abc", false, 10);
        assert!(result.success);
        assert_eq!(result.audio_data.as_deref(), Some("YWJj"));
        assert_eq!(result.audio_size_bytes, Some(3));
        assert!(result.note.is_none());
    }

    #[test]
    fn limit_is_inclusive() {
        assert!(success("o.mp3", &[0; 10], false, 10).audio_data.is_some());
        let over = success("o.mp3", &[0; 11], false, 10);
        assert!(over.audio_data.is_none());
        assert!(over.note.unwrap().contains("11 bytes"));
        assert_eq!(over.audio_size_bytes, Some(11));
    }

    #[test]
    fn cached_results_say_so() {
        assert!(success("o.mp3", b"x", true, 10).message.contains("from cache"));
    }

    #[test]
    fn failures_name_stage_and_kind() {
        let result = failure(&StageFailure::new(
            Stage::InputFetch,
            StitchError::NotFound("no .mp3 or .wav files under 'empty'".to_string()),
        ));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("NotFoundError"));
        assert!(result.message.starts_with("input-fetch stage failed [NotFoundError]"));
    }
}
