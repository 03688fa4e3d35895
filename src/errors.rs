use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StitchError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("No audio clips found: {0}")]
    NotFound(String),

    #[error("Failed to fetch audio clip: {0}")]
    Fetch(String),

    #[error("Failed to synthesize speech: {0}")]
    Synthesis(String),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Failed to encode audio: {0}")]
    Encode(String),

    #[error("Assembly plan contains no clips")]
    EmptyPlan,

    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Request cancelled before {0}")]
    Cancelled(&'static str),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl StitchError {
    /// Stable classification reported to callers in the `error` field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            StitchError::Validation(_) => "ValidationError",
            StitchError::NotFound(_) => "NotFoundError",
            StitchError::Fetch(_) => "FetchError",
            StitchError::Synthesis(_) => "SynthesisError",
            StitchError::Decode(_) => "DecodeError",
            StitchError::Encode(_) => "EncodeError",
            StitchError::EmptyPlan => "EmptyPlanError",
            StitchError::Write(_) => "WriteError",
            StitchError::Timeout { .. } => "TimeoutError",
            StitchError::Cancelled(_) => "CancelledError",
            StitchError::Config(_) => "ConfigError",
        }
    }
}

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validation,
    InputFetch,
    Synthesis,
    Assembly,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Validation => "validation",
            Stage::InputFetch => "input-fetch",
            Stage::Synthesis => "synthesis",
            Stage::Assembly => "assembly",
            Stage::Write => "write",
        };
        f.write_str(s)
    }
}

/// A `StitchError` tagged with the stage that produced it.
#[derive(Debug, Error)]
#[error("{stage} stage failed [{}]: {source}", .source.kind())]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub source: StitchError,
}

impl StageFailure {
    #[must_use]
    pub fn new(stage: Stage, source: StitchError) -> Self {
        Self { stage, source }
    }
}
