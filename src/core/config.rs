use std::env;
use std::time::Duration;

use tracing::level_filters::LevelFilter;

use crate::audio::OutputFormat;
use crate::errors::StitchError;

pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 3000;
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_INLINE_AUDIO_LIMIT: usize = 5 * 1024 * 1024;

/// Process-wide settings, read once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Destination bucket for outputs; falls back to the bucket of the audio source.
    pub output_bucket: Option<String>,
    pub log_level: LevelFilter,
    pub logger_name: String,
    pub max_message_chars: usize,
    /// Upper bound for every individual storage/synthesis/encoder call.
    pub stage_timeout: Duration,
    pub inline_audio_limit: usize,
    pub output_format: OutputFormat,
    pub ffmpeg_path: String,
    pub polly_voice_id: String,
    pub polly_engine: String,
    /// Key prefix for cached artifacts. `None` disables the cache.
    pub cache_prefix: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_bucket: None,
            log_level: LevelFilter::WARN,
            logger_name: "default".to_string(),
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            inline_audio_limit: DEFAULT_INLINE_AUDIO_LIMIT,
            output_format: OutputFormat::Mp3,
            ffmpeg_path: "ffmpeg".to_string(),
            polly_voice_id: "Joanna".to_string(),
            polly_engine: "standard".to_string(),
            cache_prefix: None,
        }
    }
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns `StitchError::Config` if a variable is present but unparsable.
    pub fn from_env() -> Result<Self, StitchError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `StitchError::Config` if a variable is present but unparsable.
    pub fn from_vars<F>(lookup: F) -> Result<Self, StitchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let log_level = match var("DEBUG_LEVEL") {
            Some(raw) => parse_log_level(&raw)
                .ok_or_else(|| StitchError::Config(format!("DEBUG_LEVEL: unknown level '{raw}'")))?,
            None => defaults.log_level,
        };

        let output_format = match var("OUTPUT_FORMAT") {
            Some(raw) => raw.parse::<OutputFormat>()?,
            None => defaults.output_format,
        };

        Ok(Self {
            output_bucket: var("OUTPUT_BUCKET"),
            log_level,
            logger_name: var("LOGGER_NAME").unwrap_or(defaults.logger_name),
            max_message_chars: parse_number(var("MAX_MESSAGE_CHARS"), "MAX_MESSAGE_CHARS")?
                .unwrap_or(defaults.max_message_chars),
            stage_timeout: parse_number(var("STAGE_TIMEOUT_SECS"), "STAGE_TIMEOUT_SECS")?
                .map_or(defaults.stage_timeout, Duration::from_secs),
            inline_audio_limit: parse_number(
                var("INLINE_AUDIO_LIMIT_BYTES"),
                "INLINE_AUDIO_LIMIT_BYTES",
            )?
            .unwrap_or(defaults.inline_audio_limit),
            output_format,
            ffmpeg_path: var("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            polly_voice_id: var("POLLY_VOICE_ID").unwrap_or(defaults.polly_voice_id),
            polly_engine: var("POLLY_ENGINE").unwrap_or(defaults.polly_engine),
            cache_prefix: var("CACHE_PREFIX"),
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    raw: Option<String>,
    name: &str,
) -> Result<Option<T>, StitchError>
where
    T::Err: std::fmt::Display,
{
    raw.map(|v| {
        v.trim()
            .parse::<T>()
            .map_err(|e| StitchError::Config(format!("{name}: {e}")))
    })
    .transpose()
}

/// Accepts level names as well as the numeric levels Python's `logging` uses.
#[must_use]
pub fn parse_log_level(raw: &str) -> Option<LevelFilter> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "0" | "NOTSET" => Some(LevelFilter::TRACE),
        "DEBUG" | "10" => Some(LevelFilter::DEBUG),
        "INFO" | "20" => Some(LevelFilter::INFO),
        "WARN" | "WARNING" | "30" => Some(LevelFilter::WARN),
        "ERROR" | "CRITICAL" | "40" | "50" => Some(LevelFilter::ERROR),
        "OFF" => Some(LevelFilter::OFF),
        _ => None,
    }
}
