/// Stitcher - speaks a message and appends a set of stored audio clips to it.
///
/// A request names a text message, a storage location holding `.mp3`/`.wav`
/// clips and an output key. The crate synthesizes the message, decodes and
/// normalizes every clip to one format, concatenates them (speech first, then
/// clips by key), encodes the result and writes it back to storage.
///
/// # Architecture
///
/// - `api`: AWS Lambda entry point behind an API gateway
/// - `stitch`: request orchestration, per-call timeouts, result cache
/// - `audio`: decoding (hound, symphonia), resampling (rubato), encoding
/// - `speech`: text-to-speech via Amazon Polly
/// - `storage`: S3 and local-filesystem clip stores
///
/// # Example
///
/// ```no_run
/// use stitcher::Stitcher;
/// use stitcher::core::config::AppConfig;
/// use stitcher::core::models::JobRequest;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = AppConfig::from_env()?;
///     stitcher::setup_logging(config.log_level);
///
///     let shared_config = aws_config::from_env().load().await;
///     let app = Stitcher::with_aws(config, &shared_config);
///
///     let request = JobRequest::new("hello shreeshail", "my-clips", "output/test_1.mp3");
///     let result = app.handle(&request, &app.scope()).await;
///     println!("{}", serde_json::to_string_pretty(&result)?);
///     Ok(())
/// }
/// ```
pub mod api;
pub mod audio;
pub mod core;
pub mod errors;
pub mod speech;
pub mod stitch;
pub mod storage;

pub use errors::{StageFailure, StitchError};
pub use stitch::Stitcher;

use tracing::level_filters::LevelFilter;

/// Configure structured logging with JSON format for AWS Lambda environments.
///
/// `level` is the default verbosity; `RUST_LOG` directives, when present, refine it.
/// Calling this more than once is harmless: later calls leave the first subscriber in place.
///
/// # Example
///
/// ```
/// stitcher::setup_logging(tracing::level_filters::LevelFilter::INFO);
/// ```
pub fn setup_logging(level: LevelFilter) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_current_span(true);

    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("global subscriber already installed");
    }
}
