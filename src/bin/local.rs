//! Runs the stitch pipeline against a local directory of clips.
//!
//! ```text
//! stitcher-local --message "hello shreeshail" --audios ./clips --output output/test_1.mp3
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use stitcher::Stitcher;
use stitcher::audio::encoder_for;
use stitcher::core::config::AppConfig;
use stitcher::core::models::JobRequest;
use stitcher::speech::PollySynthesizer;
use stitcher::storage::LocalStore;

const USAGE: &str = "usage: stitcher-local --message <text> --audios <dir> --output <file>";

struct Options {
    message: String,
    audios: String,
    output: String,
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Options> {
    let mut message = None;
    let mut audios = None;
    let mut output = None;

    let mut args = args.skip(1);
    while let Some(flag) = args.next() {
        let slot = match flag.as_str() {
            "--message" | "-m" => &mut message,
            "--audios" | "-a" => &mut audios,
            "--output" | "-o" => &mut output,
            "--help" | "-h" => bail!("{USAGE}"),
            other => bail!("unknown argument '{other}'\n{USAGE}"),
        };
        *slot = Some(args.next().with_context(|| format!("{flag} needs a value"))?);
    }

    Ok(Options {
        message: message.context(USAGE)?,
        audios: audios.context(USAGE)?,
        output: output.context(USAGE)?,
    })
}

/// Absolute outputs become a store rooted at their directory.
fn split_output(output: &str) -> (String, String) {
    let path = Path::new(output);
    match (path.is_absolute(), path.parent(), path.file_name()) {
        (true, Some(dir), Some(name)) => (
            dir.to_string_lossy().into_owned(),
            name.to_string_lossy().into_owned(),
        ),
        _ => (".".to_string(), output.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = parse_args(std::env::args())?;
    let config = AppConfig::from_env().context("invalid environment configuration")?;
    stitcher::setup_logging(config.log_level);

    let (root, output_key) = split_output(&options.output);
    let shared_config = aws_config::from_env().load().await;
    let store = Arc::new(LocalStore::new(root));
    let speech = Arc::new(PollySynthesizer::from_conf(&shared_config, &config));
    let encoder = encoder_for(&config);
    let app = Stitcher::new(config, store, speech, encoder);

    let request = JobRequest::new(&options.message, &options.audios, &output_key);
    let mut result = app.handle(&request, &app.scope()).await;
    result.audio_data = None;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        bail!("{}", result.message);
    }
    Ok(())
}
