use std::io::Cursor;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{MP3_BITRATE_KBPS, OutputFormat, PcmBuffer};
use crate::core::config::AppConfig;
use crate::errors::StitchError;

/// Turns the stitched PCM stream into the bytes of the final artifact.
#[async_trait]
pub trait AudioEncoder: Send + Sync {
    fn format(&self) -> OutputFormat;

    async fn encode(&self, pcm: &PcmBuffer) -> Result<Vec<u8>, StitchError>;
}

/// Picks the encoder for the configured output format.
#[must_use]
pub fn encoder_for(config: &AppConfig) -> Arc<dyn AudioEncoder> {
    match config.output_format {
        OutputFormat::Mp3 => Arc::new(FfmpegEncoder::new(&config.ffmpeg_path)),
        OutputFormat::Wav => Arc::new(WavEncoder),
    }
}

/// 16-bit PCM WAV, encoded in-process.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavEncoder;

#[async_trait]
impl AudioEncoder for WavEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Wav
    }

    async fn encode(&self, pcm: &PcmBuffer) -> Result<Vec<u8>, StitchError> {
        let spec = WavSpec {
            channels: pcm.channels,
            sample_rate: pcm.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut out = Vec::with_capacity(44 + pcm.samples.len() * 2);
        {
            let mut writer = WavWriter::new(Cursor::new(&mut out), spec)
                .map_err(|e| StitchError::Encode(format!("Failed to create WAV writer: {e}")))?;
            for sample in &pcm.samples {
                writer
                    .write_sample(to_i16(*sample))
                    .map_err(|e| StitchError::Encode(format!("Failed to write WAV sample: {e}")))?;
            }
            writer
                .finalize()
                .map_err(|e| StitchError::Encode(format!("Failed to finalize WAV: {e}")))?;
        }
        Ok(out)
    }
}

/// MP3 at a fixed bitrate through an external `ffmpeg` process.
///
/// Raw little-endian 16-bit PCM goes in on stdin, the MP3 stream comes back on stdout.
/// The child is killed if the encode future is dropped (for example on timeout).
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: String,
}

impl FfmpegEncoder {
    #[must_use]
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }

    fn args(pcm: &PcmBuffer) -> Vec<String> {
        let rate = pcm.sample_rate.to_string();
        let channels = pcm.channels.to_string();
        let bitrate = format!("{MP3_BITRATE_KBPS}k");
        [
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "s16le",
            "-ar",
            rate.as_str(),
            "-ac",
            channels.as_str(),
            "-i",
            "pipe:0",
            "-codec:a",
            "libmp3lame",
            "-b:a",
            bitrate.as_str(),
            "-f",
            "mp3",
            "pipe:1",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }
}

#[async_trait]
impl AudioEncoder for FfmpegEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Mp3
    }

    async fn encode(&self, pcm: &PcmBuffer) -> Result<Vec<u8>, StitchError> {
        let raw: Vec<u8> = pcm
            .samples
            .iter()
            .flat_map(|s| to_i16(*s).to_le_bytes())
            .collect();

        debug!(binary = %self.binary, input_bytes = raw.len(), "starting ffmpeg");
        let mut child = Command::new(&self.binary)
            .args(Self::args(pcm))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| StitchError::Encode(format!("cannot start '{}': {e}", self.binary)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| StitchError::Encode("ffmpeg stdin unavailable".to_string()))?;
        let feeder = tokio::spawn(async move {
            stdin.write_all(&raw).await?;
            stdin.shutdown().await
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| StitchError::Encode(format!("ffmpeg did not finish: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StitchError::Encode(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        match feeder.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(StitchError::Encode(format!("feeding ffmpeg failed: {e}"))),
            Err(e) => return Err(StitchError::Encode(format!("ffmpeg feeder task failed: {e}"))),
        }

        Ok(output.stdout)
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16
}
