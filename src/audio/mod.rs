//! Audio clips, decoding, normalization and the assembly pipeline.

pub mod decode;
pub mod encode;
pub mod pipeline;
pub mod plan;
pub mod resample;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::StitchError;

pub use encode::{AudioEncoder, FfmpegEncoder, WavEncoder, encoder_for};
pub use pipeline::{AssembledAudio, assemble, render};
pub use plan::AssemblyPlan;

/// Every clip is brought to this rate before concatenation.
pub const TARGET_SAMPLE_RATE: u32 = 44_100;
/// Every clip is brought to this channel count before concatenation.
pub const TARGET_CHANNELS: u16 = 2;
/// Fixed MP3 bitrate for the final artifact.
pub const MP3_BITRATE_KBPS: u32 = 128;

pub const ALLOWED_AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav"];

/// How the bytes of a clip are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipEncoding {
    Wav,
    Mp3,
    /// Headerless signed 16-bit little-endian samples.
    Pcm16 { sample_rate: u32, channels: u16 },
}

impl ClipEncoding {
    /// Infers the container from a storage key's extension.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match extension(key)?.as_str() {
            "wav" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            _ => None,
        }
    }
}

/// Lowercased extension of the last path segment, if any.
#[must_use]
pub fn extension(key: &str) -> Option<String> {
    let name = key.rsplit('/').next().unwrap_or(key);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[must_use]
pub fn is_audio_key(key: &str) -> bool {
    extension(key).is_some_and(|ext| ALLOWED_AUDIO_EXTENSIONS.contains(&ext.as_str()))
}

/// An immutable unit of encoded audio, either fetched from storage or synthesized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub key: String,
    pub bytes: Vec<u8>,
    pub encoding: ClipEncoding,
}

impl AudioClip {
    #[must_use]
    pub fn new(key: impl Into<String>, bytes: Vec<u8>, encoding: ClipEncoding) -> Self {
        Self {
            key: key.into(),
            bytes,
            encoding,
        }
    }

    /// Wraps bytes read from storage, picking the decoder from the key.
    ///
    /// # Errors
    ///
    /// Returns `StitchError::Fetch` when the key has no supported audio extension.
    pub fn from_stored(key: &str, bytes: Vec<u8>) -> Result<Self, StitchError> {
        let encoding = ClipEncoding::from_key(key).ok_or_else(|| {
            StitchError::Fetch(format!(
                "'{key}' is not one of the supported formats {ALLOWED_AUDIO_EXTENSIONS:?}"
            ))
        })?;
        Ok(Self::new(key, bytes, encoding))
    }
}

/// Decoded audio: interleaved `f32` samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmBuffer {
    #[must_use]
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    #[must_use]
    pub fn empty(sample_rate: u32, channels: u16) -> Self {
        Self::new(Vec::new(), sample_rate, channels)
    }

    #[must_use]
    pub fn frames(&self) -> usize {
        match self.channels {
            0 => 0,
            n => self.samples.len() / usize::from(n),
        }
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    #[must_use]
    pub fn same_format(&self, other: &PcmBuffer) -> bool {
        self.sample_rate == other.sample_rate && self.channels == other.channels
    }
}

/// Output container of the final artifact. Fixed per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Mp3,
    Wav,
}

impl OutputFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Wav => "wav",
        }
    }

    #[must_use]
    pub fn content_type(self) -> String {
        mime_guess::from_ext(self.extension())
            .first_or_octet_stream()
            .to_string()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = StitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(OutputFormat::Mp3),
            "wav" => Ok(OutputFormat::Wav),
            other => Err(StitchError::Config(format!(
                "OUTPUT_FORMAT: unsupported format '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_keys_are_recognised_case_insensitively() {
        assert!(is_audio_key("hello.wav"));
        assert!(is_audio_key("clips/Shreeshail.WAV"));
        assert!(is_audio_key("a/b/c.mp3"));
        assert!(!is_audio_key("notes.txt"));
        assert!(!is_audio_key("clips.wav/readme"));
        assert!(!is_audio_key(".wav"));
        assert_eq!(ClipEncoding::from_key("x.Mp3"), Some(ClipEncoding::Mp3));
    }

    #[test]
    fn stored_clip_rejects_unknown_extension() {
        let err = AudioClip::from_stored("clip.ogg", vec![1, 2, 3]).unwrap_err();
        assert_eq!(err.kind(), "FetchError");
    }

    #[test]
    fn pcm_duration_counts_frames() {
        let pcm = PcmBuffer::new(vec![0.0; 44_100 * 2], 44_100, 2);
        assert_eq!(pcm.frames(), 44_100);
        assert_eq!(pcm.duration(), Duration::from_secs(1));
    }

    #[test]
    fn output_format_content_types() {
        assert_eq!(OutputFormat::Mp3.content_type(), "audio/mpeg");
        assert_eq!("WAV".parse::<OutputFormat>().unwrap(), OutputFormat::Wav);
        assert!("flac".parse::<OutputFormat>().is_err());
    }
}
