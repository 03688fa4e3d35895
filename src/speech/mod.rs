//! Text-to-speech behind a narrow trait.

pub mod polly;

use async_trait::async_trait;

use crate::audio::AudioClip;
use crate::errors::StitchError;

pub use polly::PollySynthesizer;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Identifies the voice; part of the result-cache key.
    fn voice(&self) -> &str;

    async fn synthesize(&self, text: &str) -> Result<AudioClip, StitchError>;
}
