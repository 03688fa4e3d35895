use async_trait::async_trait;
use aws_sdk_polly::Client as PollyClient;
use aws_sdk_polly::error::DisplayErrorContext;
use aws_sdk_polly::types::{Engine, OutputFormat, VoiceId};
use tracing::debug;

use super::SpeechSynthesizer;
use crate::audio::{AudioClip, ClipEncoding};
use crate::core::config::AppConfig;
use crate::errors::StitchError;

/// Polly returns headerless 16-bit mono PCM at this rate.
pub const POLLY_PCM_SAMPLE_RATE: u32 = 16_000;

/// Speech from Amazon Polly as raw PCM, so no MP3 round trip is needed before mixing.
pub struct PollySynthesizer {
    client: PollyClient,
    voice_id: VoiceId,
    engine: Engine,
    descriptor: String,
    max_chars: usize,
}

impl PollySynthesizer {
    #[must_use]
    pub fn new(client: PollyClient, config: &AppConfig) -> Self {
        Self {
            client,
            voice_id: VoiceId::from(config.polly_voice_id.as_str()),
            engine: Engine::from(config.polly_engine.as_str()),
            descriptor: format!("polly:{}:{}", config.polly_voice_id, config.polly_engine),
            max_chars: config.max_message_chars,
        }
    }

    #[must_use]
    pub fn from_conf(shared_config: &aws_config::SdkConfig, config: &AppConfig) -> Self {
        Self::new(PollyClient::new(shared_config), config)
    }
}

#[async_trait]
impl SpeechSynthesizer for PollySynthesizer {
    fn voice(&self) -> &str {
        &self.descriptor
    }

    async fn synthesize(&self, text: &str) -> Result<AudioClip, StitchError> {
        let chars = text.chars().count();
        if text.trim().is_empty() || chars > self.max_chars {
            return Err(StitchError::Validation(format!(
                "speech text must be 1..={} characters, got {chars}",
                self.max_chars
            )));
        }

        #[cfg(feature = "debug-logs")]
        debug!("Synthesizing speech for text:\n{}", text);

        #[cfg(not(feature = "debug-logs"))]
        debug!("Synthesizing speech for {} characters", chars);

        let response = self
            .client
            .synthesize_speech()
            .text(text)
            .voice_id(self.voice_id.clone())
            .engine(self.engine.clone())
            .output_format(OutputFormat::Pcm)
            .sample_rate(POLLY_PCM_SAMPLE_RATE.to_string())
            .send()
            .await
            .map_err(|e| StitchError::Synthesis(format!("{}", DisplayErrorContext(&e))))?;

        let audio = response
            .audio_stream
            .collect()
            .await
            .map_err(|e| StitchError::Synthesis(format!("Failed to read audio stream: {e}")))?
            .to_vec();

        if audio.is_empty() {
            return Err(StitchError::Synthesis(
                "Polly returned an empty audio stream".to_string(),
            ));
        }

        debug!(voice = %self.descriptor, chars, size_bytes = audio.len(), "synthesized speech");
        Ok(AudioClip::new(
            "speech",
            audio,
            ClipEncoding::Pcm16 {
                sample_rate: POLLY_PCM_SAMPLE_RATE,
                channels: 1,
            },
        ))
    }
}
