use std::time::Duration;

use tracing::info;

use super::decode::decode_clip;
use super::resample::normalize;
use super::{AssemblyPlan, AudioEncoder, PcmBuffer, TARGET_CHANNELS, TARGET_SAMPLE_RATE};
use crate::errors::StitchError;

/// The encoded artifact produced for one plan.
#[derive(Debug, Clone)]
pub struct AssembledAudio {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub duration: Duration,
}

impl AssembledAudio {
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Decodes, normalizes and concatenates every clip of the plan, in order.
///
/// # Errors
///
/// `EmptyPlan` for a plan without clips, `Decode` if any clip is not valid audio.
pub fn render(plan: &AssemblyPlan) -> Result<PcmBuffer, StitchError> {
    if plan.is_empty() {
        return Err(StitchError::EmptyPlan);
    }

    let mut stitched = PcmBuffer::empty(TARGET_SAMPLE_RATE, TARGET_CHANNELS);
    for clip in plan.clips() {
        let pcm = normalize(decode_clip(clip)?, TARGET_SAMPLE_RATE, TARGET_CHANNELS)?;
        if !pcm.same_format(&stitched) {
            return Err(StitchError::Decode(format!(
                "{} normalized to {} Hz / {} channels",
                clip.key, pcm.sample_rate, pcm.channels
            )));
        }
        stitched.samples.extend_from_slice(&pcm.samples);
    }
    Ok(stitched)
}

/// Renders the plan on the blocking pool and encodes the result.
///
/// # Errors
///
/// Propagates `render` failures and `Encode` errors from the encoder.
pub async fn assemble(
    plan: AssemblyPlan,
    encoder: &dyn AudioEncoder,
) -> Result<AssembledAudio, StitchError> {
    let clip_count = plan.len();
    let pcm = tokio::task::spawn_blocking(move || render(&plan))
        .await
        .map_err(|e| StitchError::Decode(format!("render task failed: {e}")))??;

    let duration = pcm.duration();
    let bytes = encoder.encode(&pcm).await?;
    if bytes.is_empty() {
        return Err(StitchError::Encode("encoder produced no output".to_string()));
    }

    info!(
        clips = clip_count,
        duration_ms = duration.as_millis() as u64,
        size_bytes = bytes.len(),
        format = %encoder.format(),
        "assembled audio"
    );

    Ok(AssembledAudio {
        bytes,
        content_type: encoder.format().content_type(),
        duration,
    })
}
