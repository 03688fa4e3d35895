use rubato::{FftFixedIn, Resampler};

use super::PcmBuffer;
use crate::errors::StitchError;

const CHUNK_FRAMES: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Brings `pcm` to exactly `sample_rate` / `channels`.
///
/// # Errors
///
/// Returns `StitchError::Decode` if the resampler cannot be built or fails.
pub fn normalize(pcm: PcmBuffer, sample_rate: u32, channels: u16) -> Result<PcmBuffer, StitchError> {
    if channels == 0 || sample_rate == 0 {
        return Err(StitchError::Decode(format!(
            "cannot normalize to {channels} channels at {sample_rate} Hz"
        )));
    }
    let remixed = remix(pcm, channels);
    resample(remixed, sample_rate)
}

/// Maps the channel layout: mono is duplicated, downmix to mono averages,
/// anything else wraps source channels around the target layout.
#[must_use]
pub fn remix(pcm: PcmBuffer, channels: u16) -> PcmBuffer {
    if pcm.channels == channels || pcm.channels == 0 {
        return PcmBuffer::new(pcm.samples, pcm.sample_rate, channels.max(pcm.channels));
    }

    let src = usize::from(pcm.channels);
    let dst = usize::from(channels);
    let mut out = Vec::with_capacity(pcm.frames() * dst);

    for frame in pcm.samples.chunks_exact(src) {
        if dst == 1 {
            out.push(frame.iter().sum::<f32>() / src as f32);
        } else if src == 1 {
            out.extend(std::iter::repeat_n(frame[0], dst));
        } else {
            out.extend((0..dst).map(|ch| frame[ch % src]));
        }
    }

    PcmBuffer::new(out, pcm.sample_rate, channels)
}

/// Converts the sample rate, keeping the duration (frame count scaled by the rate ratio).
///
/// # Errors
///
/// Returns `StitchError::Decode` if the resampler cannot be built or fails.
pub fn resample(pcm: PcmBuffer, sample_rate: u32) -> Result<PcmBuffer, StitchError> {
    if pcm.sample_rate == sample_rate {
        return Ok(pcm);
    }
    let channels = usize::from(pcm.channels);
    let frames = pcm.frames();
    if frames == 0 || channels == 0 {
        return Ok(PcmBuffer::empty(sample_rate, pcm.channels));
    }

    let planar = deinterleave(&pcm.samples, channels);
    let mut resampler = FftFixedIn::<f32>::new(
        pcm.sample_rate as usize,
        sample_rate as usize,
        CHUNK_FRAMES,
        SUB_CHUNKS,
        channels,
    )
    .map_err(|e| StitchError::Decode(format!("cannot build resampler: {e}")))?;

    let delay = resampler.output_delay();
    let expected =
        (frames as u64 * u64::from(sample_rate)).div_ceil(u64::from(pcm.sample_rate)) as usize;
    let wanted = expected + delay;
    let mut out: Vec<Vec<f32>> = vec![Vec::with_capacity(wanted); channels];
    let fail = |e: rubato::ResampleError| StitchError::Decode(format!("resampling failed: {e}"));

    let mut pos = 0;
    while pos + resampler.input_frames_next() <= frames {
        let take = resampler.input_frames_next();
        let chunk: Vec<&[f32]> = planar.iter().map(|c| &c[pos..pos + take]).collect();
        append(&mut out, resampler.process(chunk.as_slice(), None).map_err(fail)?);
        pos += take;
    }

    if pos < frames {
        let tail: Vec<&[f32]> = planar.iter().map(|c| &c[pos..]).collect();
        append(
            &mut out,
            resampler.process_partial(Some(tail.as_slice()), None).map_err(fail)?,
        );
    }

    // Push silence through until the delayed samples have come out.
    while out[0].len() < wanted {
        let flushed = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(fail)?;
        if flushed.first().is_none_or(Vec::is_empty) {
            break;
        }
        append(&mut out, flushed);
    }

    for channel in &mut out {
        channel.drain(..delay.min(channel.len()));
        channel.resize(expected, 0.0);
    }

    Ok(PcmBuffer::new(interleave(&out), sample_rate, pcm.channels))
}

fn append(out: &mut [Vec<f32>], chunk: Vec<Vec<f32>>) {
    for (dst, src) in out.iter_mut().zip(chunk) {
        dst.extend(src);
    }
}

fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let mut planar = vec![Vec::with_capacity(samples.len() / channels); channels];
    for frame in samples.chunks_exact(channels) {
        for (ch, sample) in frame.iter().enumerate() {
            planar[ch].push(*sample);
        }
    }
    planar
}

fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let frames = planar.first().map_or(0, Vec::len);
    let mut out = Vec::with_capacity(frames * planar.len());
    for i in 0..frames {
        out.extend(planar.iter().map(|c| c[i]));
    }
    out
}
