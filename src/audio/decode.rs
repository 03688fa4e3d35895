use std::io::Cursor;

use hound::{SampleFormat, WavReader};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use super::{AudioClip, ClipEncoding, PcmBuffer};
use crate::errors::StitchError;

/// Decodes a clip into interleaved `f32` PCM at its native rate and layout.
///
/// # Errors
///
/// Returns `StitchError::Decode` if the bytes are not valid audio of the declared encoding.
pub fn decode_clip(clip: &AudioClip) -> Result<PcmBuffer, StitchError> {
    let pcm = match clip.encoding {
        ClipEncoding::Wav => decode_wav(&clip.bytes),
        ClipEncoding::Mp3 => decode_mp3(&clip.bytes),
        ClipEncoding::Pcm16 {
            sample_rate,
            channels,
        } => decode_pcm16(&clip.bytes, sample_rate, channels),
    }
    .map_err(|e| match e {
        StitchError::Decode(msg) => StitchError::Decode(format!("{}: {msg}", clip.key)),
        other => other,
    })?;

    debug!(
        clip = %clip.key,
        sample_rate = pcm.sample_rate,
        channels = pcm.channels,
        duration_ms = pcm.duration().as_millis() as u64,
        "decoded clip"
    );
    Ok(pcm)
}

fn decode_wav(bytes: &[u8]) -> Result<PcmBuffer, StitchError> {
    let mut reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| StitchError::Decode(format!("invalid WAV data: {e}")))?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(StitchError::Decode(format!(
            "WAV header declares {} channels at {} Hz",
            spec.channels, spec.sample_rate
        )));
    }

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StitchError::Decode(format!("corrupt WAV samples: {e}")))?,
        (SampleFormat::Int, bits @ 1..=32) => {
            let scale = 1.0 / (1_i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StitchError::Decode(format!("corrupt WAV samples: {e}")))?
        }
        (format, bits) => {
            return Err(StitchError::Decode(format!(
                "unsupported WAV sample format {format:?} with {bits} bits"
            )));
        }
    };

    Ok(PcmBuffer::new(samples, spec.sample_rate, spec.channels))
}

fn decode_mp3(bytes: &[u8]) -> Result<PcmBuffer, StitchError> {
    let source = Cursor::new(bytes.to_vec());
    let stream = MediaSourceStream::new(Box::new(source), Default::default());
    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| StitchError::Decode(format!("unrecognised MP3 stream: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| StitchError::Decode("MP3 stream has no audio track".to_string()))?;
    let track_id = track.id;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| StitchError::Decode(format!("no decoder for MP3 track: {e}")))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut layout: Option<(u32, u16)> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(StitchError::Decode(format!("corrupt MP3 stream: {e}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = u16::try_from(spec.channels.count())
                    .map_err(|_| StitchError::Decode("too many MP3 channels".to_string()))?;
                match layout {
                    None => layout = Some((spec.rate, channels)),
                    Some(existing) if existing != (spec.rate, channels) => {
                        return Err(StitchError::Decode(
                            "MP3 stream changes sample rate or channel layout mid-stream"
                                .to_string(),
                        ));
                    }
                    Some(_) => {}
                }
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            // A damaged frame is skipped; the rest of the stream stays usable.
            Err(SymphoniaError::DecodeError(e)) => warn!("skipping undecodable MP3 frame: {}", e),
            Err(e) => return Err(StitchError::Decode(format!("MP3 decoding failed: {e}"))),
        }
    }

    let (sample_rate, channels) =
        layout.ok_or_else(|| StitchError::Decode("MP3 stream has no audio frames".to_string()))?;
    Ok(PcmBuffer::new(samples, sample_rate, channels))
}

fn decode_pcm16(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<PcmBuffer, StitchError> {
    if sample_rate == 0 || channels == 0 {
        return Err(StitchError::Decode(format!(
            "raw PCM declared {channels} channels at {sample_rate} Hz"
        )));
    }
    if bytes.len() % 2 != 0 {
        return Err(StitchError::Decode(
            "raw PCM has an odd number of bytes".to_string(),
        ));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32_768.0)
        .collect();
    Ok(PcmBuffer::new(samples, sample_rate, channels))
}
