#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use stitcher::Stitcher;
use stitcher::audio::{AudioClip, ClipEncoding, WavEncoder, is_audio_key};
use stitcher::core::config::AppConfig;
use stitcher::errors::StitchError;
use stitcher::speech::SpeechSynthesizer;
use stitcher::storage::{ClipStore, ObjectRef, SourceLocation};

/// In-memory bucket store with call counters.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<ObjectRef, Vec<u8>>>,
    fetch_delay: Option<Duration>,
    write_delay: Option<Duration>,
    pub lists: AtomicUsize,
    pub fetches: AtomicUsize,
    pub writes: AtomicUsize,
    pub reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|o| o.container == bucket)
            .map(|o| o.key.clone())
            .collect()
    }

    pub fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert(ObjectRef::new(bucket, key), bytes);
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&ObjectRef::new(bucket, key))
            .cloned()
    }

    pub fn adapter_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
            + self.fetches.load(Ordering::SeqCst)
            + self.writes.load(Ordering::SeqCst)
            + self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClipStore for MemoryStore {
    async fn list_or_resolve(&self, source: &str) -> Result<Vec<ObjectRef>, StitchError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.lock().unwrap();
        let found: Vec<ObjectRef> = match SourceLocation::parse(source)? {
            SourceLocation::Object(object) => objects
                .contains_key(&object)
                .then_some(object)
                .into_iter()
                .collect(),
            SourceLocation::Prefix { container, prefix } => objects
                .keys()
                .filter(|o| o.container == container)
                .filter(|o| {
                    o.key
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| !rest.contains('/'))
                })
                .filter(|o| is_audio_key(&o.key))
                .cloned()
                .collect(),
        };
        if found.is_empty() {
            return Err(StitchError::NotFound(format!(
                "no .mp3 or .wav files under '{source}'"
            )));
        }
        Ok(found)
    }

    async fn fetch(&self, object: &ObjectRef) -> Result<AudioClip, StitchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        let bytes = self
            .objects
            .lock()
            .unwrap()
            .get(object)
            .cloned()
            .ok_or_else(|| StitchError::Fetch(format!("{object} is missing")))?;
        AudioClip::from_stored(&object.key, bytes)
    }

    fn resolve_output(&self, source: &str, output_path: &str) -> Result<ObjectRef, StitchError> {
        Ok(ObjectRef::new(
            SourceLocation::parse(source)?.container(),
            output_path,
        ))
    }

    async fn write(
        &self,
        target: &ObjectRef,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<(), StitchError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        self.objects
            .lock()
            .unwrap()
            .insert(target.clone(), bytes.to_vec());
        Ok(())
    }

    async fn read(&self, target: &ObjectRef) -> Result<Option<Vec<u8>>, StitchError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.objects.lock().unwrap().get(target).cloned())
    }
}

/// Returns a constant tone of the given length as 16 kHz mono PCM.
pub struct FakeSpeech {
    pub seconds: f32,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeSpeech {
    pub fn new(seconds: f32) -> Self {
        Self {
            seconds,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(1.0)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    fn voice(&self) -> &str {
        "fake:test"
    }

    async fn synthesize(&self, _text: &str) -> Result<AudioClip, StitchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StitchError::Synthesis("voice service unavailable".to_string()));
        }
        let frames = (16_000.0 * self.seconds) as usize;
        let bytes = std::iter::repeat_n(4_000_i16, frames)
            .flat_map(i16::to_le_bytes)
            .collect();
        Ok(AudioClip::new(
            "speech",
            bytes,
            ClipEncoding::Pcm16 {
                sample_rate: 16_000,
                channels: 1,
            },
        ))
    }
}

/// A 16-bit WAV holding a constant `level` for `seconds`.
pub fn tone_wav(sample_rate: u32, channels: u16, seconds: f32, level: i16) -> Vec<u8> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let frames = (sample_rate as f32 * seconds) as usize;
    let mut out = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut out), spec).unwrap();
        for _ in 0..frames * usize::from(channels) {
            writer.write_sample(level).unwrap();
        }
        writer.finalize().unwrap();
    }
    out
}

/// Duration of a WAV payload in seconds.
pub fn wav_seconds(bytes: &[u8]) -> f64 {
    let reader = WavReader::new(Cursor::new(bytes)).unwrap();
    f64::from(reader.duration()) / f64::from(reader.spec().sample_rate)
}

/// Left channel of a 16-bit WAV payload, one value per frame.
pub fn wav_left_channel(bytes: &[u8]) -> Vec<i16> {
    let mut reader = WavReader::new(Cursor::new(bytes)).unwrap();
    let channels = usize::from(reader.spec().channels);
    reader
        .samples::<i16>()
        .map(Result::unwrap)
        .step_by(channels)
        .collect()
}

pub fn test_config() -> AppConfig {
    AppConfig {
        stage_timeout: Duration::from_secs(5),
        ..AppConfig::default()
    }
}

pub fn stitcher(config: AppConfig, store: Arc<MemoryStore>, speech: Arc<FakeSpeech>) -> Stitcher {
    Stitcher::new(config, store, speech, Arc::new(WavEncoder))
}

/// Bucket `clips` with `hello.wav` (0.5 s) and `Shreeshail.wav` (0.75 s) plus a non-audio file.
pub fn greeting_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.put("clips", "hello.wav", tone_wav(22_050, 1, 0.5, 8_000));
    store.put("clips", "Shreeshail.wav", tone_wav(44_100, 2, 0.75, -8_000));
    store.put("clips", "readme.txt", b"not audio".to_vec());
    store
}
