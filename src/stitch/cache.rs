use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::audio::{AudioClip, OutputFormat};
use crate::core::config::AppConfig;
use crate::storage::ObjectRef;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+").unwrap_or_else(|_| Regex::new(r"$^").expect("fallback regex compiles"))
});

/// Lowercases, keeps only `[a-z0-9 ]` and collapses whitespace.
#[must_use]
pub fn normalize_message(message: &str) -> String {
    let kept: String = message
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect();
    WHITESPACE.replace_all(kept.trim(), " ").into_owned()
}

/// Content-addressed store of finished artifacts, kept next to the outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultCache {
    prefix: String,
}

impl ResultCache {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// `None` unless `CACHE_PREFIX` is configured.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        config.cache_prefix.as_deref().map(Self::new)
    }

    #[must_use]
    pub fn key(
        &self,
        message: &str,
        voice: &str,
        format: OutputFormat,
        clips: &[AudioClip],
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(normalize_message(message).as_bytes());
        hasher.update([0u8]);
        hasher.update(voice.as_bytes());
        hasher.update([0u8]);
        hasher.update(format.extension().as_bytes());

        let mut sorted: Vec<&AudioClip> = clips.iter().collect();
        sorted.sort_by(|a, b| a.key.cmp(&b.key));
        for clip in sorted {
            hasher.update([0u8]);
            hasher.update(clip.key.as_bytes());
            hasher.update([0u8]);
            hasher.update(Sha256::digest(&clip.bytes));
        }

        hex::encode(hasher.finalize())
    }

    /// True for keys under the cache prefix.
    #[must_use]
    pub fn holds(&self, key: &str) -> bool {
        !self.prefix.is_empty() && key.starts_with(&self.prefix)
    }

    /// Where the artifact for `key` lives, in the same container as `output`.
    #[must_use]
    pub fn target(&self, output: &ObjectRef, key: &str, format: OutputFormat) -> ObjectRef {
        output.sibling(format!("{}{key}.{}", self.prefix, format.extension()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ClipEncoding;

    fn clip(key: &str, bytes: &[u8]) -> AudioClip {
        AudioClip::new(key, bytes.to_vec(), ClipEncoding::Wav)
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_message("  Hello,   Shreeshail!\n"), "hello shreeshail");
        assert_eq!(normalize_message("Tab\tand  CAPS 42"), "tab and caps 42");
        assert_eq!(normalize_message("!!!"), "");
    }

    #[test]
    fn equivalent_messages_share_a_key() {
        let cache = ResultCache::new("cache/");
        let clips = [clip("a.wav", b"aaa")];
        let a = cache.key("Hello shreeshail", "polly:Joanna", OutputFormat::Mp3, &clips);
        let b = cache.key("hello,  SHREESHAIL", "polly:Joanna", OutputFormat::Mp3, &clips);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn key_tracks_voice_format_and_clip_content() {
        let cache = ResultCache::new("cache/");
        let clips = [clip("a.wav", b"aaa"), clip("b.wav", b"bbb")];
        let base = cache.key("hi", "v1", OutputFormat::Mp3, &clips);

        assert_ne!(base, cache.key("hi", "v2", OutputFormat::Mp3, &clips));
        assert_ne!(base, cache.key("hi", "v1", OutputFormat::Wav, &clips));
        assert_ne!(
            base,
            cache.key("hi", "v1", OutputFormat::Mp3, &[clip("a.wav", b"aaa"), clip("b.wav", b"bbX")])
        );
        let reversed = [clips[1].clone(), clips[0].clone()];
        assert_eq!(base, cache.key("hi", "v1", OutputFormat::Mp3, &reversed));
    }

    #[test]
    fn target_sits_beside_the_output() {
        let cache = ResultCache::new("cache/");
        let output = ObjectRef::new("bucket", "output/test_1.mp3");
        let target = cache.target(&output, "abc", OutputFormat::Mp3);
        assert_eq!(target, ObjectRef::new("bucket", "cache/abc.mp3"));
    }

    #[test]
    fn recognises_its_own_keys() {
        let cache = ResultCache::new("cache_");
        assert!(cache.holds("cache_abc.mp3"));
        assert!(!cache.holds("hello.wav"));
        assert!(!ResultCache::new("").holds("hello.wav"));
    }

    #[test]
    fn disabled_without_prefix() {
        assert!(ResultCache::from_config(&AppConfig::default()).is_none());
        let config = AppConfig {
            cache_prefix: Some("cache/".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(ResultCache::from_config(&config), Some(ResultCache::new("cache/")));
    }
}
