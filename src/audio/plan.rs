use super::AudioClip;

/// Ordered clips for one request: synthesized speech first, then stored clips by key.
#[derive(Debug, Clone, Default)]
pub struct AssemblyPlan {
    clips: Vec<AudioClip>,
}

impl AssemblyPlan {
    #[must_use]
    pub fn new(speech: AudioClip, mut stored: Vec<AudioClip>) -> Self {
        stored.sort_by(|a, b| a.key.cmp(&b.key));
        let mut clips = Vec::with_capacity(stored.len() + 1);
        clips.push(speech);
        clips.extend(stored);
        Self { clips }
    }

    /// Uses `clips` in the given order.
    #[must_use]
    pub fn from_ordered(clips: Vec<AudioClip>) -> Self {
        Self { clips }
    }

    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.clips.iter().map(|c| c.key.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    #[must_use]
    pub fn clips(&self) -> &[AudioClip] {
        &self.clips
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ClipEncoding;

    fn clip(key: &str) -> AudioClip {
        AudioClip::new(key, Vec::new(), ClipEncoding::Wav)
    }

    #[test]
    fn speech_leads_and_stored_clips_sort_by_key() {
        let plan = AssemblyPlan::new(
            clip("speech"),
            vec![clip("hello.wav"), clip("Shreeshail.wav"), clip("abc.mp3")],
        );
        assert_eq!(
            plan.keys(),
            vec!["speech", "Shreeshail.wav", "abc.mp3", "hello.wav"]
        );
    }

    #[test]
    fn ordering_ignores_fetch_order() {
        let a = AssemblyPlan::new(clip("s"), vec![clip("b.wav"), clip("a.wav")]);
        let b = AssemblyPlan::new(clip("s"), vec![clip("a.wav"), clip("b.wav")]);
        assert_eq!(a.keys(), b.keys());
    }
}
