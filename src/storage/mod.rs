//! Where clips come from and where finished artifacts go.

pub mod local;
pub mod s3;

use std::fmt;

use async_trait::async_trait;

use crate::audio::{AudioClip, is_audio_key};
use crate::errors::StitchError;

pub use local::LocalStore;
pub use s3::S3Store;

/// One object in a store: a bucket (or directory) plus a key inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    pub container: String,
    pub key: String,
}

impl ObjectRef {
    #[must_use]
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
        }
    }

    /// Same container, different key.
    #[must_use]
    pub fn sibling(&self, key: impl Into<String>) -> Self {
        Self::new(self.container.clone(), key)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.key)
    }
}

#[async_trait]
pub trait ClipStore: Send + Sync {
    /// Resolves an `audios` value into the clips it names, sorted by key.
    ///
    /// Listing is non-recursive and keeps only supported audio extensions.
    async fn list_or_resolve(&self, source: &str) -> Result<Vec<ObjectRef>, StitchError>;

    async fn fetch(&self, object: &ObjectRef) -> Result<AudioClip, StitchError>;

    /// Where the artifact for `output_path` is written.
    fn resolve_output(&self, source: &str, output_path: &str) -> Result<ObjectRef, StitchError>;

    /// Replaces `target` in one step; readers never see a partial object.
    async fn write(
        &self,
        target: &ObjectRef,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), StitchError>;

    /// `Ok(None)` when the object does not exist.
    async fn read(&self, target: &ObjectRef) -> Result<Option<Vec<u8>>, StitchError>;
}

/// A parsed `audios` value for bucket-style stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// Every clip directly under `prefix` (empty for the bucket root).
    Prefix { container: String, prefix: String },
    /// A single clip.
    Object(ObjectRef),
}

impl SourceLocation {
    /// Accepts `bucket`, `bucket/prefix`, `s3://bucket/prefix` and `bucket/path/clip.wav`.
    ///
    /// # Errors
    ///
    /// Returns `StitchError::Validation` if no container can be read from `source`.
    pub fn parse(source: &str) -> Result<Self, StitchError> {
        let trimmed = source.trim();
        let without_scheme = trimmed.strip_prefix("s3://").unwrap_or(trimmed);
        let (container, rest) = without_scheme
            .split_once('/')
            .unwrap_or((without_scheme, ""));

        if container.is_empty() {
            return Err(StitchError::Validation(format!(
                "audios '{source}' does not name a bucket"
            )));
        }

        let rest = rest.trim_start_matches('/');
        if is_audio_key(rest) {
            return Ok(Self::Object(ObjectRef::new(container, rest)));
        }

        let prefix = match rest.trim_end_matches('/') {
            "" => String::new(),
            p => format!("{p}/"),
        };
        Ok(Self::Prefix {
            container: container.to_string(),
            prefix,
        })
    }

    #[must_use]
    pub fn container(&self) -> &str {
        match self {
            Self::Prefix { container, .. } => container,
            Self::Object(object) => &object.container,
        }
    }
}
