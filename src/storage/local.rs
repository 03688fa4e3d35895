use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{ClipStore, ObjectRef};
use crate::audio::{AudioClip, is_audio_key};
use crate::errors::StitchError;

/// Clips in a local directory; artifacts under `output_root`.
///
/// `ObjectRef::container` holds a directory path and `key` a path relative to it.
#[derive(Debug, Clone)]
pub struct LocalStore {
    output_root: PathBuf,
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new(".")
    }
}

impl LocalStore {
    #[must_use]
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    #[must_use]
    pub fn path_of(object: &ObjectRef) -> PathBuf {
        Path::new(&object.container).join(&object.key)
    }

    async fn list_dir(dir: &Path) -> Result<Vec<ObjectRef>, StitchError> {
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
            StitchError::Fetch(format!("Failed to read directory {}: {e}", dir.display()))
        })?;

        let container = dir.to_string_lossy().into_owned();
        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            StitchError::Fetch(format!("Failed to read directory {}: {e}", dir.display()))
        })? {
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_file && is_audio_key(&name) {
                objects.push(ObjectRef::new(container.clone(), name));
            }
        }

        objects.sort();
        debug!(dir = %dir.display(), count = objects.len(), "listed clips");
        Ok(objects)
    }
}

#[async_trait]
impl ClipStore for LocalStore {
    async fn list_or_resolve(&self, source: &str) -> Result<Vec<ObjectRef>, StitchError> {
        let path = Path::new(source.trim());
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StitchError::NotFound(format!(
                    "'{}' does not exist",
                    path.display()
                )));
            }
            Err(e) => {
                return Err(StitchError::Fetch(format!(
                    "Failed to inspect {}: {e}",
                    path.display()
                )));
            }
        };

        let objects = if metadata.is_dir() {
            Self::list_dir(path).await?
        } else {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let parent = path
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            if is_audio_key(&name) {
                vec![ObjectRef::new(parent, name)]
            } else {
                Vec::new()
            }
        };

        if objects.is_empty() {
            return Err(StitchError::NotFound(format!(
                "no .mp3 or .wav files in '{}'",
                path.display()
            )));
        }
        Ok(objects)
    }

    async fn fetch(&self, object: &ObjectRef) -> Result<AudioClip, StitchError> {
        let path = Self::path_of(object);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| StitchError::Fetch(format!("Failed to read {}: {e}", path.display())))?;
        AudioClip::from_stored(&object.key, bytes)
    }

    fn resolve_output(&self, _source: &str, output_path: &str) -> Result<ObjectRef, StitchError> {
        Ok(ObjectRef::new(
            self.output_root.to_string_lossy().into_owned(),
            output_path,
        ))
    }

    async fn write(
        &self,
        target: &ObjectRef,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<(), StitchError> {
        let path = Self::path_of(target);
        let write_err =
            |e: std::io::Error| StitchError::Write(format!("Failed to write {}: {e}", path.display()));

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(dir).await.map_err(write_err)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staging = dir.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&staging, bytes).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(write_err(e));
        }
        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&staging).await {
                warn!(staging = %staging.display(), "could not remove staging file: {}", cleanup);
            }
            return Err(write_err(e));
        }

        info!(target = %path.display(), size_bytes = bytes.len(), "wrote output file");
        Ok(())
    }

    async fn read(&self, target: &ObjectRef) -> Result<Option<Vec<u8>>, StitchError> {
        let path = Self::path_of(target);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StitchError::Fetch(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }
}
