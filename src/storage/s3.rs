use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, info};

use super::{ClipStore, ObjectRef, SourceLocation};
use crate::audio::{AudioClip, is_audio_key};
use crate::errors::StitchError;

/// Clips and artifacts in S3.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: S3Client,
    output_bucket: Option<String>,
}

impl S3Store {
    #[must_use]
    pub fn new(client: S3Client, output_bucket: Option<String>) -> Self {
        Self {
            client,
            output_bucket,
        }
    }

    #[must_use]
    pub fn from_conf(shared_config: &aws_config::SdkConfig, output_bucket: Option<String>) -> Self {
        Self::new(S3Client::new(shared_config), output_bucket)
    }

    async fn list_prefix(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectRef>, StitchError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .delimiter("/")
            .into_paginator()
            .send();

        let mut objects = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_bucket()) {
                    StitchError::NotFound(format!("bucket '{bucket}' does not exist"))
                } else {
                    StitchError::Fetch(format!(
                        "Failed to list s3://{bucket}/{prefix}: {}",
                        DisplayErrorContext(&e)
                    ))
                }
            })?;

            objects.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .filter(|key| *key != prefix && is_audio_key(key))
                    .map(|key| ObjectRef::new(bucket, key)),
            );
        }

        objects.sort();
        debug!(bucket, prefix, count = objects.len(), "listed clips");
        Ok(objects)
    }

    async fn head(&self, object: &ObjectRef) -> Result<(), StitchError> {
        self.client
            .head_object()
            .bucket(&object.container)
            .key(&object.key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    StitchError::NotFound(format!("'{object}' does not exist"))
                } else {
                    StitchError::Fetch(format!(
                        "Failed to look up {object}: {}",
                        DisplayErrorContext(&e)
                    ))
                }
            })?;
        Ok(())
    }
}

#[async_trait]
impl ClipStore for S3Store {
    #[tracing::instrument(skip(self))]
    async fn list_or_resolve(&self, source: &str) -> Result<Vec<ObjectRef>, StitchError> {
        let objects = match SourceLocation::parse(source)? {
            SourceLocation::Object(object) => {
                self.head(&object).await?;
                vec![object]
            }
            SourceLocation::Prefix { container, prefix } => {
                self.list_prefix(&container, &prefix).await?
            }
        };

        if objects.is_empty() {
            return Err(StitchError::NotFound(format!(
                "no .mp3 or .wav files under '{source}'"
            )));
        }
        Ok(objects)
    }

    async fn fetch(&self, object: &ObjectRef) -> Result<AudioClip, StitchError> {
        let bytes = self.read(object).await?.ok_or_else(|| {
            StitchError::Fetch(format!("{object} disappeared before it could be read"))
        })?;
        AudioClip::from_stored(&object.key, bytes)
    }

    fn resolve_output(&self, source: &str, output_path: &str) -> Result<ObjectRef, StitchError> {
        let bucket = match &self.output_bucket {
            Some(bucket) => bucket.clone(),
            None => SourceLocation::parse(source)?.container().to_string(),
        };
        Ok(ObjectRef::new(bucket, output_path))
    }

    async fn write(
        &self,
        target: &ObjectRef,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), StitchError> {
        self.client
            .put_object()
            .bucket(&target.container)
            .key(&target.key)
            .content_type(content_type)
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(|e| {
                StitchError::Write(format!(
                    "Failed to upload {target}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        info!(target = %target, size_bytes = bytes.len(), "uploaded object");
        Ok(())
    }

    async fn read(&self, target: &ObjectRef) -> Result<Option<Vec<u8>>, StitchError> {
        let response = match self
            .client
            .get_object()
            .bucket(&target.container)
            .key(&target.key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                return Ok(None);
            }
            Err(e) => {
                return Err(StitchError::Fetch(format!(
                    "Failed to download {target}: {}",
                    DisplayErrorContext(&e)
                )));
            }
        };

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| StitchError::Fetch(format!("Failed to read body of {target}: {e}")))?;
        Ok(Some(body.into_bytes().to_vec()))
    }
}
