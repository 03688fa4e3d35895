use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::cache::ResultCache;
use super::guard::JobScope;
use super::response;
use crate::audio::{AssemblyPlan, AudioClip, AudioEncoder, assemble, encoder_for};
use crate::core::config::AppConfig;
use crate::core::models::{JobRequest, JobResult};
use crate::errors::{Stage, StageFailure, StitchError};
use crate::speech::{PollySynthesizer, SpeechSynthesizer};
use crate::storage::{ClipStore, ObjectRef, S3Store};

/// Clip downloads in flight per request.
const FETCH_CONCURRENCY: usize = 4;

fn at(stage: Stage) -> impl Fn(StitchError) -> StageFailure {
    move |source| StageFailure::new(stage, source)
}

/// Runs one Job Request end to end. Holds only immutable configuration and
/// thread-safe adapters, so one instance serves every request of the process.
pub struct Stitcher {
    config: AppConfig,
    store: Arc<dyn ClipStore>,
    speech: Arc<dyn SpeechSynthesizer>,
    encoder: Arc<dyn AudioEncoder>,
    cache: Option<ResultCache>,
}

impl Stitcher {
    #[must_use]
    pub fn new(
        config: AppConfig,
        store: Arc<dyn ClipStore>,
        speech: Arc<dyn SpeechSynthesizer>,
        encoder: Arc<dyn AudioEncoder>,
    ) -> Self {
        let cache = ResultCache::from_config(&config);
        Self {
            config,
            store,
            speech,
            encoder,
            cache,
        }
    }

    /// S3 storage, Polly speech and the configured encoder.
    #[must_use]
    pub fn with_aws(config: AppConfig, shared_config: &aws_config::SdkConfig) -> Self {
        let store = Arc::new(S3Store::from_conf(
            shared_config,
            config.output_bucket.clone(),
        ));
        let speech = Arc::new(PollySynthesizer::from_conf(shared_config, &config));
        let encoder = encoder_for(&config);
        Self::new(config, store, speech, encoder)
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// A fresh budget for one request, with no deadline.
    #[must_use]
    pub fn scope(&self) -> JobScope {
        JobScope::new(self.config.stage_timeout)
    }

    /// Never fails: every error becomes a `JobResult` with `success == false`.
    pub async fn handle(&self, request: &JobRequest, scope: &JobScope) -> JobResult {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "stitch",
            %request_id,
            logger = %self.config.logger_name,
            output = %request.output_path
        );

        async {
            let started = Instant::now();
            match self.run(request, scope).await {
                Ok(result) => {
                    info!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        size_bytes = result.audio_size_bytes,
                        "request completed"
                    );
                    result
                }
                Err(failure) => {
                    error!(
                        stage = %failure.stage,
                        kind = failure.source.kind(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "{}",
                        failure
                    );
                    response::failure(&failure)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: &JobRequest, scope: &JobScope) -> Result<JobResult, StageFailure> {
        request
            .validate(self.config.max_message_chars)
            .map_err(at(Stage::Validation))?;
        let target = self
            .store
            .resolve_output(&request.audio_source, &request.output_path)
            .map_err(at(Stage::Validation))?;

        let clips = self
            .fetch_clips(&request.audio_source, &target, scope)
            .await
            .map_err(at(Stage::InputFetch))?;

        let format = self.encoder.format();
        let cache_entry = self.cache.as_ref().map(|cache| {
            let key = cache.key(&request.message, self.speech.voice(), format, &clips);
            cache.target(&target, &key, format)
        });

        if let Some(entry) = &cache_entry {
            if let Some(bytes) = self.cache_lookup(entry, scope).await {
                info!(cache = %entry, "cache hit, skipping synthesis");
                self.write_output(&target, &bytes, scope).await?;
                return Ok(response::success(
                    &request.output_path,
                    &bytes,
                    true,
                    self.config.inline_audio_limit,
                ));
            }
        }

        let speech = scope
            .bounded("synthesize", self.speech.synthesize(&request.message))
            .await
            .map_err(at(Stage::Synthesis))?;

        let plan = AssemblyPlan::new(speech, clips);
        debug!(order = ?plan.keys(), "assembly plan");
        let audio = scope
            .bounded("assemble", assemble(plan, self.encoder.as_ref()))
            .await
            .map_err(at(Stage::Assembly))?;

        self.write_output(&target, &audio.bytes, scope).await?;

        if let Some(entry) = &cache_entry {
            self.cache_store(entry, &audio.bytes, &audio.content_type, scope)
                .await;
        }

        Ok(response::success(
            &request.output_path,
            &audio.bytes,
            false,
            self.config.inline_audio_limit,
        ))
    }

    /// Lists the source and downloads every clip, keeping listing order.
    ///
    /// Artifacts this service wrote itself (the output target and cache entries) are
    /// never inputs, so repeating a request yields the same plan.
    async fn fetch_clips(
        &self,
        source: &str,
        target: &ObjectRef,
        scope: &JobScope,
    ) -> Result<Vec<AudioClip>, StitchError> {
        let listed = scope
            .bounded("list", self.store.list_or_resolve(source))
            .await?;
        let listed_count = listed.len();
        let objects: Vec<ObjectRef> = listed
            .into_iter()
            .filter(|object| !self.is_own_artifact(object, target))
            .collect();
        debug!(
            count = objects.len(),
            skipped = listed_count - objects.len(),
            "resolved input clips"
        );

        if objects.is_empty() {
            return Err(StitchError::NotFound(format!(
                "'{source}' holds only outputs of earlier requests"
            )));
        }

        stream::iter(&objects)
            .map(|object| scope.bounded("fetch", self.store.fetch(object)))
            .buffered(FETCH_CONCURRENCY)
            .try_collect()
            .await
    }

    fn is_own_artifact(&self, object: &ObjectRef, target: &ObjectRef) -> bool {
        if object == target {
            return true;
        }
        object.container == target.container
            && self
                .cache
                .as_ref()
                .is_some_and(|cache| cache.holds(&object.key))
    }

    async fn write_output(
        &self,
        target: &ObjectRef,
        bytes: &[u8],
        scope: &JobScope,
    ) -> Result<(), StageFailure> {
        let content_type = self.encoder.format().content_type();
        scope
            .committed("write", self.store.write(target, bytes, &content_type))
            .await
            .map_err(at(Stage::Write))
    }

    async fn cache_lookup(&self, entry: &ObjectRef, scope: &JobScope) -> Option<Vec<u8>> {
        match scope.bounded("cache read", self.store.read(entry)).await {
            Ok(Some(bytes)) if !bytes.is_empty() => Some(bytes),
            Ok(_) => None,
            Err(e) => {
                warn!(cache = %entry, "cache lookup failed: {}", e);
                None
            }
        }
    }

    async fn cache_store(
        &self,
        entry: &ObjectRef,
        bytes: &[u8],
        content_type: &str,
        scope: &JobScope,
    ) {
        if let Err(e) = scope
            .bounded("cache write", self.store.write(entry, bytes, content_type))
            .await
        {
            warn!(cache = %entry, "could not store cached result: {}", e);
        }
    }
}
