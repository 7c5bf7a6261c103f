use super::error::{ConfigurationError, SynthesisError, TtsError};
use super::provider::{ProviderConfig, ProviderKind};
use super::resolver::resolve_provider;
use super::result::{SynthesisRequest, SynthesisResult};
use super::segmentation::{segment, ContextWindow};
use super::settings::{ProviderCatalog, TtsSettings};
use crate::infrastructure::audio::{AudioPipeline, PcmBuffer};
use crate::infrastructure::repositories::{TtsRepository, TtsRepositoryFactory};
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Backend used when a context-sensitive backend fails and no other is named
const DEFAULT_FALLBACK_PROVIDER: ProviderKind = ProviderKind::OpenAi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SynthesisState {
    Idle,
    Resolving,
    Synthesizing,
    ChunkedSynthesizing,
    Normalizing,
    Done,
    Failed,
}

impl SynthesisState {
    fn as_str(&self) -> &'static str {
        match self {
            SynthesisState::Idle => "idle",
            SynthesisState::Resolving => "resolving",
            SynthesisState::Synthesizing => "synthesizing",
            SynthesisState::ChunkedSynthesizing => "chunked_synthesizing",
            SynthesisState::Normalizing => "normalizing",
            SynthesisState::Done => "done",
            SynthesisState::Failed => "failed",
        }
    }
}

fn enter(state: SynthesisState) {
    tracing::debug!(state = state.as_str(), "Synthesis state changed");
}

pub struct TtsService {
    factory: Arc<dyn TtsRepositoryFactory>,
    pipeline: AudioPipeline,
    catalog: ProviderCatalog,
    cache: Option<Cache<String, SynthesisResult>>,
}

impl TtsService {
    pub fn new(
        factory: Arc<dyn TtsRepositoryFactory>,
        catalog: ProviderCatalog,
        cache_enabled: bool,
    ) -> Self {
        let cache = if cache_enabled {
            Some(
                Cache::builder()
                    .max_capacity(100)
                    .time_to_idle(Duration::from_secs(30 * 60)) // 30 minutes, refreshes on access
                    .build(),
            )
        } else {
            None
        };

        Self {
            factory,
            pipeline: AudioPipeline::new(),
            catalog,
            cache,
        }
    }

    pub fn with_pipeline(mut self, pipeline: AudioPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }
}

#[async_trait]
pub trait TtsServiceApi: Send + Sync {
    /// Turn `text` into one audio artifact in the canonical codec
    ///
    /// This operation:
    /// - Resolves the active backend from `settings` (no network on failure)
    /// - Chunks text past the backend's ceiling and joins the audio in order
    /// - Falls back to another backend when a context-sensitive one fails
    ///   transiently or rejects its credential
    /// - Normalizes the audio to the canonical codec
    async fn synthesize(
        &self,
        text: &str,
        settings: &TtsSettings,
    ) -> Result<SynthesisResult, TtsError>;
}

#[async_trait]
impl TtsServiceApi for TtsService {
    async fn synthesize(
        &self,
        text: &str,
        settings: &TtsSettings,
    ) -> Result<SynthesisResult, TtsError> {
        let start_time = Instant::now();
        enter(SynthesisState::Idle);

        let text = text.trim();
        if text.is_empty() {
            enter(SynthesisState::Failed);
            return Err(TtsError::EmptyInput);
        }

        tracing::info!(
            provider = %settings.provider,
            text_length = text.chars().count(),
            "TTS synthesis request"
        );

        let outcome = self.synthesize_text(text, settings).await;

        match &outcome {
            Ok(result) => {
                enter(SynthesisState::Done);
                tracing::info!(
                    provider = %result.provider(),
                    model = result.model(),
                    voice = result.voice(),
                    format = %result.format(),
                    latency_ms = start_time.elapsed().as_millis(),
                    audio_size_bytes = result.len(),
                    "TTS synthesis completed"
                );
            }
            Err(e) => {
                enter(SynthesisState::Failed);
                tracing::error!(error = %e, "TTS synthesis failed");
            }
        }

        outcome
    }
}

impl TtsService {
    async fn synthesize_text(
        &self,
        text: &str,
        settings: &TtsSettings,
    ) -> Result<SynthesisResult, TtsError> {
        // 1. Resolve the active backend
        enter(SynthesisState::Resolving);
        let kind: ProviderKind = settings.provider.parse()?;
        let config = resolve_provider(settings, kind, &self.catalog)?;

        // 2. Synthesize, falling back when the backend is flaky by nature or
        // rejects its credential
        match self.run(&config, text).await {
            Err(TtsError::Synthesis(primary))
                if primary.warrants_fallback() && config.kind().is_context_sensitive() =>
            {
                self.fall_back(primary, text, settings).await
            }
            outcome => outcome,
        }
    }

    async fn fall_back(
        &self,
        primary: SynthesisError,
        text: &str,
        settings: &TtsSettings,
    ) -> Result<SynthesisResult, TtsError> {
        let tag = settings.fallback_provider.trim();
        let fallback_kind = if tag.is_empty() {
            Ok(DEFAULT_FALLBACK_PROVIDER)
        } else {
            tag.parse::<ProviderKind>()
        };

        let fallback_kind = match fallback_kind {
            Ok(kind) => kind,
            Err(e) => {
                return Err(TtsError::FallbackFailed {
                    primary,
                    fallback_provider: tag.to_string(),
                    fallback: Box::new(e.into()),
                })
            }
        };
        let fallback_provider = fallback_kind.to_string();

        if fallback_kind == primary.provider {
            return Err(TtsError::FallbackFailed {
                fallback_provider,
                fallback: Box::new(
                    ConfigurationError::Invalid {
                        provider: fallback_kind,
                        field: "fallback provider",
                        reason: "must differ from the active provider".to_string(),
                    }
                    .into(),
                ),
                primary,
            });
        }

        tracing::warn!(
            primary_provider = %primary.provider,
            error = %primary,
            fallback_provider = %fallback_kind,
            "Primary TTS provider failed, falling back"
        );

        let outcome = match resolve_provider(settings, fallback_kind, &self.catalog) {
            Ok(config) => self.run(&config, text).await,
            Err(e) => Err(e.into()),
        };

        outcome.map_err(|fallback| TtsError::FallbackFailed {
            primary,
            fallback_provider,
            fallback: Box::new(fallback),
        })
    }

    /// Synthesize `text` end to end with one backend
    async fn run(&self, config: &ProviderConfig, text: &str) -> Result<SynthesisResult, TtsError> {
        let key = cache_key(config, text);
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&key).await {
                tracing::info!(
                    provider = %cached.provider(),
                    cached_audio_size = cached.len(),
                    "TTS cache hit - returning cached audio"
                );
                return Ok(cached);
            }
        }

        let repository = self.factory.create(config).await?;
        let instructions = config.instructions();
        let char_count = text.chars().count();

        let raw = match repository.max_input_chars() {
            Some(limit) if char_count > limit => {
                enter(SynthesisState::ChunkedSynthesizing);
                self.synthesize_chunks(repository.as_ref(), text, limit, instructions)
                    .await?
            }
            _ => {
                enter(SynthesisState::Synthesizing);
                let request = SynthesisRequest::new(text).with_instructions(instructions);
                self.call(repository.as_ref(), request, 1).await?
            }
        };

        enter(SynthesisState::Normalizing);
        let result = self.normalize(raw).await?;

        if let Some(cache) = &self.cache {
            cache.insert(key, result.clone()).await;
            tracing::info!(audio_size = result.len(), "TTS result cached");
        }

        Ok(result)
    }

    /// One backend call. A context-sensitive backend gets exactly one more
    /// try without style instructions after a transient failure.
    async fn call(
        &self,
        repository: &dyn TtsRepository,
        request: SynthesisRequest<'_>,
        chunk_index: usize,
    ) -> Result<SynthesisResult, SynthesisError> {
        match repository.synthesize(&request).await {
            Err(e) if repository.is_context_sensitive() && e.is_retryable() => {
                tracing::warn!(
                    provider = %repository.provider(),
                    chunk_index = chunk_index,
                    error = %e,
                    "Chunk failed, retrying once without style instructions"
                );
                repository.synthesize(&request.without_instructions()).await
            }
            outcome => outcome,
        }
    }

    /// Synthesize chunk by chunk, decode each to PCM and encode the joined
    /// audio once
    async fn synthesize_chunks(
        &self,
        repository: &dyn TtsRepository,
        text: &str,
        limit: usize,
        instructions: Option<&str>,
    ) -> Result<SynthesisResult, TtsError> {
        let chunks = segment(text, limit);
        tracing::info!(
            chunk_count = chunks.len(),
            chunk_limit = limit,
            text_length = text.chars().count(),
            "Text split into chunks"
        );

        let mut window = ContextWindow::default();
        let mut parts = Vec::with_capacity(chunks.len());
        let mut last_result = None;

        for chunk in chunks {
            let chunk = if repository.is_context_sensitive() {
                chunk.with_context(window.as_str())
            } else {
                chunk
            };

            let request = SynthesisRequest::new(&chunk.text)
                .with_instructions(instructions)
                .with_context(chunk.context.as_deref());
            let result = self.call(repository, request, chunk.index).await?;

            tracing::info!(
                chunk_index = chunk.index,
                chunk_size = chunk.char_count(),
                format = %result.format(),
                audio_size_bytes = result.len(),
                "Chunk synthesized"
            );

            parts.push(
                self.pipeline
                    .decode(result.audio().to_vec(), result.format())
                    .await?,
            );
            window.push(&chunk.text);
            last_result = Some(result);
        }

        let Some(template) = last_result else {
            return Err(TtsError::EmptyInput);
        };

        let pcm = PcmBuffer::concat(parts)?;
        tracing::debug!(
            samples = pcm.len(),
            duration_secs = pcm.duration_secs(),
            "Chunk audio joined"
        );
        let encoded = self.pipeline.encode(pcm).await?;

        Ok(template.with_audio(encoded, self.pipeline.output_format()))
    }

    async fn normalize(&self, raw: SynthesisResult) -> Result<SynthesisResult, TtsError> {
        if raw.format() == self.pipeline.output_format() {
            return Ok(raw);
        }

        let (audio, format) = self
            .pipeline
            .normalize(raw.audio().to_vec(), raw.format())
            .await?;
        Ok(raw.with_audio(audio, format))
    }
}

fn cache_key(config: &ProviderConfig, text: &str) -> String {
    format!(
        "{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}",
        config.kind().as_str(),
        config.model(),
        config.voice(),
        config.instructions().unwrap_or_default(),
        text
    )
}
