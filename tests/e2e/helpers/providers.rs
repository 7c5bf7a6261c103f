use super::audio::pcm16_tone;
use async_trait::async_trait;
use narrate::domain::tts::{
    ConfigurationError, ProviderConfig, ProviderKind, SynthesisError, SynthesisRequest,
    SynthesisResult,
};
use narrate::infrastructure::audio::AudioFormat;
use narrate::infrastructure::repositories::{TtsRepository, TtsRepositoryFactory};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One request as the provider saw it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub text: String,
    pub instructions: Option<String>,
    pub context: Option<String>,
}

/// Provider that replays queued outcomes and records every call.
/// Once the queue is empty every call succeeds with a short PCM tone.
pub struct ScriptedRepository {
    provider: ProviderKind,
    max_input_chars: Option<usize>,
    context_sensitive: bool,
    outcomes: Mutex<VecDeque<Result<(), SynthesisError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRepository {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            max_input_chars: None,
            context_sensitive: provider.is_context_sensitive(),
            outcomes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_max_input_chars(mut self, limit: usize) -> Self {
        self.max_input_chars = Some(limit);
        self
    }

    pub fn failing_with(self, errors: Vec<SynthesisError>) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .extend(errors.into_iter().map(Err));
        self
    }

    /// Let the first `count` calls succeed before the queued failures
    pub fn succeeding_first(self, count: usize) -> Self {
        {
            let mut outcomes = self.outcomes.lock().unwrap();
            for _ in 0..count {
                outcomes.push_front(Ok(()));
            }
        }
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TtsRepository for ScriptedRepository {
    fn provider(&self) -> ProviderKind {
        self.provider
    }

    fn max_input_chars(&self) -> Option<usize> {
        self.max_input_chars
    }

    fn is_context_sensitive(&self) -> bool {
        self.context_sensitive
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest<'_>,
    ) -> Result<SynthesisResult, SynthesisError> {
        self.calls.lock().unwrap().push(RecordedCall {
            text: request.text.to_string(),
            instructions: request.instructions.map(str::to_string),
            context: request.context.map(str::to_string),
        });

        if let Some(outcome) = self.outcomes.lock().unwrap().pop_front() {
            outcome?;
        }

        Ok(SynthesisResult::new(
            pcm16_tone(2_400),
            AudioFormat::Pcm16 {
                sample_rate: 24_000,
            },
            self.provider,
            "scripted-model",
            "scripted-voice",
        ))
    }
}

/// Hands out pre-built scripted providers and counts how often it was asked
#[derive(Default)]
pub struct ScriptedFactory {
    repositories: HashMap<ProviderKind, Arc<ScriptedRepository>>,
    created: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, repository: ScriptedRepository) -> Self {
        self.repositories
            .insert(repository.provider, Arc::new(repository));
        self
    }

    pub fn repository(&self, kind: ProviderKind) -> Arc<ScriptedRepository> {
        self.repositories
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| panic!("No scripted repository for {}", kind))
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TtsRepositoryFactory for ScriptedFactory {
    async fn create(
        &self,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn TtsRepository>, ConfigurationError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let repository = self
            .repositories
            .get(&config.kind())
            .cloned()
            .unwrap_or_else(|| Arc::new(ScriptedRepository::new(config.kind())));
        Ok(repository)
    }
}
