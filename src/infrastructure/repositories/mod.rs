pub mod azure_tts_repository;
pub mod compatible_tts_repository;
pub mod elevenlabs_tts_repository;
pub mod gemini_tts_repository;
mod http_support;
pub mod openai_tts_repository;
pub mod polly_tts_repository;
pub mod stream;
pub mod tts_repository;

pub use azure_tts_repository::AzureTtsRepository;
pub use compatible_tts_repository::CompatibleTtsRepository;
pub use elevenlabs_tts_repository::ElevenLabsTtsRepository;
pub use gemini_tts_repository::GeminiTtsRepository;
pub use openai_tts_repository::OpenAiTtsRepository;
pub use polly_tts_repository::PollyTtsRepository;
pub use stream::DrainToBuffer;
pub use tts_repository::TtsRepository;

use crate::domain::tts::{ConfigurationError, ProviderConfig};
use async_trait::async_trait;
use std::sync::Arc;

/// Builds the adapter for a resolved config
#[async_trait]
pub trait TtsRepositoryFactory: Send + Sync {
    async fn create(
        &self,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn TtsRepository>, ConfigurationError>;
}

/// One adapter per backend, sharing a single HTTP connection pool
#[derive(Debug, Clone, Default)]
pub struct ProviderRepositoryFactory {
    http: reqwest::Client,
}

impl ProviderRepositoryFactory {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl TtsRepositoryFactory for ProviderRepositoryFactory {
    async fn create(
        &self,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn TtsRepository>, ConfigurationError> {
        let repository: Arc<dyn TtsRepository> = match config {
            ProviderConfig::CompatibleHttp(c) => {
                Arc::new(CompatibleTtsRepository::new(self.http.clone(), c.clone()))
            }
            ProviderConfig::OpenAi(c) => Arc::new(OpenAiTtsRepository::new(c)?),
            ProviderConfig::Gemini(c) => {
                Arc::new(GeminiTtsRepository::new(self.http.clone(), c.clone()))
            }
            ProviderConfig::Polly(c) => Arc::new(PollyTtsRepository::from_config(c.clone()).await),
            ProviderConfig::Azure(c) => {
                Arc::new(AzureTtsRepository::new(self.http.clone(), c.clone()))
            }
            ProviderConfig::ElevenLabs(c) => {
                Arc::new(ElevenLabsTtsRepository::new(self.http.clone(), c.clone()))
            }
        };

        Ok(repository)
    }
}
