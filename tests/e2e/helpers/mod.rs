use narrate::domain::tts::{ProviderCatalog, TtsService, TtsSettings};
use std::sync::Arc;

pub mod audio;
pub mod providers;

pub use audio::{mp3_tone, pcm16_tone};
pub use providers::{RecordedCall, ScriptedFactory, ScriptedRepository};

/// Settings with usable credentials for every backend
pub fn settings_for(provider: &str) -> TtsSettings {
    let mut settings = TtsSettings::seeded(&ProviderCatalog::default());
    settings.provider = provider.to_string();

    settings.openai.api_key = "sk-test".to_string();
    settings.compatible.base_url = "http://localhost:8880/v1".to_string();
    settings.gemini.api_key = "gemini-test".to_string();
    settings.polly.access_key_id = "AKIDTEST".to_string();
    settings.polly.secret_access_key = "secret".to_string();
    settings.polly.region = "eu-west-1".to_string();
    settings.azure.subscription_key = "azure-test".to_string();
    settings.azure.region = "westeurope".to_string();
    settings.elevenlabs.api_key = "xi-test".to_string();

    settings
}

pub fn service(factory: &Arc<ScriptedFactory>) -> TtsService {
    TtsService::new(factory.clone(), ProviderCatalog::default(), false)
}

pub fn cached_service(factory: &Arc<ScriptedFactory>) -> TtsService {
    TtsService::new(factory.clone(), ProviderCatalog::default(), true)
}
