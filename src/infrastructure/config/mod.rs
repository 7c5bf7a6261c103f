use crate::domain::tts::{ProviderCatalog, TtsSettings};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_format: LogFormat,
    /// Directory audio files are written to
    pub output_dir: PathBuf,
    pub tts_cache_enabled: bool,
    pub tts: TtsSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        Ok(Self::from_lookup(|key| env::var(key).ok()))
    }

    /// Build the config from any key lookup. Unset keys fall back to the
    /// catalog defaults; credentials stay blank until resolution checks them.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).unwrap_or_default();
        let var_or = |key: &str, current: &mut String| {
            let value = var(key);
            if !value.is_empty() {
                *current = value;
            }
        };

        let mut tts = TtsSettings::seeded(&ProviderCatalog::default());

        var_or("TTS_PROVIDER", &mut tts.provider);
        tts.fallback_provider = var("TTS_FALLBACK_PROVIDER");

        // OpenAI
        tts.openai.api_key = var("OPENAI_API_KEY");
        tts.openai.base_url = var("OPENAI_BASE_URL");
        var_or("OPENAI_TTS_MODEL", &mut tts.openai.model);
        var_or("OPENAI_TTS_VOICE", &mut tts.openai.voice);

        // OpenAI-compatible servers
        tts.compatible.base_url = var("COMPATIBLE_TTS_BASE_URL");
        tts.compatible.api_key = var("COMPATIBLE_TTS_API_KEY");
        var_or("COMPATIBLE_TTS_MODEL", &mut tts.compatible.model);
        var_or("COMPATIBLE_TTS_VOICE", &mut tts.compatible.voice);

        // Gemini
        tts.gemini.api_key = var("GEMINI_API_KEY");
        tts.gemini.base_url = var("GEMINI_BASE_URL");
        tts.gemini.instructions = var("GEMINI_TTS_INSTRUCTIONS");
        var_or("GEMINI_TTS_MODEL", &mut tts.gemini.model);
        var_or("GEMINI_TTS_VOICE", &mut tts.gemini.voice);

        // Amazon Polly
        tts.polly.access_key_id = var("AWS_ACCESS_KEY_ID");
        tts.polly.secret_access_key = var("AWS_SECRET_ACCESS_KEY");
        tts.polly.region = var("AWS_REGION");
        tts.polly.language_code = var("POLLY_LANGUAGE_CODE");
        tts.polly.endpoint_url = var("POLLY_ENDPOINT_URL");
        var_or("POLLY_ENGINE", &mut tts.polly.engine);
        var_or("POLLY_VOICE", &mut tts.polly.voice);

        // Azure Speech
        tts.azure.subscription_key = var("AZURE_SPEECH_KEY");
        tts.azure.region = var("AZURE_SPEECH_REGION");
        tts.azure.language_code = var("AZURE_SPEECH_LANGUAGE");
        tts.azure.endpoint_url = var("AZURE_SPEECH_ENDPOINT");
        var_or("AZURE_SPEECH_OUTPUT_FORMAT", &mut tts.azure.output_format);
        var_or("AZURE_SPEECH_VOICE", &mut tts.azure.voice);

        // ElevenLabs
        tts.elevenlabs.api_key = var("ELEVENLABS_API_KEY");
        tts.elevenlabs.base_url = var("ELEVENLABS_BASE_URL");
        var_or("ELEVENLABS_MODEL", &mut tts.elevenlabs.model);
        var_or("ELEVENLABS_VOICE_ID", &mut tts.elevenlabs.voice_id);

        Config {
            log_format: match var("LOG_FORMAT").to_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            output_dir: match var("NARRATE_OUTPUT_DIR") {
                dir if dir.is_empty() => PathBuf::from("audio"),
                dir => PathBuf::from(dir),
            },
            tts_cache_enabled: var("TTS_CACHE_ENABLED").to_lowercase() == "true",
            tts,
        }
    }
}
