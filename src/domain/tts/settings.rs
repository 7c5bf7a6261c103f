use super::provider::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default model and voice of one backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDefaults {
    pub model: String,
    pub voice: String,
}

impl ProviderDefaults {
    fn new(model: &str, voice: &str) -> Self {
        Self {
            model: model.to_string(),
            voice: voice.to_string(),
        }
    }
}

/// Known-good defaults per backend plus the closed OpenAI voice list
#[derive(Debug, Clone)]
pub struct ProviderCatalog {
    defaults: HashMap<ProviderKind, ProviderDefaults>,
    openai_voices: Vec<String>,
}

impl ProviderCatalog {
    pub fn new(
        defaults: HashMap<ProviderKind, ProviderDefaults>,
        openai_voices: Vec<String>,
    ) -> Self {
        Self {
            defaults,
            openai_voices,
        }
    }

    pub fn defaults(&self, kind: ProviderKind) -> Option<&ProviderDefaults> {
        self.defaults.get(&kind)
    }

    pub fn openai_voices(&self) -> &[String] {
        &self.openai_voices
    }

    pub fn is_openai_voice(&self, voice: &str) -> bool {
        self.openai_voices
            .iter()
            .any(|known| known.eq_ignore_ascii_case(voice.trim()))
    }
}

impl Default for ProviderCatalog {
    fn default() -> Self {
        let defaults = HashMap::from([
            (ProviderKind::CompatibleHttp, ProviderDefaults::new("tts-1", "alloy")),
            (ProviderKind::OpenAi, ProviderDefaults::new("tts-1", "alloy")),
            (
                ProviderKind::Gemini,
                ProviderDefaults::new("gemini-2.5-flash-preview-tts", "Kore"),
            ),
            (ProviderKind::Polly, ProviderDefaults::new("neural", "Joanna")),
            (
                ProviderKind::Azure,
                ProviderDefaults::new("audio-24khz-96kbitrate-mono-mp3", "en-US-JennyNeural"),
            ),
            (
                ProviderKind::ElevenLabs,
                ProviderDefaults::new("eleven_multilingual_v2", "21m00Tcm4TlvDq8ikWAM"),
            ),
        ]);

        let openai_voices = ["alloy", "echo", "fable", "onyx", "nova", "shimmer"]
            .into_iter()
            .map(String::from)
            .collect();

        Self::new(defaults, openai_voices)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub model: String,
    pub voice: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatibleSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub voice: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub voice: String,
    pub instructions: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollySettings {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub voice: String,
    pub engine: String,
    pub language_code: String,
    pub endpoint_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureSettings {
    pub subscription_key: String,
    pub region: String,
    pub voice: String,
    pub language_code: String,
    pub output_format: String,
    pub endpoint_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevenLabsSettings {
    pub api_key: String,
    pub model: String,
    pub voice_id: String,
    pub base_url: String,
}

/// Raw, user-editable settings. Blank strings mean "not set"; nothing here
/// is trusted until it has been resolved into a `ProviderConfig`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    /// Identity tag of the active backend
    pub provider: String,
    /// Identity tag of the backend used when a context-sensitive backend
    /// fails transiently. Blank means OpenAI.
    pub fallback_provider: String,
    pub openai: OpenAiSettings,
    pub compatible: CompatibleSettings,
    pub gemini: GeminiSettings,
    pub polly: PollySettings,
    pub azure: AzureSettings,
    pub elevenlabs: ElevenLabsSettings,
}

impl TtsSettings {
    /// Settings with every model and voice pre-filled from the catalog
    pub fn seeded(catalog: &ProviderCatalog) -> Self {
        let mut settings = Self {
            provider: ProviderKind::OpenAi.as_str().to_string(),
            ..Self::default()
        };

        for kind in ProviderKind::ALL {
            let Some(defaults) = catalog.defaults(kind) else {
                continue;
            };
            let (model, voice) = (defaults.model.clone(), defaults.voice.clone());
            match kind {
                ProviderKind::CompatibleHttp => {
                    settings.compatible.model = model;
                    settings.compatible.voice = voice;
                }
                ProviderKind::OpenAi => {
                    settings.openai.model = model;
                    settings.openai.voice = voice;
                }
                ProviderKind::Gemini => {
                    settings.gemini.model = model;
                    settings.gemini.voice = voice;
                }
                ProviderKind::Polly => {
                    settings.polly.engine = model;
                    settings.polly.voice = voice;
                }
                ProviderKind::Azure => {
                    settings.azure.output_format = model;
                    settings.azure.voice = voice;
                }
                ProviderKind::ElevenLabs => {
                    settings.elevenlabs.model = model;
                    settings.elevenlabs.voice_id = voice;
                }
            }
        }

        settings
    }
}
