use super::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Speech backends the service can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Self-hosted endpoint speaking the OpenAI speech protocol
    #[serde(rename = "openai-compatible")]
    CompatibleHttp,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "polly")]
    Polly,
    #[serde(rename = "azure")]
    Azure,
    #[serde(rename = "elevenlabs")]
    ElevenLabs,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::CompatibleHttp,
        ProviderKind::OpenAi,
        ProviderKind::Gemini,
        ProviderKind::Polly,
        ProviderKind::Azure,
        ProviderKind::ElevenLabs,
    ];

    /// Stable identity tag used in settings
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::CompatibleHttp => "openai-compatible",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Polly => "polly",
            ProviderKind::Azure => "azure",
            ProviderKind::ElevenLabs => "elevenlabs",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::CompatibleHttp => "OpenAI-compatible",
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Gemini => "Gemini",
            ProviderKind::Polly => "Amazon Polly",
            ProviderKind::Azure => "Azure Speech",
            ProviderKind::ElevenLabs => "ElevenLabs",
        }
    }

    /// Backends that accept non-spoken context alongside the text and are
    /// eligible for provider-level fallback
    pub fn is_context_sensitive(&self) -> bool {
        matches!(self, ProviderKind::Gemini)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| ConfigurationError::UnknownProvider(s.trim().to_string()))
    }
}

/// Amazon Polly synthesis engine tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PollyEngine {
    Standard,
    #[default]
    Neural,
    LongForm,
    Generative,
}

impl PollyEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollyEngine::Standard => "standard",
            PollyEngine::Neural => "neural",
            PollyEngine::LongForm => "long-form",
            PollyEngine::Generative => "generative",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "standard" => Some(PollyEngine::Standard),
            "neural" => Some(PollyEngine::Neural),
            "long-form" | "longform" => Some(PollyEngine::LongForm),
            "generative" => Some(PollyEngine::Generative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub voice: String,
    /// Overrides the public API base, e.g. for a gateway
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibleHttpConfig {
    pub base_url: String,
    /// Waived for loopback hosts
    pub api_key: Option<String>,
    pub model: String,
    pub voice: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub voice: String,
    /// Style prompt prepended to the text, never read aloud
    pub instructions: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollyConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub voice: String,
    pub engine: PollyEngine,
    pub language_code: Option<String>,
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureConfig {
    pub subscription_key: String,
    pub region: String,
    pub voice: String,
    pub language_code: Option<String>,
    /// Value of the X-Microsoft-OutputFormat header
    pub output_format: String,
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    pub model: String,
    pub voice_id: String,
    pub base_url: Option<String>,
}

/// Fully resolved backend configuration. Every required field of the
/// active variant is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    CompatibleHttp(CompatibleHttpConfig),
    OpenAi(OpenAiConfig),
    Gemini(GeminiConfig),
    Polly(PollyConfig),
    Azure(AzureConfig),
    ElevenLabs(ElevenLabsConfig),
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderConfig::CompatibleHttp(_) => ProviderKind::CompatibleHttp,
            ProviderConfig::OpenAi(_) => ProviderKind::OpenAi,
            ProviderConfig::Gemini(_) => ProviderKind::Gemini,
            ProviderConfig::Polly(_) => ProviderKind::Polly,
            ProviderConfig::Azure(_) => ProviderKind::Azure,
            ProviderConfig::ElevenLabs(_) => ProviderKind::ElevenLabs,
        }
    }

    pub fn display_name(&self) -> &'static str {
        self.kind().display_name()
    }

    /// Model identifier. Polly reports its engine tier and Azure its output
    /// format, the closest thing either has to a model.
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::CompatibleHttp(c) => &c.model,
            ProviderConfig::OpenAi(c) => &c.model,
            ProviderConfig::Gemini(c) => &c.model,
            ProviderConfig::Polly(c) => c.engine.as_str(),
            ProviderConfig::Azure(c) => &c.output_format,
            ProviderConfig::ElevenLabs(c) => &c.model,
        }
    }

    pub fn voice(&self) -> &str {
        match self {
            ProviderConfig::CompatibleHttp(c) => &c.voice,
            ProviderConfig::OpenAi(c) => &c.voice,
            ProviderConfig::Gemini(c) => &c.voice,
            ProviderConfig::Polly(c) => &c.voice,
            ProviderConfig::Azure(c) => &c.voice,
            ProviderConfig::ElevenLabs(c) => &c.voice_id,
        }
    }

    pub fn instructions(&self) -> Option<&str> {
        match self {
            ProviderConfig::Gemini(c) => c.instructions.as_deref(),
            _ => None,
        }
    }
}
