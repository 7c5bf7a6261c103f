use super::error::ConfigurationError;
use super::provider::{
    AzureConfig, CompatibleHttpConfig, ElevenLabsConfig, GeminiConfig, OpenAiConfig, PollyConfig,
    PollyEngine, ProviderConfig, ProviderKind,
};
use super::settings::{ProviderCatalog, TtsSettings};
use std::net::IpAddr;

const DEFAULT_AZURE_OUTPUT_FORMAT: &str = "audio-24khz-96kbitrate-mono-mp3";

/// Turn raw settings into the config of one backend.
///
/// Checks run in a fixed order per backend and the first missing field is
/// reported. Nothing here touches the network.
pub fn resolve_provider(
    settings: &TtsSettings,
    kind: ProviderKind,
    catalog: &ProviderCatalog,
) -> Result<ProviderConfig, ConfigurationError> {
    let config = match kind {
        ProviderKind::OpenAi => {
            let s = &settings.openai;
            let api_key = required(kind, "api key", &s.api_key)?;
            let model = required(kind, "model", &s.model)?;
            let voice = required(kind, "voice", &s.voice)?;
            if !catalog.is_openai_voice(&voice) {
                return Err(ConfigurationError::Invalid {
                    provider: kind,
                    field: "voice",
                    reason: format!(
                        "'{}' is not one of {}",
                        voice,
                        catalog.openai_voices().join(", ")
                    ),
                });
            }
            ProviderConfig::OpenAi(OpenAiConfig {
                api_key,
                model,
                voice: voice.to_lowercase(),
                base_url: optional(&s.base_url),
            })
        }
        ProviderKind::CompatibleHttp => {
            let s = &settings.compatible;
            // The base URL goes first: the credential rule depends on its host
            let base_url = required(kind, "base URL", &s.base_url)?;
            let local = is_loopback_url(&base_url).map_err(|reason| ConfigurationError::Invalid {
                provider: kind,
                field: "base URL",
                reason,
            })?;
            let api_key = match optional(&s.api_key) {
                Some(key) => Some(key),
                None if local => None,
                None => return Err(missing(kind, "api key")),
            };
            let model = required(kind, "model", &s.model)?;
            let voice = required(kind, "voice", &s.voice)?;
            ProviderConfig::CompatibleHttp(CompatibleHttpConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key,
                model,
                voice,
            })
        }
        ProviderKind::Gemini => {
            let s = &settings.gemini;
            let api_key = required(kind, "api key", &s.api_key)?;
            let model = required(kind, "model", &s.model)?;
            let voice = required(kind, "voice", &s.voice)?;
            ProviderConfig::Gemini(GeminiConfig {
                api_key,
                model,
                voice,
                instructions: optional(&s.instructions),
                base_url: optional(&s.base_url),
            })
        }
        ProviderKind::Polly => {
            let s = &settings.polly;
            let access_key_id = required(kind, "access key id", &s.access_key_id)?;
            let secret_access_key = required(kind, "secret access key", &s.secret_access_key)?;
            let region = required(kind, "region", &s.region)?;
            let voice = required(kind, "voice", &s.voice)?;
            let engine = match optional(&s.engine) {
                None => PollyEngine::default(),
                Some(value) => {
                    PollyEngine::parse(&value).ok_or_else(|| ConfigurationError::Invalid {
                        provider: kind,
                        field: "engine",
                        reason: format!(
                            "'{}' is not one of standard, neural, long-form, generative",
                            value
                        ),
                    })?
                }
            };
            ProviderConfig::Polly(PollyConfig {
                access_key_id,
                secret_access_key,
                region,
                voice,
                engine,
                language_code: optional(&s.language_code),
                endpoint_url: optional(&s.endpoint_url),
            })
        }
        ProviderKind::Azure => {
            let s = &settings.azure;
            let subscription_key = required(kind, "subscription key", &s.subscription_key)?;
            let region = required(kind, "region", &s.region)?;
            let voice = required(kind, "voice", &s.voice)?;
            let output_format = optional(&s.output_format)
                .unwrap_or_else(|| DEFAULT_AZURE_OUTPUT_FORMAT.to_string());
            if !is_decodable_azure_format(&output_format) {
                return Err(ConfigurationError::Invalid {
                    provider: kind,
                    field: "output format",
                    reason: format!(
                        "'{}' cannot be decoded, use an mp3, riff 16-bit pcm or raw 16-bit pcm format",
                        output_format
                    ),
                });
            }
            ProviderConfig::Azure(AzureConfig {
                subscription_key,
                region,
                voice,
                language_code: optional(&s.language_code),
                output_format,
                endpoint_url: optional(&s.endpoint_url),
            })
        }
        ProviderKind::ElevenLabs => {
            let s = &settings.elevenlabs;
            let api_key = required(kind, "api key", &s.api_key)?;
            let model = required(kind, "model", &s.model)?;
            let voice_id = required(kind, "voice", &s.voice_id)?;
            ProviderConfig::ElevenLabs(ElevenLabsConfig {
                api_key,
                model,
                voice_id,
                base_url: optional(&s.base_url),
            })
        }
    };

    tracing::debug!(
        provider = %config.kind(),
        model = config.model(),
        voice = config.voice(),
        "Provider resolved"
    );

    Ok(config)
}

fn missing(provider: ProviderKind, field: &'static str) -> ConfigurationError {
    ConfigurationError::Missing { provider, field }
}

fn required(
    provider: ProviderKind,
    field: &'static str,
    value: &str,
) -> Result<String, ConfigurationError> {
    optional(value).ok_or_else(|| missing(provider, field))
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Azure output formats the audio pipeline can read back. Opus, webm,
/// mu-law and a-law streams are not among them.
fn is_decodable_azure_format(output_format: &str) -> bool {
    let name = output_format.to_lowercase();
    let pcm16 = name.contains("-16bit-") && name.ends_with("-pcm");
    name.ends_with("-mp3") || (pcm16 && (name.starts_with("riff-") || name.starts_with("raw-")))
}

/// Whether the URL points at this machine (`localhost`, 127.0.0.0/8, ::1)
fn is_loopback_url(url: &str) -> Result<bool, String> {
    let parsed = reqwest::Url::parse(url).map_err(|e| format!("'{}' is not a URL: {}", url, e))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| format!("'{}' has no host", url))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    Ok(host.eq_ignore_ascii_case("localhost")
        || host
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false))
}
