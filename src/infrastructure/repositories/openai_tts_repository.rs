use super::tts_repository::{preview, TtsRepository};
use crate::domain::tts::{
    ConfigurationError, OpenAiConfig, ProviderKind, SynthesisError, SynthesisRequest,
    SynthesisResult,
};
use crate::infrastructure::audio::AudioFormat;
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{CreateSpeechRequest, SpeechModel, SpeechResponseFormat, Voice},
    Client,
};
use async_trait::async_trait;

/// OpenAI has a limit of 4096 characters per request
const MAX_INPUT_CHARS: usize = 4096;

/// OpenAI speech API through the official SDK. Always returns MP3.
pub struct OpenAiTtsRepository {
    client: Client<OpenAIConfig>,
    model: String,
    voice: String,
    voice_enum: Voice,
}

impl OpenAiTtsRepository {
    pub fn new(config: &OpenAiConfig) -> Result<Self, ConfigurationError> {
        let voice_enum = parse_voice(&config.voice).ok_or_else(|| ConfigurationError::Invalid {
            provider: ProviderKind::OpenAi,
            field: "voice",
            reason: format!("'{}' is not supported by the SDK", config.voice),
        })?;

        let mut sdk_config = OpenAIConfig::new().with_api_key(config.api_key.clone());
        if let Some(base_url) = &config.base_url {
            sdk_config = sdk_config.with_api_base(base_url.trim_end_matches('/'));
        }

        Ok(Self {
            client: Client::with_config(sdk_config),
            model: config.model.clone(),
            voice: config.voice.clone(),
            voice_enum,
        })
    }

    fn speech_model(&self) -> SpeechModel {
        match self.model.as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        }
    }
}

fn parse_voice(voice: &str) -> Option<Voice> {
    match voice.trim().to_lowercase().as_str() {
        "alloy" => Some(Voice::Alloy),
        "echo" => Some(Voice::Echo),
        "fable" => Some(Voice::Fable),
        "onyx" => Some(Voice::Onyx),
        "nova" => Some(Voice::Nova),
        "shimmer" => Some(Voice::Shimmer),
        _ => None,
    }
}

/// The SDK retries rate limits and server errors itself and only reports
/// a status through the transport error, so the rest is left to the
/// message heuristics.
fn map_sdk_error(error: OpenAIError) -> SynthesisError {
    let provider = ProviderKind::OpenAi;
    match error {
        OpenAIError::Reqwest(e) => SynthesisError::transport(
            provider,
            e.status().map(|s| s.as_u16()),
            e.to_string(),
        ),
        OpenAIError::ApiError(api) => SynthesisError::backend(provider, None, api.message, None),
        other => SynthesisError::backend(provider, None, other.to_string(), None),
    }
}

#[async_trait]
impl TtsRepository for OpenAiTtsRepository {
    fn provider(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn max_input_chars(&self) -> Option<usize> {
        Some(MAX_INPUT_CHARS)
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest<'_>,
    ) -> Result<SynthesisResult, SynthesisError> {
        let start_time = std::time::Instant::now();

        tracing::info!(
            model = %self.model,
            voice = %self.voice,
            text_length = request.text.chars().count(),
            text_preview = preview(request.text),
            "Calling OpenAI TTS API"
        );

        let speech_request = CreateSpeechRequest {
            model: self.speech_model(),
            input: request.text.to_string(),
            voice: self.voice_enum.clone(),
            response_format: Some(SpeechResponseFormat::Mp3),
            speed: None,
        };

        let response = self
            .client
            .audio()
            .speech(speech_request)
            .await
            .map_err(|e| {
                let error = map_sdk_error(e);
                tracing::error!(
                    error = %error,
                    model = %self.model,
                    voice = %self.voice,
                    "OpenAI TTS API call failed"
                );
                error
            })?;

        if response.bytes.is_empty() {
            return Err(SynthesisError::empty_audio(ProviderKind::OpenAi));
        }

        tracing::info!(
            provider = "openai",
            model = %self.model,
            voice = %self.voice,
            latency_ms = start_time.elapsed().as_millis(),
            audio_size_bytes = response.bytes.len(),
            "OpenAI TTS audio received"
        );

        Ok(SynthesisResult::new(
            response.bytes,
            AudioFormat::Mp3,
            ProviderKind::OpenAi,
            self.model.clone(),
            self.voice.clone(),
        ))
    }
}
