use super::http_support::{error_from_response, read_audio, response_format, transport_error};
use super::tts_repository::{preview, TtsRepository};
use crate::domain::tts::{
    CompatibleHttpConfig, ProviderKind, SynthesisError, SynthesisRequest, SynthesisResult,
};
use crate::infrastructure::audio::AudioFormat;
use async_trait::async_trait;
use serde::Serialize;

/// Self-hosted server speaking the OpenAI speech protocol (Kokoro,
/// openedai-speech, LocalAI...)
pub struct CompatibleTtsRepository {
    http: reqwest::Client,
    config: CompatibleHttpConfig,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

impl CompatibleTtsRepository {
    pub fn new(http: reqwest::Client, config: CompatibleHttpConfig) -> Self {
        Self { http, config }
    }

    fn speech_url(&self) -> String {
        format!("{}/audio/speech", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TtsRepository for CompatibleTtsRepository {
    fn provider(&self) -> ProviderKind {
        ProviderKind::CompatibleHttp
    }

    fn max_input_chars(&self) -> Option<usize> {
        None
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest<'_>,
    ) -> Result<SynthesisResult, SynthesisError> {
        let provider = self.provider();

        tracing::info!(
            endpoint = %self.config.base_url,
            model = %self.config.model,
            voice = %self.config.voice,
            text_length = request.text.chars().count(),
            text_preview = preview(request.text),
            "Calling OpenAI-compatible TTS endpoint"
        );

        let body = SpeechRequest {
            model: &self.config.model,
            input: request.text,
            voice: &self.config.voice,
            response_format: "mp3",
        };

        let mut builder = self.http.post(self.speech_url()).json(&body);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(provider, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(provider, response).await);
        }

        let format = response_format(&response, AudioFormat::Mp3);
        let audio = read_audio(provider, response).await?;

        tracing::debug!(
            format = %format,
            audio_size_bytes = audio.len(),
            "OpenAI-compatible audio received"
        );

        Ok(SynthesisResult::new(
            audio,
            format,
            provider,
            self.config.model.clone(),
            self.config.voice.clone(),
        ))
    }
}
