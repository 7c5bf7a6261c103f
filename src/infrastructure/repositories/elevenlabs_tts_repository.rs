use super::http_support::{error_from_response, read_audio, response_format, transport_error};
use super::tts_repository::{preview, TtsRepository};
use crate::domain::tts::{
    ElevenLabsConfig, ProviderKind, SynthesisError, SynthesisRequest, SynthesisResult,
};
use crate::infrastructure::audio::AudioFormat;
use async_trait::async_trait;
use serde::Serialize;

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

/// 44.1 kHz MP3 at 128 kbps
const OUTPUT_FORMAT: &str = "mp3_44100_128";

/// Per-request character limit of the multilingual models
const MAX_INPUT_CHARS: usize = 10_000;

/// ElevenLabs voice-clone backend, streamed endpoint
pub struct ElevenLabsTtsRepository {
    http: reqwest::Client,
    config: ElevenLabsConfig,
}

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

impl ElevenLabsTtsRepository {
    pub fn new(http: reqwest::Client, config: ElevenLabsConfig) -> Self {
        Self { http, config }
    }

    fn stream_url(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!(
            "{}/v1/text-to-speech/{}/stream",
            base,
            urlencoding::encode(&self.config.voice_id)
        )
    }
}

#[async_trait]
impl TtsRepository for ElevenLabsTtsRepository {
    fn provider(&self) -> ProviderKind {
        ProviderKind::ElevenLabs
    }

    fn max_input_chars(&self) -> Option<usize> {
        Some(MAX_INPUT_CHARS)
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest<'_>,
    ) -> Result<SynthesisResult, SynthesisError> {
        let provider = self.provider();

        tracing::info!(
            model = %self.config.model,
            voice_id = %self.config.voice_id,
            text_length = request.text.chars().count(),
            text_preview = preview(request.text),
            "Calling ElevenLabs TTS API"
        );

        let response = self
            .http
            .post(self.stream_url())
            .query(&[("output_format", OUTPUT_FORMAT)])
            .header("xi-api-key", &self.config.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&SynthesizeRequest {
                text: request.text,
                model_id: &self.config.model,
            })
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
            "ElevenLabs audio stream drained"
        );

        Ok(SynthesisResult::new(
            audio,
            format,
            provider,
            self.config.model.clone(),
            self.config.voice_id.clone(),
        ))
    }
}
