use super::http_support::{error_from_response, transport_error};
use super::tts_repository::{preview, TtsRepository};
use crate::domain::tts::{GeminiConfig, ProviderKind, SynthesisError, SynthesisRequest, SynthesisResult};
use crate::infrastructure::audio::AudioFormat;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Past this length the model starts drifting from the text, so longer
/// input is chunked even though the API would accept it
pub const MAX_INPUT_CHARS: usize = 900;

/// Inline audio comes back as raw L16 at 24 kHz unless stated otherwise
const DEFAULT_AUDIO_FORMAT: AudioFormat = AudioFormat::Pcm16 { sample_rate: 24_000 };

/// How the API phrases "the model answered with text"
const TEXT_RESPONSE_MARKERS: [&str; 2] = ["tried to generate text", "only supports audio output"];

/// Gemini speech generation over REST
pub struct GeminiTtsRepository {
    http: reqwest::Client,
    config: GeminiConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'static str; 1],
    speech_config: SpeechConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

impl GeminiTtsRepository {
    pub fn new(http: reqwest::Client, config: GeminiConfig) -> Self {
        Self { http, config }
    }

    fn generate_url(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!(
            "{}/v1beta/models/{}:generateContent",
            base,
            urlencoding::encode(&self.config.model)
        )
    }

    fn request_body<'a>(&'a self, request: &SynthesisRequest<'_>) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![TextPart {
                    text: build_prompt(request),
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["AUDIO"],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: &self.config.voice,
                        },
                    },
                },
            },
        }
    }

    fn parse_audio(&self, body: GenerateContentResponse) -> Result<(Vec<u8>, AudioFormat), SynthesisError> {
        let provider = ProviderKind::Gemini;
        let mut spoken_text = Vec::new();
        let mut finish_reason = None;

        for candidate in body.candidates {
            finish_reason = finish_reason.or(candidate.finish_reason);
            let Some(content) = candidate.content else {
                continue;
            };
            for part in content.parts {
                if let Some(inline) = part.inline_data {
                    let audio = STANDARD.decode(inline.data.trim()).map_err(|e| {
                        SynthesisError::invalid_response(provider, format!("invalid base64 audio: {}", e))
                    })?;
                    if audio.is_empty() {
                        return Err(SynthesisError::empty_audio(provider));
                    }
                    let format = inline
                        .mime_type
                        .as_deref()
                        .and_then(AudioFormat::from_mime_type)
                        .unwrap_or(DEFAULT_AUDIO_FORMAT);
                    return Ok((audio, format));
                }
                if let Some(text) = part.text {
                    spoken_text.push(text);
                }
            }
        }

        if !spoken_text.is_empty() {
            let text = spoken_text.join(" ");
            return Err(SynthesisError::text_instead_of_audio(
                provider,
                None,
                "model produced text instead of audio",
                Some(preview(&text).to_string()),
            ));
        }

        Err(SynthesisError::invalid_response(
            provider,
            format!(
                "response contained no audio (finish reason: {})",
                finish_reason.as_deref().unwrap_or("unknown")
            ),
        ))
    }
}

/// Style instructions and continuity context go ahead of the text and are
/// explicitly marked as not to be read aloud.
fn build_prompt(request: &SynthesisRequest<'_>) -> String {
    let mut prompt = String::new();

    if let Some(instructions) = request.instructions {
        prompt.push_str(instructions.trim());
        prompt.push_str("\n\n");
    }

    if let Some(context) = request.context {
        prompt.push_str(
            "Earlier in this reading (for continuity of tone only, do not read it aloud):\n",
        );
        prompt.push_str(context.trim());
        prompt.push_str("\n\n");
    }

    if !prompt.is_empty() {
        prompt.push_str("Read aloud only the following text:\n");
    }

    prompt.push_str(request.text);
    prompt
}

fn is_text_response_error(error: &SynthesisError) -> bool {
    let haystack = format!(
        "{} {}",
        error.message,
        error.payload.as_deref().unwrap_or_default()
    )
    .to_lowercase();
    TEXT_RESPONSE_MARKERS.iter().any(|m| haystack.contains(m))
}

#[async_trait]
impl TtsRepository for GeminiTtsRepository {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn max_input_chars(&self) -> Option<usize> {
        Some(MAX_INPUT_CHARS)
    }

    fn is_context_sensitive(&self) -> bool {
        true
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest<'_>,
    ) -> Result<SynthesisResult, SynthesisError> {
        let provider = self.provider();
        let start_time = std::time::Instant::now();

        tracing::info!(
            model = %self.config.model,
            voice = %self.config.voice,
            text_length = request.text.chars().count(),
            has_instructions = request.instructions.is_some(),
            context_length = request.context.map(|c| c.chars().count()).unwrap_or(0),
            text_preview = preview(request.text),
            "Calling Gemini TTS API"
        );

        let response = self
            .http
            .post(self.generate_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| transport_error(provider, e))?;

        if !response.status().is_success() {
            let error = error_from_response(provider, response).await;
            if is_text_response_error(&error) {
                return Err(SynthesisError::text_instead_of_audio(
                    provider,
                    error.status,
                    error.message,
                    error.payload,
                ));
            }
            return Err(error);
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            SynthesisError::invalid_response(provider, format!("failed to parse response: {}", e))
        })?;

        let (audio, format) = self.parse_audio(body).map_err(|e| {
            tracing::warn!(error = %e, "Gemini returned no usable audio");
            e
        })?;

        tracing::info!(
            provider = "gemini",
            latency_ms = start_time.elapsed().as_millis(),
            format = %format,
            audio_size_bytes = audio.len(),
            "Gemini TTS audio received"
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
