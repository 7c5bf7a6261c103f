use super::http_support::{error_from_response, read_audio, transport_error};
use super::tts_repository::{preview, TtsRepository};
use crate::domain::tts::language::infer_locale;
use crate::domain::tts::{AzureConfig, ProviderKind, SynthesisError, SynthesisRequest, SynthesisResult};
use crate::infrastructure::audio::AudioFormat;
use async_trait::async_trait;

/// Longest text sent in one SSML document
const MAX_INPUT_CHARS: usize = 5000;

/// Azure Speech text-to-speech over its REST endpoint
pub struct AzureTtsRepository {
    http: reqwest::Client,
    config: AzureConfig,
}

impl AzureTtsRepository {
    pub fn new(http: reqwest::Client, config: AzureConfig) -> Self {
        Self { http, config }
    }

    fn synthesis_url(&self) -> String {
        match &self.config.endpoint_url {
            Some(endpoint) => format!("{}/cognitiveservices/v1", endpoint.trim_end_matches('/')),
            None => format!(
                "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
                self.config.region
            ),
        }
    }
}

/// Codec named by an `X-Microsoft-OutputFormat` value. Resolution only
/// lets mp3 and 16-bit PCM formats through.
fn output_audio_format(output_format: &str) -> AudioFormat {
    let name = output_format.to_lowercase();
    if name.starts_with("riff-") {
        AudioFormat::Wav
    } else if name.starts_with("raw-") && name.ends_with("-pcm") {
        let sample_rate = name
            .trim_start_matches("raw-")
            .split('-')
            .next()
            .and_then(parse_sample_rate)
            .unwrap_or(24_000);
        AudioFormat::Pcm16 { sample_rate }
    } else {
        AudioFormat::Mp3
    }
}

/// `24khz` or `22050hz`
fn parse_sample_rate(rate: &str) -> Option<u32> {
    match rate.strip_suffix("khz") {
        Some(khz) => khz.parse::<u32>().ok().map(|khz| khz * 1000),
        None => rate.strip_suffix("hz")?.parse().ok(),
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn build_ssml(locale: &str, voice: &str, text: &str) -> String {
    format!(
        "<speak version='1.0' xml:lang='{}'><voice name='{}'>{}</voice></speak>",
        escape_xml(locale),
        escape_xml(voice),
        escape_xml(text)
    )
}

#[async_trait]
impl TtsRepository for AzureTtsRepository {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Azure
    }

    fn max_input_chars(&self) -> Option<usize> {
        Some(MAX_INPUT_CHARS)
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest<'_>,
    ) -> Result<SynthesisResult, SynthesisError> {
        let provider = self.provider();
        let locale = infer_locale(
            &self.config.voice,
            self.config.language_code.as_deref(),
            request.text,
        );

        tracing::info!(
            region = %self.config.region,
            voice = %self.config.voice,
            locale = %locale,
            output_format = %self.config.output_format,
            text_length = request.text.chars().count(),
            text_preview = preview(request.text),
            "Calling Azure Speech TTS"
        );

        let response = self
            .http
            .post(self.synthesis_url())
            .header("Ocp-Apim-Subscription-Key", &self.config.subscription_key)
            .header(reqwest::header::CONTENT_TYPE, "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", &self.config.output_format)
            .header(reqwest::header::USER_AGENT, "narrate")
            .body(build_ssml(&locale, &self.config.voice, request.text))
            .send()
            .await
            .map_err(|e| transport_error(provider, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(provider, response).await);
        }

        let audio = read_audio(provider, response).await?;

        Ok(SynthesisResult::new(
            audio,
            output_audio_format(&self.config.output_format),
            provider,
            self.config.output_format.clone(),
            self.config.voice.clone(),
        ))
    }
}
