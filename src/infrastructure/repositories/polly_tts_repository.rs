use super::stream::DrainToBuffer;
use super::tts_repository::{preview, TtsRepository};
use crate::domain::tts::{
    PollyConfig, PollyEngine, ProviderKind, SynthesisError, SynthesisRequest, SynthesisResult,
};
use crate::infrastructure::audio::AudioFormat;
use async_trait::async_trait;
use aws_sdk_polly::{
    config::{http::HttpResponse, Credentials, Region},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::synthesize_speech::SynthesizeSpeechError,
    types::{Engine, LanguageCode, OutputFormat, VoiceId},
    Client as PollyClient,
};

/// AWS Polly has a limit of 3000 characters per request
const MAX_INPUT_CHARS: usize = 3000;

/// AWS Polly implementation of TTS repository
pub struct PollyTtsRepository {
    polly_client: PollyClient,
    config: PollyConfig,
}

impl PollyTtsRepository {
    pub fn new(polly_client: PollyClient, config: PollyConfig) -> Self {
        Self {
            polly_client,
            config,
        }
    }

    /// Build a client from the resolved credentials and region
    pub async fn from_config(config: PollyConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "narrate",
        );

        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut builder = aws_sdk_polly::config::Builder::from(&aws_config);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint.clone());
        }

        tracing::debug!(
            region = %config.region,
            custom_endpoint = config.endpoint_url.is_some(),
            "AWS Polly client initialized"
        );

        Self::new(PollyClient::from_conf(builder.build()), config)
    }

    fn engine(&self) -> Engine {
        match self.config.engine {
            PollyEngine::Standard => Engine::Standard,
            PollyEngine::Neural => Engine::Neural,
            PollyEngine::LongForm => Engine::LongForm,
            PollyEngine::Generative => Engine::Generative,
        }
    }
}

fn map_sdk_error(error: SdkError<SynthesizeSpeechError, HttpResponse>) -> SynthesisError {
    let provider = ProviderKind::Polly;
    let message = DisplayErrorContext(&error).to_string();

    match error.raw_response() {
        Some(raw) => {
            let payload = raw
                .body()
                .bytes()
                .map(|b| String::from_utf8_lossy(b).into_owned());
            let message = error
                .as_service_error()
                .and_then(|e| e.message())
                .map(str::to_string)
                .unwrap_or(message);
            SynthesisError::backend(provider, Some(raw.status().as_u16()), message, payload)
        }
        None => SynthesisError::transport(provider, None, message),
    }
}

#[async_trait]
impl TtsRepository for PollyTtsRepository {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Polly
    }

    fn max_input_chars(&self) -> Option<usize> {
        Some(MAX_INPUT_CHARS)
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest<'_>,
    ) -> Result<SynthesisResult, SynthesisError> {
        let provider = self.provider();
        let start_time = std::time::Instant::now();
        let voice_id = VoiceId::from(self.config.voice.as_str());
        let engine = self.engine();

        tracing::info!(
            voice = %self.config.voice,
            engine = ?engine,
            language_code = ?self.config.language_code,
            output_format = "Mp3",
            text_length = request.text.chars().count(),
            text_preview = preview(request.text),
            "Calling AWS Polly synthesize_speech"
        );

        let mut call = self
            .polly_client
            .synthesize_speech()
            .text(request.text)
            .voice_id(voice_id)
            .output_format(OutputFormat::Mp3)
            .engine(engine.clone());
        if let Some(code) = &self.config.language_code {
            call = call.language_code(LanguageCode::from(code.as_str()));
        }

        let output = call.send().await.map_err(|e| {
            let error = map_sdk_error(e);
            tracing::error!(
                error = %error,
                voice = %self.config.voice,
                engine = ?engine,
                "AWS Polly synthesize_speech failed"
            );
            error
        })?;

        let format = output
            .content_type()
            .and_then(AudioFormat::from_mime_type)
            .unwrap_or(AudioFormat::Mp3);

        let audio = output
            .audio_stream
            .drain()
            .await
            .map_err(|e| SynthesisError::transport(provider, None, e))?;

        if audio.is_empty() {
            return Err(SynthesisError::empty_audio(provider));
        }

        tracing::info!(
            provider = "polly",
            latency_ms = start_time.elapsed().as_millis(),
            request_characters = output.request_characters,
            audio_size_bytes = audio.len(),
            "AWS Polly audio stream collected"
        );

        Ok(SynthesisResult::new(
            audio,
            format,
            provider,
            self.config.engine.as_str(),
            self.config.voice.clone(),
        ))
    }
}
