use crate::e2e::helpers::{self, mp3_tone, pcm16_tone};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use narrate::domain::tts::{
    segment, AzureConfig, ElevenLabsConfig, GeminiConfig, PollyConfig, PollyEngine,
    ProviderCatalog, ProviderKind, SynthesisError, SynthesisErrorKind, SynthesisRequest,
    SynthesisResult, TtsError, TtsService, TtsServiceApi, TtsSettings,
};
use narrate::infrastructure::audio::{AudioFormat, AudioPipeline};
use narrate::infrastructure::repositories::{
    AzureTtsRepository, ElevenLabsTtsRepository, GeminiTtsRepository, PollyTtsRepository,
    ProviderRepositoryFactory, TtsRepository,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{
    body_json, body_partial_json, body_string, header, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FAKE_MP3: &[u8] = &[0xFF, 0xFB, 0x90, 0x64, 0x00, 0x00, 0x00, 0x00];

fn http_service() -> TtsService {
    TtsService::new(
        Arc::new(ProviderRepositoryFactory::new(reqwest::Client::new())),
        ProviderCatalog::default(),
        false,
    )
}

fn gemini_config(server: &MockServer) -> GeminiConfig {
    GeminiConfig {
        api_key: "gemini-test".to_string(),
        model: "gemini-2.5-flash-preview-tts".to_string(),
        voice: "Kore".to_string(),
        instructions: None,
        base_url: Some(server.uri()),
    }
}

async fn synthesize_with(
    repository: &dyn TtsRepository,
    text: &str,
) -> Result<SynthesisResult, SynthesisError> {
    repository.synthesize(&SynthesisRequest::new(text)).await
}

#[tokio::test]
async fn it_should_call_a_local_compatible_server_without_an_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .and(body_json(json!({
            "model": "kokoro",
            "input": "Hello there.",
            "voice": "af_bella",
            "response_format": "mp3"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .set_body_bytes(FAKE_MP3),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = helpers::settings_for("openai-compatible");
    settings.compatible.base_url = format!("{}/v1/", server.uri());
    settings.compatible.model = "kokoro".to_string();
    settings.compatible.voice = "af_bella".to_string();

    let result = http_service()
        .synthesize("Hello there.", &settings)
        .await
        .unwrap();

    assert_eq!(result.provider(), ProviderKind::CompatibleHttp);
    assert_eq!(result.format(), AudioFormat::Mp3);
    assert_eq!(result.audio().as_ref(), FAKE_MP3);
    assert_eq!(result.model(), "kokoro");

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn it_should_surface_compatible_server_errors_with_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"error": {"message": "model not loaded"}})),
        )
        .mount(&server)
        .await;

    let mut settings = helpers::settings_for("openai-compatible");
    settings.compatible.base_url = format!("{}/v1", server.uri());
    settings.compatible.api_key = "local-key".to_string();

    let err = http_service()
        .synthesize("Hello there.", &settings)
        .await
        .unwrap_err();

    match err {
        TtsError::Synthesis(e) => {
            assert_eq!(e.provider, ProviderKind::CompatibleHttp);
            assert_eq!(e.status, Some(500));
            assert_eq!(e.message, "model not loaded");
            assert!(e.is_retryable());
        }
        other => panic!("Expected Synthesis error, got {:?}", other),
    }
}

#[tokio::test]
async fn it_should_send_openai_speech_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "tts-1",
            "input": "Hello there.",
            "voice": "alloy",
            "response_format": "mp3"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(FAKE_MP3))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = helpers::settings_for("openai");
    settings.openai.base_url = format!("{}/v1", server.uri());

    let result = http_service()
        .synthesize("Hello there.", &settings)
        .await
        .unwrap();

    assert_eq!(result.provider(), ProviderKind::OpenAi);
    assert_eq!(result.voice(), "alloy");
    assert_eq!(result.audio().as_ref(), FAKE_MP3);
}

#[tokio::test]
async fn it_should_surface_openai_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "Input is too long",
                "type": "invalid_request_error",
                "param": "input",
                "code": null
            }
        })))
        .mount(&server)
        .await;

    let mut settings = helpers::settings_for("openai");
    settings.openai.base_url = format!("{}/v1", server.uri());

    let err = http_service()
        .synthesize("Hello there.", &settings)
        .await
        .unwrap_err();

    match err {
        TtsError::Synthesis(e) => {
            assert_eq!(e.provider, ProviderKind::OpenAi);
            assert_eq!(e.kind, SynthesisErrorKind::Backend);
            assert!(e.message.contains("Input is too long"));
            assert!(!e.is_retryable());
        }
        other => panic!("Expected Synthesis error, got {:?}", other),
    }
}

#[tokio::test]
async fn it_should_split_text_past_the_openai_ceiling_and_join_the_audio() {
    let paragraph = "This sentence is part of a long article about rivers. ".repeat(40);
    let text = vec![paragraph.trim(); 5].join("\n\n");
    let expected_calls = segment(&text, 4096).len();
    assert!(expected_calls > 1);

    let tone = mp3_tone().await;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .set_body_bytes(tone.clone()),
        )
        .expect(expected_calls as u64)
        .mount(&server)
        .await;

    let mut settings = helpers::settings_for("openai");
    settings.openai.base_url = format!("{}/v1", server.uri());

    let result = http_service().synthesize(&text, &settings).await.unwrap();

    assert_eq!(result.format(), AudioFormat::Mp3);
    assert!(result.len() > tone.len());

    // Each chunk carries exactly one second of tone, seams add nothing
    let joined = AudioPipeline::new()
        .decode(result.audio().to_vec(), AudioFormat::Mp3)
        .await
        .unwrap();
    let expected_samples = expected_calls as i64 * 24_000;
    assert!(
        (joined.len() as i64 - expected_samples).abs() <= 64 * expected_calls as i64,
        "joined {} samples, expected about {}",
        joined.len(),
        expected_samples
    );

    let requests = server.received_requests().await.unwrap();
    for request in &requests {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        let input = body["input"].as_str().unwrap();
        assert!(input.chars().count() <= 4096);
    }
}

#[tokio::test]
async fn it_should_decode_gemini_inline_pcm() {
    let pcm = pcm16_tone(4_800);
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-preview-tts:generateContent"))
        .and(header("x-goog-api-key", "gemini-test"))
        .and(body_partial_json(json!({
            "contents": [{"parts": [{"text": "Hello there."}]}],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {"voiceConfig": {"prebuiltVoiceConfig": {"voiceName": "Kore"}}}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"inlineData": {
                    "mimeType": "audio/L16;codec=pcm;rate=24000",
                    "data": STANDARD.encode(&pcm)
                }}]},
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repository = GeminiTtsRepository::new(reqwest::Client::new(), gemini_config(&server));
    let result = synthesize_with(&repository, "Hello there.").await.unwrap();

    assert_eq!(result.format(), AudioFormat::Pcm16 { sample_rate: 24_000 });
    assert_eq!(result.audio().as_ref(), pcm.as_slice());
    assert_eq!(result.voice(), "Kore");
}

#[tokio::test]
async fn it_should_normalize_gemini_audio_to_mp3() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-preview-tts:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"inlineData": {
                    "mimeType": "audio/L16;codec=pcm;rate=24000",
                    "data": STANDARD.encode(pcm16_tone(4_800))
                }}]}
            }]
        })))
        .mount(&server)
        .await;

    let mut settings: TtsSettings = helpers::settings_for("gemini");
    settings.gemini.base_url = server.uri();

    let result = http_service()
        .synthesize("Hello there.", &settings)
        .await
        .unwrap();

    assert_eq!(result.provider(), ProviderKind::Gemini);
    assert_eq!(result.format(), AudioFormat::Mp3);
    assert!(!result.is_empty());
}

#[tokio::test]
async fn it_should_flag_gemini_text_replies_as_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"text": "Sure! Here is the text read aloud."}]},
                "finishReason": "STOP"
            }]
        })))
        .mount(&server)
        .await;

    let repository = GeminiTtsRepository::new(reqwest::Client::new(), gemini_config(&server));
    let err = synthesize_with(&repository, "Hello there.").await.unwrap_err();

    assert_eq!(err.kind, SynthesisErrorKind::TextInsteadOfAudio);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn it_should_flag_gemini_text_generation_errors_as_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "Model tried to generate text, but it should only be used for TTS.",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .mount(&server)
        .await;

    let repository = GeminiTtsRepository::new(reqwest::Client::new(), gemini_config(&server));
    let err = synthesize_with(&repository, "Hello there.").await.unwrap_err();

    assert_eq!(err.kind, SynthesisErrorKind::TextInsteadOfAudio);
    assert_eq!(err.status, Some(400));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn it_should_send_ssml_to_azure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cognitiveservices/v1"))
        .and(header("Ocp-Apim-Subscription-Key", "azure-test"))
        .and(header("Content-Type", "application/ssml+xml"))
        .and(header("X-Microsoft-OutputFormat", "audio-24khz-96kbitrate-mono-mp3"))
        .and(body_string(
            "<speak version='1.0' xml:lang='en-US'><voice name='en-US-JennyNeural'>Fish &amp; chips.</voice></speak>",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .set_body_bytes(FAKE_MP3),
        )
        .expect(1)
        .mount(&server)
        .await;

    let repository = AzureTtsRepository::new(
        reqwest::Client::new(),
        AzureConfig {
            subscription_key: "azure-test".to_string(),
            region: "westeurope".to_string(),
            voice: "en-US-JennyNeural".to_string(),
            language_code: None,
            output_format: "audio-24khz-96kbitrate-mono-mp3".to_string(),
            endpoint_url: Some(server.uri()),
        },
    );
    let result = synthesize_with(&repository, "Fish & chips.").await.unwrap();

    assert_eq!(result.provider(), ProviderKind::Azure);
    assert_eq!(result.format(), AudioFormat::Mp3);
    assert_eq!(result.model(), "audio-24khz-96kbitrate-mono-mp3");
}

#[tokio::test]
async fn it_should_stream_elevenlabs_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/voice-1/stream"))
        .and(query_param("output_format", "mp3_44100_128"))
        .and(header("xi-api-key", "xi-test"))
        .and(body_json(json!({
            "text": "Hello there.",
            "model_id": "eleven_multilingual_v2"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .set_body_bytes(FAKE_MP3),
        )
        .expect(1)
        .mount(&server)
        .await;

    let repository = ElevenLabsTtsRepository::new(
        reqwest::Client::new(),
        ElevenLabsConfig {
            api_key: "xi-test".to_string(),
            model: "eleven_multilingual_v2".to_string(),
            voice_id: "voice-1".to_string(),
            base_url: Some(server.uri()),
        },
    );
    let result = synthesize_with(&repository, "Hello there.").await.unwrap();

    assert_eq!(result.provider(), ProviderKind::ElevenLabs);
    assert_eq!(result.voice(), "voice-1");
    assert_eq!(result.audio().as_ref(), FAKE_MP3);
}

#[tokio::test]
async fn it_should_report_empty_elevenlabs_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "audio/mpeg"))
        .mount(&server)
        .await;

    let repository = ElevenLabsTtsRepository::new(
        reqwest::Client::new(),
        ElevenLabsConfig {
            api_key: "xi-test".to_string(),
            model: "eleven_multilingual_v2".to_string(),
            voice_id: "voice-1".to_string(),
            base_url: Some(server.uri()),
        },
    );
    let err = synthesize_with(&repository, "Hello there.").await.unwrap_err();

    assert_eq!(err.kind, SynthesisErrorKind::EmptyAudio);
}

fn polly_config(server: &MockServer) -> PollyConfig {
    PollyConfig {
        access_key_id: "AKIDTEST".to_string(),
        secret_access_key: "secret".to_string(),
        region: "eu-west-1".to_string(),
        voice: "Joanna".to_string(),
        engine: PollyEngine::Neural,
        language_code: None,
        endpoint_url: Some(server.uri()),
    }
}

#[tokio::test]
async fn it_should_synthesize_with_polly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/speech"))
        .and(body_partial_json(json!({
            "Text": "Hello there.",
            "VoiceId": "Joanna",
            "OutputFormat": "mp3",
            "Engine": "neural"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .insert_header("x-amzn-RequestCharacters", "12")
                .set_body_bytes(FAKE_MP3),
        )
        .expect(1)
        .mount(&server)
        .await;

    let repository = PollyTtsRepository::from_config(polly_config(&server)).await;
    let result = synthesize_with(&repository, "Hello there.").await.unwrap();

    assert_eq!(result.provider(), ProviderKind::Polly);
    assert_eq!(result.model(), "neural");
    assert_eq!(result.audio().as_ref(), FAKE_MP3);
}

#[tokio::test]
async fn it_should_surface_polly_service_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/speech"))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("x-amzn-ErrorType", "TextLengthExceededException")
                .set_body_json(json!({"message": "Maximum text length has been exceeded"})),
        )
        .mount(&server)
        .await;

    let repository = PollyTtsRepository::from_config(polly_config(&server)).await;
    let err = synthesize_with(&repository, "Hello there.").await.unwrap_err();

    assert_eq!(err.provider, ProviderKind::Polly);
    assert_eq!(err.status, Some(400));
    assert!(err.message.contains("Maximum text length"));
    assert!(!err.is_retryable());
}
