use crate::e2e::helpers::{self, ScriptedFactory, ScriptedRepository};

use narrate::domain::tts::{
    ConfigurationError, ProviderKind, SynthesisError, SynthesisErrorKind, TtsError, TtsServiceApi,
};
use narrate::infrastructure::audio::AudioFormat;
use std::sync::Arc;

fn gemini_overloaded() -> SynthesisError {
    SynthesisError::backend(
        ProviderKind::Gemini,
        Some(503),
        "The model is overloaded. Please try again later.",
        None,
    )
}

#[tokio::test]
async fn it_should_fall_back_to_openai_when_gemini_fails_transiently() {
    let factory = Arc::new(
        ScriptedFactory::new()
            .with(
                ScriptedRepository::new(ProviderKind::Gemini)
                    .failing_with(vec![gemini_overloaded(), gemini_overloaded()]),
            )
            .with(ScriptedRepository::new(ProviderKind::OpenAi)),
    );
    let mut settings = helpers::settings_for("gemini");
    settings.gemini.instructions = "Read calmly".to_string();

    let result = helpers::service(&factory)
        .synthesize("Hello there.", &settings)
        .await
        .unwrap();

    assert_eq!(result.provider(), ProviderKind::OpenAi);
    assert_eq!(result.format(), AudioFormat::Mp3);
    assert!(!result.is_empty());

    // One plain attempt and one retry without the style prompt
    let gemini_calls = factory.repository(ProviderKind::Gemini).calls();
    assert_eq!(gemini_calls.len(), 2);
    assert_eq!(gemini_calls[0].instructions.as_deref(), Some("Read calmly"));
    assert_eq!(gemini_calls[1].instructions, None);

    assert_eq!(factory.repository(ProviderKind::OpenAi).call_count(), 1);
}

#[tokio::test]
async fn it_should_fall_back_to_the_configured_provider() {
    let factory = Arc::new(
        ScriptedFactory::new()
            .with(
                ScriptedRepository::new(ProviderKind::Gemini).failing_with(vec![
                    SynthesisError::text_instead_of_audio(
                        ProviderKind::Gemini,
                        None,
                        "model produced text instead of audio",
                        None,
                    ),
                    gemini_overloaded(),
                ]),
            )
            .with(ScriptedRepository::new(ProviderKind::Polly))
            .with(ScriptedRepository::new(ProviderKind::OpenAi)),
    );
    let mut settings = helpers::settings_for("gemini");
    settings.fallback_provider = "polly".to_string();

    let result = helpers::service(&factory)
        .synthesize("Hello there.", &settings)
        .await
        .unwrap();

    assert_eq!(result.provider(), ProviderKind::Polly);
    assert_eq!(factory.repository(ProviderKind::OpenAi).call_count(), 0);
}

#[tokio::test]
async fn it_should_report_both_failures_when_the_fallback_fails_too() {
    let factory = Arc::new(
        ScriptedFactory::new()
            .with(
                ScriptedRepository::new(ProviderKind::Gemini)
                    .failing_with(vec![gemini_overloaded(), gemini_overloaded()]),
            )
            .with(
                ScriptedRepository::new(ProviderKind::OpenAi).failing_with(vec![
                    SynthesisError::backend(
                        ProviderKind::OpenAi,
                        Some(401),
                        "Incorrect API key provided",
                        None,
                    ),
                ]),
            ),
    );

    let err = helpers::service(&factory)
        .synthesize("Hello there.", &helpers::settings_for("gemini"))
        .await
        .unwrap_err();

    match &err {
        TtsError::FallbackFailed {
            primary,
            fallback_provider,
            fallback,
        } => {
            assert_eq!(primary.provider, ProviderKind::Gemini);
            assert_eq!(primary.status, Some(503));
            assert_eq!(fallback_provider, "OpenAI");
            assert!(matches!(**fallback, TtsError::Synthesis(ref e) if e.status == Some(401)));
        }
        other => panic!("Expected FallbackFailed, got {:?}", other),
    }

    let message = err.to_string();
    assert!(message.contains("overloaded"), "message: {}", message);
    assert!(message.contains("Incorrect API key"), "message: {}", message);
}

#[tokio::test]
async fn it_should_report_an_unconfigured_fallback_without_calling_it() {
    let factory = Arc::new(
        ScriptedFactory::new()
            .with(
                ScriptedRepository::new(ProviderKind::Gemini)
                    .failing_with(vec![gemini_overloaded(), gemini_overloaded()]),
            )
            .with(ScriptedRepository::new(ProviderKind::OpenAi)),
    );
    let mut settings = helpers::settings_for("gemini");
    settings.openai.api_key = String::new();

    let err = helpers::service(&factory)
        .synthesize("Hello there.", &settings)
        .await
        .unwrap_err();

    match err {
        TtsError::FallbackFailed { fallback, .. } => assert!(matches!(
            *fallback,
            TtsError::Configuration(ConfigurationError::Missing {
                provider: ProviderKind::OpenAi,
                field: "api key"
            })
        )),
        other => panic!("Expected FallbackFailed, got {:?}", other),
    }
    assert_eq!(factory.repository(ProviderKind::OpenAi).call_count(), 0);
}

#[tokio::test]
async fn it_should_not_fall_back_onto_the_failing_provider() {
    let factory = Arc::new(
        ScriptedFactory::new().with(
            ScriptedRepository::new(ProviderKind::Gemini)
                .failing_with(vec![gemini_overloaded(), gemini_overloaded()]),
        ),
    );
    let mut settings = helpers::settings_for("gemini");
    settings.fallback_provider = "gemini".to_string();

    let err = helpers::service(&factory)
        .synthesize("Hello there.", &settings)
        .await
        .unwrap_err();

    assert!(matches!(err, TtsError::FallbackFailed { .. }));
    assert_eq!(factory.repository(ProviderKind::Gemini).call_count(), 2);
}

#[tokio::test]
async fn it_should_fall_back_when_gemini_rejects_its_credential() {
    let factory = Arc::new(
        ScriptedFactory::new()
            .with(
                ScriptedRepository::new(ProviderKind::Gemini).failing_with(vec![
                    SynthesisError::backend(
                        ProviderKind::Gemini,
                        Some(400),
                        "API key not valid. Please pass a valid API key.",
                        None,
                    ),
                ]),
            )
            .with(ScriptedRepository::new(ProviderKind::OpenAi)),
    );

    let result = helpers::service(&factory)
        .synthesize("Hello there.", &helpers::settings_for("gemini"))
        .await
        .unwrap();

    assert_eq!(result.provider(), ProviderKind::OpenAi);
    // A bad key is not retried without instructions
    assert_eq!(factory.repository(ProviderKind::Gemini).call_count(), 1);
    assert_eq!(factory.repository(ProviderKind::OpenAi).call_count(), 1);
}

#[tokio::test]
async fn it_should_fall_back_when_gemini_answers_forbidden() {
    let factory = Arc::new(
        ScriptedFactory::new()
            .with(
                ScriptedRepository::new(ProviderKind::Gemini).failing_with(vec![
                    SynthesisError::backend(
                        ProviderKind::Gemini,
                        Some(403),
                        "Method doesn't allow unregistered callers",
                        None,
                    ),
                ]),
            )
            .with(ScriptedRepository::new(ProviderKind::Polly)),
    );
    let mut settings = helpers::settings_for("gemini");
    settings.fallback_provider = "polly".to_string();

    let result = helpers::service(&factory)
        .synthesize("Hello there.", &settings)
        .await
        .unwrap();

    assert_eq!(result.provider(), ProviderKind::Polly);
}

#[tokio::test]
async fn it_should_not_fall_back_on_other_client_errors() {
    let factory = Arc::new(
        ScriptedFactory::new()
            .with(
                ScriptedRepository::new(ProviderKind::Gemini).failing_with(vec![
                    SynthesisError::backend(
                        ProviderKind::Gemini,
                        Some(400),
                        "Voice name Zeus is not supported",
                        None,
                    ),
                ]),
            )
            .with(ScriptedRepository::new(ProviderKind::OpenAi)),
    );

    let err = helpers::service(&factory)
        .synthesize("Hello there.", &helpers::settings_for("gemini"))
        .await
        .unwrap_err();

    match err {
        TtsError::Synthesis(e) => {
            assert_eq!(e.kind, SynthesisErrorKind::Backend);
            assert_eq!(e.status, Some(400));
        }
        other => panic!("Expected Synthesis error, got {:?}", other),
    }
    assert_eq!(factory.repository(ProviderKind::Gemini).call_count(), 1);
    assert_eq!(factory.repository(ProviderKind::OpenAi).call_count(), 0);
}

#[tokio::test]
async fn it_should_only_fall_back_from_context_sensitive_providers() {
    let factory = Arc::new(
        ScriptedFactory::new()
            .with(
                ScriptedRepository::new(ProviderKind::ElevenLabs).failing_with(vec![
                    SynthesisError::backend(ProviderKind::ElevenLabs, Some(503), "busy", None),
                ]),
            )
            .with(ScriptedRepository::new(ProviderKind::OpenAi)),
    );

    let err = helpers::service(&factory)
        .synthesize("Hello there.", &helpers::settings_for("elevenlabs"))
        .await
        .unwrap_err();

    assert!(matches!(err, TtsError::Synthesis(ref e) if e.provider == ProviderKind::ElevenLabs));
    assert_eq!(factory.repository(ProviderKind::ElevenLabs).call_count(), 1);
    assert_eq!(factory.repository(ProviderKind::OpenAi).call_count(), 0);
}
