use super::stream::DrainToBuffer;
use crate::domain::tts::{ProviderKind, SynthesisError};
use crate::infrastructure::audio::AudioFormat;
use reqwest::header::CONTENT_TYPE;

/// Map a non-success response to a `SynthesisError` carrying its status
/// and body.
pub(crate) async fn error_from_response(
    provider: ProviderKind,
    response: reqwest::Response,
) -> SynthesisError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    tracing::error!(
        provider = %provider,
        status = status.as_u16(),
        error = %message,
        "TTS backend returned an error"
    );

    SynthesisError::backend(provider, Some(status.as_u16()), message, Some(body))
}

pub(crate) fn transport_error(provider: ProviderKind, error: reqwest::Error) -> SynthesisError {
    tracing::error!(provider = %provider, error = %error, "TTS backend request failed");
    SynthesisError::transport(
        provider,
        error.status().map(|s| s.as_u16()),
        error.to_string(),
    )
}

/// Codec announced by the response, or `default` when absent or unknown
pub(crate) fn response_format(response: &reqwest::Response, default: AudioFormat) -> AudioFormat {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(AudioFormat::from_mime_type)
        .unwrap_or(default)
}

/// Read the whole audio body of a successful response. Zero bytes is an
/// error.
pub(crate) async fn read_audio(
    provider: ProviderKind,
    response: reqwest::Response,
) -> Result<Vec<u8>, SynthesisError> {
    let audio = response
        .drain()
        .await
        .map_err(|e| SynthesisError::transport(provider, None, e))?;

    if audio.is_empty() {
        return Err(SynthesisError::empty_audio(provider));
    }

    Ok(audio)
}

/// Pull a human-readable message out of the usual JSON error shapes:
/// `{"error":{"message":..}}`, `{"error":".."}`, `{"message":..}` and
/// `{"detail":{"message":..}}` / `{"detail":".."}`.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    let candidates = [
        value.pointer("/error/message"),
        value.pointer("/error"),
        value.pointer("/message"),
        value.pointer("/detail/message"),
        value.pointer("/detail"),
    ];

    let message = candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);
    message
}
