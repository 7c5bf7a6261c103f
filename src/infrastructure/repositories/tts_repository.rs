use crate::domain::tts::{ProviderKind, SynthesisError, SynthesisRequest, SynthesisResult};
use async_trait::async_trait;

/// One speech backend.
///
/// Implementations make exactly one backend call per `synthesize` and never
/// split, retry or transcode. Chunking, fallback and normalization belong to
/// the service.
#[async_trait]
pub trait TtsRepository: Send + Sync {
    fn provider(&self) -> ProviderKind;

    /// Longest text accepted in one call, `None` when unbounded
    fn max_input_chars(&self) -> Option<usize>;

    /// Whether the backend takes non-spoken context and style prompts
    fn is_context_sensitive(&self) -> bool {
        false
    }

    /// Synthesize one piece of text.
    ///
    /// Returns the audio in whatever codec the backend produced; the result
    /// records that codec together with the model and voice used.
    async fn synthesize(
        &self,
        request: &SynthesisRequest<'_>,
    ) -> Result<SynthesisResult, SynthesisError>;
}

/// First 200 characters of `text`, for log lines
pub(crate) fn preview(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((offset, _)) => &text[..offset],
        None => text,
    }
}
