/// Failures of the audio normalization pipeline.
///
/// None of these are retried: they point at an unsupported codec or a
/// pipeline bug, not at a transient backend condition.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("failed to decode {format} audio: {message}")]
    Decode { format: String, message: String },

    #[error("failed to encode audio: {0}")]
    Encode(String),

    #[error("encoder produced no audio")]
    EmptyOutput,

    #[error("failed to resample audio from {from} Hz to {to} Hz: {message}")]
    Resample { from: u32, to: u32, message: String },
}

impl AudioError {
    pub fn decode(format: impl std::fmt::Display, message: impl Into<String>) -> Self {
        AudioError::Decode {
            format: format.to_string(),
            message: message.into(),
        }
    }

    /// True for failures raised while producing the output codec
    pub fn is_encode_error(&self) -> bool {
        matches!(self, AudioError::Encode(_) | AudioError::EmptyOutput)
    }
}
