use crate::domain::tts::TtsError;
use crate::infrastructure::storage::StorageError;

/// Main application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Tts(#[from] TtsError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Tts(TtsError::Configuration(_)) => 2,
            Self::Tts(TtsError::EmptyInput) => 3,
            Self::Tts(_) => 4,
            Self::Storage(_) | Self::Io(_) => 5,
        }
    }
}

/// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;
