use super::provider::ProviderKind;
use crate::infrastructure::audio::AudioError;
use regex::Regex;
use std::sync::LazyLock;

/// Longest backend payload kept in an error message
const MAX_PAYLOAD_CHARS: usize = 500;

/// Statuses worth retrying against another backend
const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Statuses of a rejected credential
const CREDENTIAL_STATUSES: [u16; 2] = [401, 403];

/// Best-effort markers for errors that surface without a status code.
/// SDK errors often only carry a human-readable message.
static TRANSIENT_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:429|50[0234])\b|rate limit|too many requests|overloaded|unavailable|timed out",
    )
    .expect("transient message pattern is valid")
});

/// Gemini answers a bad key with 400 rather than 401
static CREDENTIAL_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)api key not valid|invalid api key|api_key_invalid|incorrect api key")
        .expect("credential message pattern is valid")
});

/// Settings are missing or invalid. Raised before any network call and
/// never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{provider} is not configured: missing {field}")]
    Missing {
        provider: ProviderKind,
        field: &'static str,
    },

    #[error("{provider} setting '{field}' is invalid: {reason}")]
    Invalid {
        provider: ProviderKind,
        field: &'static str,
        reason: String,
    },

    #[error("unknown TTS provider '{0}'")]
    UnknownProvider(String),
}

impl ConfigurationError {
    /// Name of the offending setting, if the error is about one
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ConfigurationError::Missing { field, .. } | ConfigurationError::Invalid { field, .. } => {
                Some(field)
            }
            ConfigurationError::UnknownProvider(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisErrorKind {
    /// The backend answered with an error status
    Backend,
    /// The request never got a usable HTTP answer
    Transport,
    /// The backend generated text where audio was requested
    TextInsteadOfAudio,
    /// The backend answered successfully with zero audio bytes
    EmptyAudio,
    /// The backend answered with a body we could not interpret
    InvalidResponse,
}

/// A backend call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.describe())]
pub struct SynthesisError {
    pub provider: ProviderKind,
    pub kind: SynthesisErrorKind,
    pub status: Option<u16>,
    pub message: String,
    /// Raw error body as returned by the backend
    pub payload: Option<String>,
}

impl SynthesisError {
    pub fn backend(
        provider: ProviderKind,
        status: Option<u16>,
        message: impl Into<String>,
        payload: Option<String>,
    ) -> Self {
        Self {
            provider,
            kind: SynthesisErrorKind::Backend,
            status,
            message: message.into(),
            payload: payload.filter(|p| !p.trim().is_empty()),
        }
    }

    pub fn transport(provider: ProviderKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind: SynthesisErrorKind::Transport,
            status,
            message: message.into(),
            payload: None,
        }
    }

    pub fn text_instead_of_audio(
        provider: ProviderKind,
        status: Option<u16>,
        message: impl Into<String>,
        payload: Option<String>,
    ) -> Self {
        Self {
            kind: SynthesisErrorKind::TextInsteadOfAudio,
            ..Self::backend(provider, status, message, payload)
        }
    }

    pub fn empty_audio(provider: ProviderKind) -> Self {
        Self {
            provider,
            kind: SynthesisErrorKind::EmptyAudio,
            status: None,
            message: "backend returned no audio".to_string(),
            payload: None,
        }
    }

    pub fn invalid_response(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind: SynthesisErrorKind::InvalidResponse,
            status: None,
            message: message.into(),
            payload: None,
        }
    }

    /// Whether another attempt (possibly on another backend) may succeed.
    ///
    /// An explicit status decides when present. Without one, the message
    /// is matched against a best-effort allowlist.
    pub fn is_retryable(&self) -> bool {
        if self.kind == SynthesisErrorKind::TextInsteadOfAudio {
            return true;
        }

        if let Some(status) = self.status {
            return TRANSIENT_STATUSES.contains(&status);
        }

        TRANSIENT_MESSAGE.is_match(&self.message)
    }

    /// Whether the backend rejected the credential it was given
    pub fn is_credential_failure(&self) -> bool {
        if self.kind != SynthesisErrorKind::Backend {
            return false;
        }

        match self.status {
            Some(status) if CREDENTIAL_STATUSES.contains(&status) => true,
            Some(400) | None => CREDENTIAL_MESSAGE.is_match(&self.message),
            _ => false,
        }
    }

    /// Whether another backend may succeed where this one failed
    pub fn warrants_fallback(&self) -> bool {
        self.is_retryable() || self.is_credential_failure()
    }

    fn describe(&self) -> String {
        let mut text = format!("{} synthesis failed", self.provider);
        if let Some(status) = self.status {
            text.push_str(&format!(" (HTTP {})", status));
        }
        text.push_str(&format!(": {}", self.message));

        if let Some(payload) = &self.payload {
            let payload = payload.trim();
            if !self.message.contains(payload) {
                let excerpt: String = payload.chars().take(MAX_PAYLOAD_CHARS).collect();
                text.push_str(&format!(" [response: {}]", excerpt));
            }
        }

        text
    }
}

/// Terminal failure of one synthesis operation.
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    #[error("nothing to synthesize: text is empty")]
    EmptyInput,

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("{primary}; fallback to {fallback_provider} failed: {fallback}")]
    FallbackFailed {
        primary: SynthesisError,
        /// Display name, or the tag as configured when it names no backend
        fallback_provider: String,
        fallback: Box<TtsError>,
    },
}
