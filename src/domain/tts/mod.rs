pub mod error;
pub mod language;
pub mod provider;
pub mod resolver;
pub mod result;
pub mod segmentation;
pub mod service;
pub mod settings;

pub use error::{ConfigurationError, SynthesisError, SynthesisErrorKind, TtsError};
pub use language::LanguageCode;
pub use provider::{
    AzureConfig, CompatibleHttpConfig, ElevenLabsConfig, GeminiConfig, OpenAiConfig, PollyConfig,
    PollyEngine, ProviderConfig, ProviderKind,
};
pub use resolver::resolve_provider;
pub use result::{SynthesisRequest, SynthesisResult};
pub use segmentation::{segment, ContextWindow, TextChunk, CONTEXT_WINDOW_CHARS};
pub use service::{TtsService, TtsServiceApi};
pub use settings::{ProviderCatalog, ProviderDefaults, TtsSettings};
