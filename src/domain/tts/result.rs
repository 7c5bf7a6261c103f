use super::provider::ProviderKind;
use crate::infrastructure::audio::AudioFormat;
use bytes::Bytes;

/// What an adapter is asked to speak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    /// Style prompt, never read aloud
    pub instructions: Option<&'a str>,
    /// Preceding text for continuity, never read aloud
    pub context: Option<&'a str>,
}

impl<'a> SynthesisRequest<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            instructions: None,
            context: None,
        }
    }

    pub fn with_instructions(mut self, instructions: Option<&'a str>) -> Self {
        self.instructions = instructions.filter(|i| !i.trim().is_empty());
        self
    }

    pub fn with_context(mut self, context: Option<&'a str>) -> Self {
        self.context = context.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn without_instructions(self) -> Self {
        Self {
            instructions: None,
            ..self
        }
    }
}

/// Audio produced by one backend call. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisResult {
    audio: Bytes,
    format: AudioFormat,
    provider: ProviderKind,
    model: String,
    voice: String,
}

impl SynthesisResult {
    pub fn new(
        audio: impl Into<Bytes>,
        format: AudioFormat,
        provider: ProviderKind,
        model: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            audio: audio.into(),
            format,
            provider,
            model: model.into(),
            voice: voice.into(),
        }
    }

    pub fn audio(&self) -> &Bytes {
        &self.audio
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }

    pub fn mime_type(&self) -> String {
        self.format.mime_type()
    }

    /// Backend that produced the audio
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn len(&self) -> usize {
        self.audio.len()
    }

    pub fn is_empty(&self) -> bool {
        self.audio.is_empty()
    }

    /// A new result carrying the same metadata with different audio
    pub fn with_audio(&self, audio: impl Into<Bytes>, format: AudioFormat) -> Self {
        Self {
            audio: audio.into(),
            format,
            provider: self.provider,
            model: self.model.clone(),
            voice: self.voice.clone(),
        }
    }
}
