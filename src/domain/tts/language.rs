use lingua::{Language, LanguageDetectorBuilder};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Locale prefix of a region-qualified voice name, e.g. `en-US-JennyNeural`
static VOICE_LOCALE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]{2,3}-[A-Z]{2})-").expect("voice locale pattern is valid"));

/// Languages the detector is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageCode {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "it")]
    Italian,
    #[serde(rename = "pt")]
    Portuguese,
}

impl LanguageCode {
    /// ISO 639-1 code
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::English => "en",
            LanguageCode::Spanish => "es",
            LanguageCode::French => "fr",
            LanguageCode::German => "de",
            LanguageCode::Italian => "it",
            LanguageCode::Portuguese => "pt",
        }
    }

    /// Region the language is spoken in when nothing more specific is known
    pub fn default_locale(&self) -> &'static str {
        match self {
            LanguageCode::English => "en-US",
            LanguageCode::Spanish => "es-ES",
            LanguageCode::French => "fr-FR",
            LanguageCode::German => "de-DE",
            LanguageCode::Italian => "it-IT",
            LanguageCode::Portuguese => "pt-BR",
        }
    }

    fn from_lingua(language: Language) -> Self {
        match language {
            Language::English => LanguageCode::English,
            Language::Spanish => LanguageCode::Spanish,
            Language::French => LanguageCode::French,
            Language::German => LanguageCode::German,
            Language::Italian => LanguageCode::Italian,
            Language::Portuguese => LanguageCode::Portuguese,
        }
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Detect the language of `text`, if it is one we know
pub fn detect_language(text: &str) -> Option<LanguageCode> {
    let languages = [
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Portuguese,
    ];

    LanguageDetectorBuilder::from_languages(&languages)
        .build()
        .detect_language_of(text)
        .map(LanguageCode::from_lingua)
}

/// Locale encoded in a voice name such as `de-DE-KatjaNeural`
pub fn locale_from_voice(voice: &str) -> Option<&str> {
    VOICE_LOCALE
        .captures(voice)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Pick the locale to announce for `text` spoken by `voice`.
///
/// The voice name wins, then an explicitly configured language code, then
/// whatever the detector makes of the text. English is the last resort.
pub fn infer_locale(voice: &str, language_code: Option<&str>, text: &str) -> String {
    if let Some(locale) = locale_from_voice(voice) {
        return locale.to_string();
    }

    if let Some(code) = language_code.map(str::trim).filter(|c| !c.is_empty()) {
        return code.to_string();
    }

    match detect_language(text) {
        Some(language) => language.default_locale().to_string(),
        None => {
            tracing::warn!(voice = voice, "Could not detect language, falling back to en-US");
            LanguageCode::English.default_locale().to_string()
        }
    }
}
