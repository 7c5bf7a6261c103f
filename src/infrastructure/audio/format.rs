use serde::{Deserialize, Serialize};

/// Audio codecs the pipeline knows how to read. `Mp3` is the canonical
/// output codec every synthesis result converges to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    /// Headerless little-endian signed 16-bit mono samples
    Pcm16 { sample_rate: u32 },
    Ogg,
    Flac,
    Aac,
}

impl AudioFormat {
    pub const CANONICAL: AudioFormat = AudioFormat::Mp3;

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Pcm16 { .. } => "pcm",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
            AudioFormat::Aac => "aac",
        }
    }

    pub fn mime_type(&self) -> String {
        match self {
            AudioFormat::Mp3 => "audio/mpeg".to_string(),
            AudioFormat::Wav => "audio/wav".to_string(),
            AudioFormat::Pcm16 { sample_rate } => {
                format!("audio/L16;codec=pcm;rate={}", sample_rate)
            }
            AudioFormat::Ogg => "audio/ogg".to_string(),
            AudioFormat::Flac => "audio/flac".to_string(),
            AudioFormat::Aac => "audio/aac".to_string(),
        }
    }

    pub fn is_canonical(&self) -> bool {
        *self == Self::CANONICAL
    }

    /// Parse a MIME type (including parameters) as returned in a
    /// `Content-Type` header or an inline payload descriptor.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let mut parts = mime.split(';').map(str::trim);
        let essence = parts.next()?.to_ascii_lowercase();

        match essence.as_str() {
            "audio/mpeg" | "audio/mp3" | "audio/mpeg3" => Some(AudioFormat::Mp3),
            "audio/wav" | "audio/wave" | "audio/x-wav" | "audio/vnd.wave" => Some(AudioFormat::Wav),
            "audio/ogg" | "audio/opus" => Some(AudioFormat::Ogg),
            "audio/flac" | "audio/x-flac" => Some(AudioFormat::Flac),
            "audio/aac" | "audio/mp4" | "audio/x-m4a" => Some(AudioFormat::Aac),
            "audio/l16" | "audio/pcm" => {
                let sample_rate = parts
                    .filter_map(|param| param.split_once('='))
                    .find(|(key, _)| key.trim().eq_ignore_ascii_case("rate"))
                    .and_then(|(_, value)| value.trim().parse().ok())
                    .unwrap_or(24_000);
                Some(AudioFormat::Pcm16 { sample_rate })
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}
