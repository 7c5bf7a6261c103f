pub mod decoder;
pub mod encoder;
pub mod error;
pub mod format;
pub mod pcm;

pub use encoder::{Mp3Encoder, PcmEncoder};
pub use error::AudioError;
pub use format::AudioFormat;
pub use pcm::PcmBuffer;

use std::sync::Arc;

/// Rate used when a decoded stream cannot be carried by the output codec
const FALLBACK_SAMPLE_RATE: u32 = 24_000;

/// Decode → mono PCM → canonical codec.
///
/// Decoding and encoding are CPU bound and run on the blocking pool so the
/// caller's runtime keeps serving other tasks.
#[derive(Clone)]
pub struct AudioPipeline {
    encoder: Arc<dyn PcmEncoder>,
}

impl AudioPipeline {
    pub fn new() -> Self {
        Self::with_encoder(Arc::new(Mp3Encoder::new()))
    }

    pub fn with_encoder(encoder: Arc<dyn PcmEncoder>) -> Self {
        Self { encoder }
    }

    pub fn output_format(&self) -> AudioFormat {
        self.encoder.format()
    }

    /// Bring `bytes` to the output codec. Input already in that codec is
    /// returned untouched.
    pub async fn normalize(
        &self,
        bytes: Vec<u8>,
        format: AudioFormat,
    ) -> Result<(Vec<u8>, AudioFormat), AudioError> {
        let output_format = self.output_format();
        if format == output_format && format.mime_type() == output_format.mime_type() {
            tracing::debug!(format = %format, "Audio already canonical, skipping transcode");
            return Ok((bytes, format));
        }

        tracing::info!(
            from = %format,
            to = %output_format,
            input_bytes = bytes.len(),
            "Transcoding audio"
        );

        let pcm = self.decode(bytes, format).await?;
        let encoded = self.encode(pcm).await?;
        Ok((encoded, output_format))
    }

    pub async fn decode(&self, bytes: Vec<u8>, format: AudioFormat) -> Result<PcmBuffer, AudioError> {
        tokio::task::spawn_blocking(move || decoder::decode(&bytes, format))
            .await
            .map_err(|e| AudioError::decode(format, format!("decoder task failed: {}", e)))?
    }

    /// Encode mono PCM to the output codec. Zero encoded bytes is an error,
    /// never an empty artifact.
    pub async fn encode(&self, pcm: PcmBuffer) -> Result<Vec<u8>, AudioError> {
        let encoder = self.encoder.clone();

        let encoded = tokio::task::spawn_blocking(move || {
            let pcm = if encoder.supports_sample_rate(pcm.sample_rate()) {
                pcm
            } else {
                tracing::debug!(
                    from = pcm.sample_rate(),
                    to = FALLBACK_SAMPLE_RATE,
                    "Resampling before encode"
                );
                pcm.resample(FALLBACK_SAMPLE_RATE)?
            };

            encoder.encode(&pcm.to_i16(), pcm.sample_rate())
        })
        .await
        .map_err(|e| AudioError::Encode(format!("encoder task failed: {}", e)))??;

        if encoded.is_empty() {
            return Err(AudioError::EmptyOutput);
        }

        Ok(encoded)
    }
}

impl Default for AudioPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AudioPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioPipeline")
            .field("output_format", &self.output_format())
            .finish()
    }
}
