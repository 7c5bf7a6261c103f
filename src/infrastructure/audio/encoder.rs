use super::error::AudioError;
use super::format::AudioFormat;
use mp3lame_encoder::{max_required_buffer_size, Bitrate, Builder, FlushGap, MonoPcm, Quality};

/// LAME consumes 1152 samples per MPEG-1 Layer III frame
pub const MP3_FRAME_SAMPLES: usize = 1152;

/// Space LAME asks for when flushing its last frames
const MP3_FLUSH_RESERVE: usize = 7200;

/// Sample rates an MPEG audio stream can carry
pub const MP3_SAMPLE_RATES: [u32; 9] = [
    8_000, 11_025, 12_000, 16_000, 22_050, 24_000, 32_000, 44_100, 48_000,
];

/// Encodes mono 16-bit PCM into the output codec
pub trait PcmEncoder: Send + Sync {
    fn format(&self) -> AudioFormat;

    /// Whether the encoder accepts `sample_rate` as-is
    fn supports_sample_rate(&self, sample_rate: u32) -> bool;

    fn encode(&self, samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, AudioError>;
}

/// Constant-bitrate (128 kbps) MP3 encoder backed by LAME
#[derive(Debug, Clone, Default)]
pub struct Mp3Encoder;

impl Mp3Encoder {
    pub fn new() -> Self {
        Self
    }
}

fn lame_error(stage: &str, e: impl std::fmt::Debug) -> AudioError {
    AudioError::Encode(format!("LAME {} failed: {:?}", stage, e))
}

impl PcmEncoder for Mp3Encoder {
    fn format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    fn supports_sample_rate(&self, sample_rate: u32) -> bool {
        MP3_SAMPLE_RATES.contains(&sample_rate)
    }

    fn encode(&self, samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, AudioError> {
        let mut builder = Builder::new()
            .ok_or_else(|| AudioError::Encode("failed to allocate LAME encoder".to_string()))?;
        builder
            .set_num_channels(1)
            .map_err(|e| lame_error("channel setup", e))?;
        builder
            .set_sample_rate(sample_rate)
            .map_err(|e| lame_error("sample rate setup", e))?;
        builder
            .set_brate(Bitrate::Kbps128)
            .map_err(|e| lame_error("bitrate setup", e))?;
        builder
            .set_quality(Quality::Good)
            .map_err(|e| lame_error("quality setup", e))?;
        // The Info frame carries encoder delay and padding for gapless decoding
        builder
            .set_to_write_vbr_tag(true)
            .map_err(|e| lame_error("info tag setup", e))?;
        let mut encoder = builder.build().map_err(|e| lame_error("init", e))?;

        let mut output = Vec::with_capacity(max_required_buffer_size(samples.len()));
        for frame in samples.chunks(MP3_FRAME_SAMPLES) {
            output.reserve(max_required_buffer_size(frame.len()));
            encoder
                .encode_to_vec(MonoPcm(frame), &mut output)
                .map_err(|e| lame_error("encode", e))?;
        }

        output.reserve(MP3_FLUSH_RESERVE);
        encoder
            .flush_to_vec::<FlushGap>(&mut output)
            .map_err(|e| lame_error("flush", e))?;

        // LAME leaves a blank placeholder where the Info frame belongs
        let mut tag = Vec::with_capacity(encoder.lame_tag_size());
        match encoder.lame_tag_encode_to_vec(&mut tag) {
            Some(_) if tag.len() <= output.len() => output[..tag.len()].copy_from_slice(&tag),
            _ => tracing::warn!("LAME info tag unavailable, output keeps encoder padding"),
        }

        tracing::debug!(
            samples = samples.len(),
            sample_rate = sample_rate,
            encoded_bytes = output.len(),
            "PCM encoded to MP3"
        );

        Ok(output)
    }
}
