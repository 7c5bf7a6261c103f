use super::error::AudioError;
use rubato::{FftFixedIn, Resampler};

/// Frames fed to the FFT resampler per call
const RESAMPLE_CHUNK: usize = 1024;

/// Canonical intermediate audio: mono float samples at a known rate.
///
/// Every codec conversion passes through this type. It only lives for the
/// duration of one conversion and is never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl PcmBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Build a mono buffer from interleaved samples by averaging the
    /// sample-aligned values of every channel. A trailing partial frame is
    /// dropped.
    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: u32) -> Self {
        if channels <= 1 {
            return Self::new(interleaved.to_vec(), sample_rate);
        }

        let samples = interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Quantize every sample to signed 16-bit
    pub fn to_i16(&self) -> Vec<i16> {
        self.samples.iter().copied().map(quantize_sample).collect()
    }

    /// Resample to `target_rate` with an FFT resampler.
    pub fn resample(self, target_rate: u32) -> Result<PcmBuffer, AudioError> {
        if self.sample_rate == target_rate || self.samples.is_empty() {
            return Ok(Self::new(self.samples, target_rate));
        }

        let from = self.sample_rate;
        let resample_err = |e: &dyn std::fmt::Display| AudioError::Resample {
            from,
            to: target_rate,
            message: e.to_string(),
        };

        let mut resampler = FftFixedIn::<f32>::new(
            from as usize,
            target_rate as usize,
            RESAMPLE_CHUNK,
            2,
            1, // mono
        )
        .map_err(|e| resample_err(&e))?;

        let expected_len =
            (self.samples.len() as u64 * target_rate as u64).div_ceil(from as u64) as usize;
        let delay = resampler.output_delay();
        let mut output: Vec<f32> = Vec::with_capacity(expected_len + delay + RESAMPLE_CHUNK);

        let mut position = 0;
        loop {
            let needed = resampler.input_frames_next();
            if self.samples.len() - position < needed {
                break;
            }
            let frames = resampler
                .process(&[&self.samples[position..position + needed]][..], None)
                .map_err(|e| resample_err(&e))?;
            if let Some(channel) = frames.into_iter().next() {
                output.extend(channel);
            }
            position += needed;
        }

        // Tail, then flush the resampler's internal delay line
        let tail = &self.samples[position..];
        let frames = resampler
            .process_partial(Some(&[tail][..]), None)
            .map_err(|e| resample_err(&e))?;
        if let Some(channel) = frames.into_iter().next() {
            output.extend(channel);
        }
        while output.len() < expected_len + delay {
            let frames = resampler
                .process_partial::<&[f32]>(None, None)
                .map_err(|e| resample_err(&e))?;
            match frames.into_iter().next() {
                Some(channel) if !channel.is_empty() => output.extend(channel),
                _ => break,
            }
        }

        let end = (delay + expected_len).min(output.len());
        let start = delay.min(end);
        Ok(Self::new(output[start..end].to_vec(), target_rate))
    }

    /// Append buffers positionally, in the order given. Buffers whose rate
    /// differs from the first one are resampled to it.
    pub fn concat(parts: Vec<PcmBuffer>) -> Result<PcmBuffer, AudioError> {
        let mut parts = parts.into_iter();
        let Some(first) = parts.next() else {
            return Err(AudioError::decode("pcm", "no audio segments to join"));
        };

        let sample_rate = first.sample_rate;
        let mut samples = first.samples;
        for part in parts {
            let part = part.resample(sample_rate)?;
            samples.extend_from_slice(&part.samples);
        }

        Ok(Self::new(samples, sample_rate))
    }
}

/// Clamp to [-1, 1] and quantize to i16, rounding half away from zero.
///
/// Negative samples scale by 32768 and non-negative ones by 32767 so both
/// ends of the range map onto i16 without overflow.
pub fn quantize_sample(sample: f32) -> i16 {
    let clamped = if sample.is_nan() {
        0.0
    } else {
        sample.clamp(-1.0, 1.0)
    };
    let scaled = if clamped < 0.0 {
        clamped * 32768.0
    } else {
        clamped * 32767.0
    };
    scaled.round() as i16
}
