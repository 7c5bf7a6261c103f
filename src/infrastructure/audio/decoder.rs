use super::error::AudioError;
use super::format::AudioFormat;
use super::pcm::PcmBuffer;
use std::io::Cursor;
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

/// Decode raw audio bytes into mono PCM at their native sample rate.
pub fn decode(bytes: &[u8], format: AudioFormat) -> Result<PcmBuffer, AudioError> {
    if bytes.is_empty() {
        return Err(AudioError::decode(format, "input is empty"));
    }

    let pcm = match format {
        AudioFormat::Pcm16 { sample_rate } => decode_pcm16(bytes, sample_rate),
        AudioFormat::Wav => decode_wav(bytes)?,
        other => decode_compressed(bytes, other)?,
    };

    if pcm.is_empty() {
        return Err(AudioError::decode(format, "no audio frames found"));
    }

    tracing::debug!(
        format = %format,
        input_bytes = bytes.len(),
        samples = pcm.len(),
        sample_rate = pcm.sample_rate(),
        "Audio decoded to PCM"
    );

    Ok(pcm)
}

/// Headerless little-endian 16-bit mono, as returned inline by Gemini
fn decode_pcm16(bytes: &[u8], sample_rate: u32) -> PcmBuffer {
    if bytes.len() % 2 != 0 {
        tracing::warn!(
            byte_count = bytes.len(),
            "PCM payload has an odd byte count, dropping the trailing byte"
        );
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    PcmBuffer::new(samples, sample_rate)
}

fn decode_wav(bytes: &[u8]) -> Result<PcmBuffer, AudioError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| AudioError::decode(AudioFormat::Wav, e.to_string()))?;

    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
        }
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>(),
    }
    .map_err(|e| AudioError::decode(AudioFormat::Wav, e.to_string()))?;

    Ok(PcmBuffer::from_interleaved(
        &interleaved,
        spec.channels as usize,
        spec.sample_rate,
    ))
}

fn decode_compressed(bytes: &[u8], format: AudioFormat) -> Result<PcmBuffer, AudioError> {
    let decode_err = |e: SymphoniaError| AudioError::decode(format, e.to_string());

    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let mut hint = Hint::new();
    hint.with_extension(format.extension());
    hint.mime_type(&format.mime_type());

    // Gapless trims encoder delay and padding when the stream declares them
    let format_options = FormatOptions {
        enable_gapless: true,
        ..Default::default()
    };
    let probed = symphonia::default::get_probe()
        .format(&hint, source, &format_options, &MetadataOptions::default())
        .map_err(decode_err)?;
    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::decode(format, "no decodable audio track"))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(decode_err)?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1);

    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(decode_err(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channels = spec.channels.count();
                sample_rate = spec.rate;

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(buffer.samples());
            }
            // Corrupt frames are skipped, the stream may still recover
            Err(SymphoniaError::DecodeError(message)) => {
                tracing::warn!(format = %format, error = message, "Skipping undecodable frame");
            }
            Err(e) => return Err(decode_err(e)),
        }
    }

    if sample_rate == 0 {
        return Err(AudioError::decode(format, "unknown sample rate"));
    }

    Ok(PcmBuffer::from_interleaved(&interleaved, channels, sample_rate))
}
