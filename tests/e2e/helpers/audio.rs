use narrate::infrastructure::audio::{AudioPipeline, PcmBuffer};

/// Headerless 16-bit mono sine, `samples` long
pub fn pcm16_tone(samples: usize) -> Vec<u8> {
    (0..samples)
        .flat_map(|i| (((i as f32 * 0.05).sin() * 8000.0) as i16).to_le_bytes())
        .collect()
}

/// A short, real MP3 stream
pub async fn mp3_tone() -> Vec<u8> {
    let samples = (0..24_000).map(|i| (i as f32 * 0.05).sin() * 0.25).collect();
    AudioPipeline::new()
        .encode(PcmBuffer::new(samples, 24_000))
        .await
        .expect("Failed to encode test tone")
}
