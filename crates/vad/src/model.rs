use crate::framer::WINDOW_SAMPLES;
use relay_protocol::SAMPLE_RATE;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VadError {
    #[error("failed to initialize VAD model: {0}")]
    Init(String),
}

/// The black-box speech-probability classifier. Out of scope per the
/// specification's own terms — only the contract `model(window, sample_rate)
/// -> probability` is relied on by the sequencer built on top of it.
pub trait VadModel: Send {
    fn predict(&mut self, window: &[i16], sample_rate: u32) -> f32;
}

/// Silero-backed implementation operating on the spec's native 512-sample
/// (32 ms) window at 16 kHz.
pub struct SileroVad {
    inner: voice_activity_detector::VoiceActivityDetector,
}

impl SileroVad {
    pub fn new() -> Result<Self, VadError> {
        let inner = voice_activity_detector::VoiceActivityDetector::builder()
            .sample_rate(SAMPLE_RATE as i64)
            .chunk_size(WINDOW_SAMPLES)
            .build()
            .map_err(|e| VadError::Init(e.to_string()))?;
        tracing::info!(sample_rate = SAMPLE_RATE, chunk_size = WINDOW_SAMPLES, "loaded VAD model");
        Ok(Self { inner })
    }
}

impl VadModel for SileroVad {
    fn predict(&mut self, window: &[i16], _sample_rate: u32) -> f32 {
        self.inner.predict(window.iter().copied())
    }
}
