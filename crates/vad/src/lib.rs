pub mod framer;
pub mod model;
pub mod sequencer;

pub use framer::{Framer, WINDOW_BYTES, WINDOW_SAMPLES};
pub use model::{SileroVad, VadError, VadModel};
pub use sequencer::{VadEvent, VadSequencer, DEFAULT_MIN_SPEECH_MS, MIN_SILENCE_MS, THRESH, WINDOW_MS};

/// Convenience pipeline combining the framer and the sequencer: feed raw
/// bytes in, get VAD events out, in arrival order.
pub struct Vad<M: VadModel> {
    framer: Framer,
    sequencer: VadSequencer<M>,
}

impl<M: VadModel> Vad<M> {
    pub fn new(model: M) -> Self {
        Self { framer: Framer::new(), sequencer: VadSequencer::new(model) }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<VadEvent> {
        self.framer
            .push(bytes)
            .into_iter()
            .filter_map(|window| self.sequencer.process_window(&window))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysSilent;
    impl VadModel for AlwaysSilent {
        fn predict(&mut self, _window: &[i16], _sample_rate: u32) -> f32 {
            0.0
        }
    }

    #[test]
    fn pure_silence_yields_no_events() {
        let mut vad = Vad::new(AlwaysSilent);
        // 2 seconds at 16kHz, fed in odd-sized chunks.
        let total_bytes = 16_000 * 2 * 2;
        let bytes = vec![0u8; total_bytes];
        let mut events = Vec::new();
        for chunk in bytes.chunks(777) {
            events.extend(vad.push_bytes(chunk));
        }
        assert!(events.is_empty());
    }
}
