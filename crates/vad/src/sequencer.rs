use crate::model::VadModel;
use relay_protocol::SAMPLE_RATE;

pub const THRESH: f32 = 0.5;
pub const MIN_SILENCE_MS: u32 = 500;
pub const WINDOW_MS: u32 = 32;
/// Recognized as configuration but, matching the source behavior, never
/// consulted by the commit rule below (see DESIGN.md).
pub const DEFAULT_MIN_SPEECH_MS: u32 = 250;

const WINDOW_DURATION_S: f32 = WINDOW_MS as f32 / 1000.0;
const MIN_SILENCE_S: f32 = MIN_SILENCE_MS as f32 / 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub enum VadEvent {
    Start,
    Commit(Vec<i16>),
}

/// Per-session utterance-boundary state machine. `triggered ⇒
/// current_speech non-empty`; `¬triggered ⇒ temp_end == 0 ∧ current_speech
/// empty`.
pub struct VadSequencer<M: VadModel> {
    model: M,
    triggered: bool,
    temp_end: f32,
    current_speech: Vec<i16>,
}

impl<M: VadModel> VadSequencer<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            triggered: false,
            temp_end: 0.0,
            current_speech: Vec::new(),
        }
    }

    /// Feeds one 512-sample window and returns the event it produced, if
    /// any. Windows must be delivered in arrival order.
    pub fn process_window(&mut self, window: &[i16]) -> Option<VadEvent> {
        let prob = self.model.predict(window, SAMPLE_RATE);

        if prob >= THRESH {
            let just_started = !self.triggered;
            self.triggered = true;
            self.current_speech.extend_from_slice(window);
            self.temp_end = 0.0;
            if just_started {
                tracing::debug!("speech started");
            }
            return just_started.then_some(VadEvent::Start);
        }

        if !self.triggered {
            return None;
        }

        self.current_speech.extend_from_slice(window);
        self.temp_end += WINDOW_DURATION_S;
        if self.temp_end < MIN_SILENCE_S {
            return None;
        }

        self.triggered = false;
        self.temp_end = 0.0;
        let samples = self.current_speech.len();
        tracing::debug!(samples, "speech committed");
        Some(VadEvent::Commit(std::mem::take(&mut self.current_speech)))
    }

    #[cfg(test)]
    pub(crate) fn is_triggered(&self) -> bool {
        self.triggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::WINDOW_SAMPLES;

    /// A scripted VAD model: replays a fixed sequence of probabilities.
    struct ScriptedVad {
        probs: std::vec::IntoIter<f32>,
    }

    impl ScriptedVad {
        fn new(probs: Vec<f32>) -> Self {
            Self { probs: probs.into_iter() }
        }
    }

    impl VadModel for ScriptedVad {
        fn predict(&mut self, _window: &[i16], _sample_rate: u32) -> f32 {
            self.probs.next().unwrap_or(0.0)
        }
    }

    fn window() -> Vec<i16> {
        vec![0i16; WINDOW_SAMPLES]
    }

    // 500ms / 32ms rounds up to 16 silent windows to cross the threshold.
    const SILENCE_WINDOWS_TO_COMMIT: usize = 16;

    #[test]
    fn idle_stays_idle_below_threshold() {
        let mut seq = VadSequencer::new(ScriptedVad::new(vec![0.1, 0.2, 0.3]));
        for _ in 0..3 {
            assert_eq!(seq.process_window(&window()), None);
        }
        assert!(!seq.is_triggered());
    }

    #[test]
    fn single_speech_window_starts_then_commits_after_min_silence() {
        let mut probs = vec![0.9]; // triggers
        probs.extend(std::iter::repeat(0.1).take(SILENCE_WINDOWS_TO_COMMIT));
        let mut seq = VadSequencer::new(ScriptedVad::new(probs));

        assert_eq!(seq.process_window(&window()), Some(VadEvent::Start));
        assert!(seq.is_triggered());

        for _ in 0..SILENCE_WINDOWS_TO_COMMIT - 1 {
            assert_eq!(seq.process_window(&window()), None);
            assert!(seq.is_triggered());
        }

        let last = seq.process_window(&window());
        assert!(matches!(last, Some(VadEvent::Commit(ref buf)) if buf.len() == WINDOW_SAMPLES * (SILENCE_WINDOWS_TO_COMMIT + 1)));
        assert!(!seq.is_triggered());
    }

    #[test]
    fn silence_budget_resets_on_renewed_speech() {
        let probs = vec![0.9, 0.1, 0.1, 0.9, 0.1];
        let mut seq = VadSequencer::new(ScriptedVad::new(probs));
        assert_eq!(seq.process_window(&window()), Some(VadEvent::Start));
        assert_eq!(seq.process_window(&window()), None);
        assert_eq!(seq.process_window(&window()), None);
        // speech again resets temp_end, so a single trailing silent window
        // afterwards must not commit
        assert_eq!(seq.process_window(&window()), None);
        assert_eq!(seq.process_window(&window()), None);
        assert!(seq.is_triggered());
    }

    #[test]
    fn back_to_back_utterances_each_start_and_commit_independently() {
        let mut probs = vec![0.9];
        probs.extend(std::iter::repeat(0.1).take(SILENCE_WINDOWS_TO_COMMIT));
        probs.push(0.9);
        probs.extend(std::iter::repeat(0.1).take(SILENCE_WINDOWS_TO_COMMIT));
        let mut seq = VadSequencer::new(ScriptedVad::new(probs));

        let mut events = Vec::new();
        for _ in 0..(SILENCE_WINDOWS_TO_COMMIT + 1) * 2 {
            if let Some(e) = seq.process_window(&window()) {
                events.push(e);
            }
        }
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], VadEvent::Start);
        assert!(matches!(events[1], VadEvent::Commit(_)));
        assert_eq!(events[2], VadEvent::Start);
        assert!(matches!(events[3], VadEvent::Commit(_)));
    }
}
