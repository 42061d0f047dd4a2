use std::sync::Arc;

use relay_protocol::Segment;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::error::AsrError;

/// Abstraction over the speech-to-text backend so sessions can be driven
/// against a stub in tests without loading a model.
pub trait AsrEngine: Send + Sync {
    fn transcribe(&self, samples: &[i16], language_hint: Option<&str>) -> Result<Vec<Segment>, AsrError>;
}

pub struct WhisperAsr {
    ctx: Arc<WhisperContext>,
}

impl WhisperAsr {
    pub fn load(model_path: &str) -> Result<Self, AsrError> {
        let ctx = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
            .map_err(|e| AsrError::StateInit(e.to_string()))?;
        Ok(Self { ctx: Arc::new(ctx) })
    }
}

impl AsrEngine for WhisperAsr {
    fn transcribe(&self, samples: &[i16], language_hint: Option<&str>) -> Result<Vec<Segment>, AsrError> {
        let mut state = self.ctx.create_state().map_err(|e| AsrError::StateInit(e.to_string()))?;

        let audio: Vec<f32> = samples.iter().map(|&s| s as f32 / 32768.0).collect();

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_no_context(true);
        params.set_print_progress(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        if let Some(lang) = language_hint.filter(|l| !l.is_empty() && *l != "auto") {
            params.set_language(Some(lang));
        }

        state.full(params, &audio).map_err(|e| AsrError::Transcribe(e.to_string()))?;

        let num_segments = state.full_n_segments().map_err(|e| AsrError::Transcribe(e.to_string()))?;
        let mut segments = Vec::with_capacity(num_segments as usize);
        for i in 0..num_segments {
            let segment = state.get_segment(i).ok_or_else(|| AsrError::Transcribe(format!("missing segment {i}")))?;
            let text = segment.to_str_lossy().map_err(|e| AsrError::Transcribe(e.to_string()))?.trim().to_string();
            if text.is_empty() {
                continue;
            }
            let start = segment.start_timestamp() as f64 / 100.0;
            let end = segment.end_timestamp() as f64 / 100.0;
            segments.push(Segment { text, start, end });
        }
        Ok(segments)
    }
}
