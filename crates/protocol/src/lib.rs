use serde::{Deserialize, Serialize};

/// Fixed input contract: 16 kHz mono signed 16-bit little-endian PCM.
pub const SAMPLE_RATE: u32 = 16_000;

/// A transcribed span as produced by the ASR adapter, before the session
/// controller assigns it a `segment_id` and stamps it with the utterance
/// duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// Messages the client may send as JSON text frames. Binary frames carry raw
/// PCM and are not represented here — the session controller treats them
/// structurally, not as a tagged message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Config {
        #[serde(default)]
        language: Option<String>,
        #[serde(default)]
        target_language: Option<String>,
        #[serde(default)]
        extra_context: Option<String>,
    },
}

/// Messages the server sends back as JSON text frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    VadStart,
    VadCommit {
        duration_ms: f64,
    },
    Transcript {
        segment_id: u64,
        text: String,
        start: f64,
        end: f64,
        duration_ms: f64,
    },
    TranscriptCorrected {
        segment_id: u64,
        text: String,
        source_text: String,
        start: f64,
        end: f64,
        duration_ms: f64,
    },
    Translation {
        segment_id: u64,
        text: String,
        source_text: String,
        start: f64,
        end: f64,
        duration_ms: f64,
    },
}
