use thiserror::Error;

#[derive(Debug, Error)]
pub enum AsrError {
    #[error("failed to create whisper decode state: {0}")]
    StateInit(String),
    #[error("whisper transcription failed: {0}")]
    Transcribe(String),
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm client not configured (missing API key)")]
    Disabled,
    #[error("llm transport error: {0}")]
    Transport(String),
    #[error("llm upstream error: {0}")]
    Upstream(String),
    #[error("failed to (de)serialize llm payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("vad initialization failed: {0}")]
    VadInit(#[from] relay_vad::VadError),
}
