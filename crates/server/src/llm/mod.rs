mod cache;
mod realtime;
mod request_response;

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::error::LlmError;
use cache::{cache_key, Mode, ResponseCache};
use realtime::RealtimeMultiplexer;
use request_response::RequestResponseClient;

pub fn realtime_client(url: String, api_key: String) -> RealtimeMultiplexer {
    RealtimeMultiplexer::new(url, api_key)
}

pub fn request_response_client(http: reqwest::Client, base_url: String, api_key: String, model: String) -> RequestResponseClient {
    RequestResponseClient::new(http, base_url, api_key, model)
}

const CORRECT_INSTRUCTIONS: &str = "You correct ASR transcripts using context. Do NOT repeat the history. \
     Only return the corrected version of the current transcript. Output JSON only: \
     {\"corrected_text\": \"...\"}.";

const TRANSLATE_INSTRUCTIONS: &str = "You translate text using context. Do NOT repeat the history. Only \
     return the translation of the current text. Output JSON only: {\"translated_text\": \"...\"}.";

const CORRECTED_FIELD: &str = "corrected_text";
const TRANSLATED_FIELD: &str = "translated_text";

#[derive(Clone)]
pub struct LlmConfig {
    pub model: String,
    pub target_language: String,
    pub use_realtime: bool,
}

/// Text-correction and translation client. Prefers the realtime websocket
/// transport when enabled and reachable, falling back to plain HTTP
/// request/response otherwise; both paths share one response cache. Shared
/// process-wide: one instance serves every session.
pub struct LlmClient {
    config: LlmConfig,
    realtime: Option<Arc<RealtimeMultiplexer>>,
    request_response: Option<Arc<RequestResponseClient>>,
    cache: Mutex<ResponseCache>,
}

impl LlmClient {
    pub fn new(
        config: LlmConfig,
        realtime: Option<Arc<RealtimeMultiplexer>>,
        request_response: Option<Arc<RequestResponseClient>>,
    ) -> Self {
        Self { config, realtime, request_response, cache: Mutex::new(ResponseCache::new()) }
    }

    pub fn is_enabled(&self) -> bool {
        self.realtime.is_some() || self.request_response.is_some()
    }

    /// Always returns a string: empty input returns unchanged, a missing
    /// API key makes correction the identity function, and any transport or
    /// parse failure falls back to the raw input.
    pub async fn correct(&self, text: &str, history: &[String]) -> String {
        if text.trim().is_empty() || !self.is_enabled() {
            return text.to_string();
        }
        let payload = json!({ "history": history, "current_transcript": text });
        match self.call(Mode::Correct, CORRECT_INSTRUCTIONS, payload, CORRECTED_FIELD, text, history, "", "").await {
            Ok(corrected) if corrected.is_empty() => text.to_string(),
            Ok(corrected) => corrected,
            Err(e) => {
                tracing::debug!(error = %e, "correction fell back to raw transcript");
                text.to_string()
            }
        }
    }

    /// `None` when translation is disabled (no API key) or the call fails;
    /// `Some("")` when the input itself is empty.
    pub async fn translate(&self, text: &str, history: &[String], target_language: &str, extra_context: &str) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        if text.trim().is_empty() {
            return Some(String::new());
        }
        let payload = json!({
            "target_language": target_language,
            "history": history,
            "extra_context": extra_context,
            "current_text": text,
        });
        match self.call(Mode::Translate, TRANSLATE_INSTRUCTIONS, payload, TRANSLATED_FIELD, text, history, extra_context, target_language).await {
            Ok(translated) => Some(translated),
            Err(e) => {
                tracing::debug!(error = %e, "translation failed");
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn call(
        &self,
        mode: Mode,
        instructions: &str,
        payload: Value,
        response_field: &str,
        text: &str,
        history: &[String],
        extra_context: &str,
        target_language: &str,
    ) -> Result<String, LlmError> {
        let key = cache_key(mode, text, history, extra_context, target_language, &self.config.model);
        if let Some(hit) = self.cache.lock().await.get(&key) {
            return Ok(hit);
        }

        let input = serde_json::to_string(&payload)?;
        let raw = match &self.realtime {
            Some(realtime) => match realtime.request(instructions, &input).await {
                Ok(text) => Ok(text),
                Err(_) if self.request_response.is_some() => {
                    self.request_response.as_ref().unwrap().request(instructions, &input).await
                }
                Err(e) => Err(e),
            },
            None => self.request_response.as_ref().ok_or(LlmError::Disabled)?.request(instructions, &input).await,
        }?;

        let result = extract_field(&raw, response_field)?;
        self.cache.lock().await.put(key, result.clone());
        Ok(result)
    }
}

fn extract_field(raw: &str, field: &str) -> Result<String, LlmError> {
    let value: Value = serde_json::from_str(raw)?;
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| LlmError::Upstream(format!("response missing \"{field}\" field")))
}
