use serde::{Deserialize, Serialize};

use crate::error::LlmError;

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Plain HTTP request/response client used when the realtime transport is
/// disabled or its connection attempt failed.
pub struct RequestResponseClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl RequestResponseClient {
    pub fn new(http: reqwest::Client, base_url: String, api_key: String, model: String) -> Self {
        Self { http, base_url, api_key, model }
    }

    pub async fn request(&self, instructions: &str, input: &str) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: instructions },
                ChatMessage { role: "user", content: input },
            ],
            response_format: ResponseFormat { kind: "json_object" },
            temperature: Some(0.0),
        };

        let response = self
            .http
            .post(format!("{}{CHAT_COMPLETIONS_PATH}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Upstream(format!("{status}: {text}")));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| LlmError::Transport(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Upstream("empty choices array".into()))
    }
}
