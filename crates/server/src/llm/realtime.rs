use futures_util::{SinkExt, StreamExt};
use rand::RngCore;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::error::LlmError;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Single-flight client for the realtime websocket transport: one
/// connection is reused across calls, with each call holding the lock for
/// its entire round trip so requests never interleave on the wire.
pub struct RealtimeMultiplexer {
    url: String,
    api_key: String,
    conn: Mutex<Option<WsStream>>,
}

impl RealtimeMultiplexer {
    /// `url` must already carry the model name as a query parameter.
    pub fn new(url: String, api_key: String) -> Self {
        Self { url, api_key, conn: Mutex::new(None) }
    }

    pub async fn request(&self, instructions: &str, input: &str) -> Result<String, LlmError> {
        let mut guard = self.conn.lock().await;
        self.ensure_connected(&mut guard).await?;
        let request_id = random_request_id();

        let result = self.round_trip(guard.as_mut().expect("connected above"), &request_id, instructions, input).await;
        if result.is_err() {
            // a broken socket is useless for the next caller; drop it so
            // ensure_connected reconnects next time.
            *guard = None;
        }
        result
    }

    async fn ensure_connected(&self, guard: &mut Option<WsStream>) -> Result<(), LlmError> {
        if guard.is_some() {
            return Ok(());
        }
        let mut request = self.url.as_str().into_client_request().map_err(|e| LlmError::Transport(e.to_string()))?;
        let auth_value = bearer_header(&self.api_key)
            .parse()
            .map_err(|e: http::header::InvalidHeaderValue| LlmError::Transport(e.to_string()))?;
        request.headers_mut().insert(http::header::AUTHORIZATION, auth_value);
        let (stream, _response) = connect_async(request).await.map_err(|e| LlmError::Transport(e.to_string()))?;
        *guard = Some(stream);

        let update = json!({
            "type": "session.update",
            "session": {
                "modalities": ["text"],
            },
        });
        guard
            .as_mut()
            .unwrap()
            .send(Message::Text(update.to_string().into()))
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(())
    }

    async fn round_trip(
        &self,
        stream: &mut WsStream,
        request_id: &str,
        instructions: &str,
        input: &str,
    ) -> Result<String, LlmError> {
        let request = json!({
            "type": "response.create",
            "response": {
                "metadata": { "request_id": request_id },
                "instructions": instructions,
                "modalities": ["text"],
                "conversation": "none",
                "input": [
                    {
                        "type": "message",
                        "role": "user",
                        "content": [
                            { "type": "input_text", "text": input },
                        ],
                    },
                ],
            },
        });
        stream
            .send(Message::Text(request.to_string().into()))
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        while let Some(msg) = stream.next().await {
            let msg = msg.map_err(|e| LlmError::Transport(e.to_string()))?;
            let Message::Text(text) = msg else { continue };
            let event: Value = serde_json::from_str(&text)?;
            let event_type = event.get("type").and_then(Value::as_str);

            if event_type == Some("error") {
                let message = event.get("error").and_then(|e| e.get("message")).and_then(Value::as_str).unwrap_or("unknown realtime error");
                return Err(LlmError::Upstream(message.to_string()));
            }
            if event_type != Some("response.done") {
                continue;
            }
            let matches_request = event
                .get("response")
                .and_then(|r| r.get("metadata"))
                .and_then(|m| m.get("request_id"))
                .and_then(Value::as_str)
                == Some(request_id);
            if !matches_request {
                continue;
            }
            return extract_text(&event).ok_or_else(|| LlmError::Upstream("no text content in response.done".into()));
        }
        Err(LlmError::Transport("connection closed before response.done".into()))
    }
}

/// Authorization header value for the initial connect handshake, built the
/// way the underlying API expects bearer tokens.
pub fn bearer_header(api_key: &str) -> String {
    format!("Bearer {api_key}")
}

fn random_request_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Walks `response.output[*].content[*].text`, returning the first text
/// segment found.
fn extract_text(event: &Value) -> Option<String> {
    let output = event.get("response")?.get("output")?.as_array()?;
    for item in output {
        let Some(content) = item.get("content").and_then(Value::as_array) else { continue };
        for part in content {
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                return Some(text.to_string());
            }
        }
    }
    None
}
