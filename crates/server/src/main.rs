mod asr;
mod config;
mod context;
mod error;
mod llm;
mod session;

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use serde_json::json;

use asr::{AsrEngine, WhisperAsr};
use config::{Args, LlmEnv};
use llm::{LlmClient, LlmConfig};

const OPENAI_HTTP_BASE: &str = "https://api.openai.com/v1";
const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

#[derive(Clone)]
struct AppState {
    asr: Arc<dyn AsrEngine>,
    llm: Arc<LlmClient>,
    default_target_language: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let llm_env = LlmEnv::from_env();

    let asr: Arc<dyn AsrEngine> = Arc::new(WhisperAsr::load(&args.whisper_model_path)?);
    let llm = Arc::new(build_llm_client(&llm_env));

    let state = AppState { asr, llm, default_target_language: llm_env.target_language.clone() };

    let app = Router::new().route("/", get(health)).route("/ws/audio", get(ws_audio)).with_state(state);

    let addr = format!("{}:{}", args.host, args.port);
    tracing::info!(%addr, "starting relay server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_llm_client(env: &LlmEnv) -> LlmClient {
    let config = LlmConfig {
        model: env.translation_model.clone(),
        target_language: env.target_language.clone(),
        use_realtime: env.use_realtime,
    };

    let Some(api_key) = env.api_key.clone() else {
        return LlmClient::new(config, None, None);
    };

    let realtime = env
        .use_realtime
        .then(|| Arc::new(llm::realtime_client(format!("{OPENAI_REALTIME_URL}?model={}", env.realtime_model), api_key.clone())));

    let http = reqwest::Client::new();
    let request_response =
        Some(Arc::new(llm::request_response_client(http, OPENAI_HTTP_BASE.to_string(), api_key, env.translation_model.clone())));

    LlmClient::new(config, realtime, request_response)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "Live Translator Server" }))
}

async fn ws_audio(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: axum::extract::ws::WebSocket, state: AppState) {
    if let Err(e) = session::run_axum(socket, state.asr, state.llm, state.default_target_language).await {
        tracing::warn!(error = %e, "session ended with error");
    }
}
