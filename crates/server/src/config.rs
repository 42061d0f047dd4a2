use clap::Parser;

/// Process bootstrap configuration: connection/bind settings come from CLI
/// flags, LLM provider settings come from environment variables the same
/// way the upstream provider's own SDKs read them.
#[derive(Debug, Parser)]
#[command(name = "relay-server", about = "Real-time speech translation relay")]
pub struct Args {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8001)]
    pub port: u16,

    #[arg(long, env = "WHISPER_MODEL_PATH")]
    pub whisper_model_path: String,
}

/// LLM-side configuration, read directly from the environment rather than
/// through clap since these knobs are provider secrets and defaults, not
/// process-launch flags.
pub struct LlmEnv {
    pub api_key: Option<String>,
    pub target_language: String,
    pub translation_model: String,
    pub realtime_model: String,
    pub use_realtime: bool,
}

impl LlmEnv {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|v| !v.is_empty()),
            target_language: std::env::var("TARGET_LANGUAGE").unwrap_or_else(|_| "zh-TW".to_string()),
            translation_model: std::env::var("TRANSLATION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            realtime_model: std::env::var("REALTIME_MODEL").unwrap_or_else(|_| "gpt-realtime".to_string()),
            use_realtime: std::env::var("USE_REALTIME").map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")).unwrap_or(true),
        }
    }
}
