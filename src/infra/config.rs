//! Centralized configuration (environment variables + defaults).

use std::env;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://kensenich.db";
pub const DEFAULT_LLM_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Model provider settings. Present only when `LLM_API_KEY` is set.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// `None` disables the chat endpoint (it answers 503).
    pub llm: Option<LlmConfig>,
    /// Persisted messages replayed when a chat request carries no history.
    pub chat_history_limit: u32,
    /// Ask the model again with tool results before replying.
    pub chat_follow_up: bool,
}

impl Config {
    /// Load configuration from environment variables with defaults.
    ///
    /// Call `dotenv::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> anyhow::Result<Self> {
        let llm = match env::var("LLM_API_KEY").ok().filter(|k| !k.trim().is_empty()) {
            Some(api_key) => Some(LlmConfig {
                api_url: env::var("LLM_API_URL")
                    .unwrap_or_else(|_| DEFAULT_LLM_API_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                api_key,
                model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
                timeout: Duration::from_secs(
                    env::var("LLM_TIMEOUT_SECS")
                        .unwrap_or_else(|_| "60".to_string())
                        .parse()?,
                ),
            }),
            None => None,
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            llm,
            chat_history_limit: env::var("CHAT_HISTORY_LIMIT")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,
            chat_follow_up: parse_flag(
                &env::var("CHAT_FOLLOW_UP").unwrap_or_else(|_| "true".to_string()),
            )?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean flag, got '{}'", other),
    }
}
