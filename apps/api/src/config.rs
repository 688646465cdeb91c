use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::{ANTHROPIC_API_URL, DEFAULT_MODEL};

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// When unset the service runs with the heuristic describer and keyword resolver.
    pub anthropic_api_key: Option<String>,
    pub llm_api_url: String,
    pub llm_model: String,
    pub port: u16,
    pub rust_log: String,
    pub max_file_size_mb: usize,
    pub session_timeout_minutes: u64,
    /// `None` means permissive CORS.
    pub cors_allow_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            llm_api_url: optional_env("LLM_API_URL")
                .unwrap_or_else(|| ANTHROPIC_API_URL.to_string()),
            llm_model: optional_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            port: parse_env("PORT", 8000)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_file_size_mb: parse_env("MAX_FILE_SIZE_MB", 50)?,
            session_timeout_minutes: parse_env("SESSION_TIMEOUT_MINUTES", 60)?,
            cors_allow_origin: optional_env("CORS_ALLOW_ORIGIN"),
        })
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_minutes * 60)
    }

    pub fn llm_enabled(&self) -> bool {
        self.anthropic_api_key.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            llm_api_url: ANTHROPIC_API_URL.to_string(),
            llm_model: DEFAULT_MODEL.to_string(),
            port: 8000,
            rust_log: "info".to_string(),
            max_file_size_mb: 50,
            session_timeout_minutes: 60,
            cors_allow_origin: None,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}
