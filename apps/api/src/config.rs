use anyhow::{Context, Result};

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Application configuration loaded from environment variables.
/// Startup fails if `GEMINI_API_KEY` is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub port: u16,
    pub rust_log: String,
    /// `None` leaves uploads unbounded.
    pub upload_limit_bytes: Option<usize>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_base: std::env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_GEMINI_API_BASE.to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            upload_limit_bytes: std::env::var("UPLOAD_LIMIT_BYTES")
                .ok()
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("UPLOAD_LIMIT_BYTES must be a byte count")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    let value = std::env::var(key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))?;
    if value.trim().is_empty() {
        anyhow::bail!("Required environment variable '{key}' is empty");
    }
    Ok(value)
}

#[cfg(test)]
impl Config {
    /// Configuration pointing the LLM client at a local mock server.
    pub fn for_tests(gemini_api_base: &str) -> Self {
        Config {
            gemini_api_key: "test-key".to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_api_base: gemini_api_base.to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            upload_limit_bytes: None,
        }
    }
}
