use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_INTERVIEW_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_FEEDBACK_MODEL: &str = "gpt-4o";

/// Application configuration loaded from environment variables.
/// Startup fails if the provider credential is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub interview_model: String,
    pub feedback_model: String,
    pub feedback_template_path: Option<PathBuf>,
    pub session_ttl: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            openai_api_key: require_secret(&lookup, "OPENAI_API_KEY")?,
            openai_base_url: var("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            interview_model: var("INTERVIEW_MODEL")
                .unwrap_or_else(|| DEFAULT_INTERVIEW_MODEL.to_string()),
            feedback_model: var("FEEDBACK_MODEL")
                .unwrap_or_else(|| DEFAULT_FEEDBACK_MODEL.to_string()),
            feedback_template_path: var("FEEDBACK_TEMPLATE_PATH").map(PathBuf::from),
            session_ttl: Duration::from_secs(
                var("SESSION_TTL_SECS")
                    .unwrap_or_else(|| "3600".to_string())
                    .parse::<u64>()
                    .context("SESSION_TTL_SECS must be a whole number of seconds")?,
            ),
            port: var("PORT")
                .unwrap_or_else(|| "8501".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn require_secret<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            anyhow!(
                "Missing required secret: {key}. \
                 Set it as an environment variable or in a .env file before starting the server."
            )
        })
}
