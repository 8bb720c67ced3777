use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// LLM re-scoring when true, keyword fallback when false.
    pub enable_llm_rescoring: bool,
    /// Max LLM calls in flight during upload screening or a re-score pass.
    pub llm_concurrency: usize,
    /// Fixed rng seed for reproducible review orderings (demos, debugging).
    pub ranking_seed: Option<u64>,
    pub max_upload_files: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: optional_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            enable_llm_rescoring: match std::env::var("ENABLE_LLM_RESCORING") {
                Ok(raw) => parse_flag(&raw)
                    .with_context(|| format!("ENABLE_LLM_RESCORING must be a boolean, got '{raw}'"))?,
                Err(_) => true,
            },
            llm_concurrency: optional_env("LLM_CONCURRENCY", 4)?,
            ranking_seed: match std::env::var("RANKING_SEED") {
                Ok(raw) => Some(
                    raw.trim()
                        .parse::<u64>()
                        .context("RANKING_SEED must be an unsigned integer")?,
                ),
                Err(_) => None,
            },
            max_upload_files: optional_env("MAX_UPLOAD_FILES", 50)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
