use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::llm_client::Provider;

const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:3000,http://127.0.0.1:3000,https://cardninja.vercel.app";

/// Application configuration loaded from environment variables (and `.env` if present).
///
/// Deliberately not `Debug`: it carries API keys and the admin password.
#[derive(Clone)]
pub struct Config {
    pub llm_provider: Provider,
    pub llm_model: String,
    /// Base URL for self-hosted providers (ollama, lmstudio, llamacpp).
    pub llm_base_url: String,
    /// Keys for the configured cloud provider, tried in order.
    pub api_keys: Vec<String>,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// `None` disables every admin endpoint.
    pub admin_password: Option<String>,
    pub data_dir: PathBuf,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source. `from_env` passes the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let llm_provider: Provider = var("LLM_PROVIDER")
            .unwrap_or_else(|| "gemini".to_string())
            .parse()
            .context("LLM_PROVIDER must be one of gemini, groq, mistral, ollama, lmstudio, llamacpp")?;

        let api_keys = match llm_provider.key_env_prefix() {
            Some(prefix) => parse_key_list(
                var(&format!("{prefix}_API_KEYS")).as_deref(),
                var(&format!("{prefix}_API_KEY")).as_deref(),
            ),
            None => Vec::new(),
        };

        let port = var("PORT")
            .or_else(|| var("API_PORT"))
            .unwrap_or_else(|| "8000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        Ok(Config {
            llm_provider,
            llm_model: var("LLM_MODEL").unwrap_or_else(|| "gemini-2.0-flash-exp".to_string()),
            llm_base_url: var("LLM_BASE_URL")
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            api_keys,
            host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            cors_origins: split_list(
                &var("CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
            ),
            admin_password: var("ADMIN_PASSWORD"),
            data_dir: PathBuf::from(var("DATA_DIR").unwrap_or_else(|| "data".to_string())),
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn cards_file(&self) -> PathBuf {
        self.data_dir.join("cards.json")
    }

    pub fn card_sources_file(&self) -> PathBuf {
        self.data_dir.join("card_sources.json")
    }

    pub fn chat_log_file(&self) -> PathBuf {
        self.data_dir.join("chat_sessions.json")
    }

    /// "provider/model", as recorded in the chat log.
    pub fn model_label(&self) -> String {
        format!("{}/{}", self.llm_provider, self.llm_model)
    }

    /// Non-fatal problems worth surfacing at startup.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(prefix) = self.llm_provider.key_env_prefix() {
            if self.api_keys.is_empty() {
                warnings.push(format!(
                    "{prefix}_API_KEY or {prefix}_API_KEYS not set; chat will use fallback answers"
                ));
            }
        }

        if !self.data_dir.exists() {
            warnings.push(format!("Data directory not found: {}", self.data_dir.display()));
        }

        if self.admin_password.is_none() {
            warnings.push("ADMIN_PASSWORD not set; admin endpoints are disabled".to_string());
        }

        warnings
    }
}

/// `<P>_API_KEYS` (comma-separated) wins over the single `<P>_API_KEY`.
fn parse_key_list(multi: Option<&str>, single: Option<&str>) -> Vec<String> {
    match (multi, single) {
        (Some(multi), _) => split_list(multi),
        (None, Some(single)) => vec![single.trim().to_string()],
        (None, None) => Vec::new(),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Shows the first 6 and last 4 characters of a key, for startup logs.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 10 {
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}
