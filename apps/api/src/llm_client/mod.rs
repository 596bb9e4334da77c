//! LLM client: the single point of entry for all language-model calls in CardNinja.
//!
//! Handlers talk to the model through the `ChatModel` trait carried in `AppState`;
//! `LlmClient` is the HTTP implementation covering every supported provider.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod providers;

/// Turns of prior conversation forwarded to the model.
pub const HISTORY_WINDOW: usize = 6;
const MAX_ATTEMPTS: usize = 3;
const CHAT_TIMEOUT: Duration = Duration::from_secs(60);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const GEMINI_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Groq,
    Mistral,
    Ollama,
    LmStudio,
    LlamaCpp,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Groq => "groq",
            Provider::Mistral => "mistral",
            Provider::Ollama => "ollama",
            Provider::LmStudio => "lmstudio",
            Provider::LlamaCpp => "llamacpp",
        }
    }

    /// Hosted providers that need an API key.
    pub fn is_cloud(&self) -> bool {
        matches!(self, Provider::Gemini | Provider::Groq | Provider::Mistral)
    }

    /// Env var prefix of the provider's API keys (`GROQ` → `GROQ_API_KEY(S)`).
    pub fn key_env_prefix(&self) -> Option<&'static str> {
        match self {
            Provider::Gemini => Some("GEMINI"),
            Provider::Groq => Some("GROQ"),
            Provider::Mistral => Some("MISTRAL"),
            Provider::Ollama | Provider::LmStudio | Provider::LlamaCpp => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown LLM provider: {0}")]
pub struct UnknownProvider(String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "groq" => Ok(Provider::Groq),
            "mistral" => Ok(Provider::Mistral),
            "ollama" => Ok(Provider::Ollama),
            "lmstudio" => Ok(Provider::LmStudio),
            "llamacpp" => Ok(Provider::LlamaCpp),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no API key configured for {0}")]
    MissingApiKey(Provider),

    #[error("Rate limited after {attempts} attempts")]
    RateLimited { attempts: usize },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Transport errors drop their URL; it can carry credentials and ends up in `/api/health`.
impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Http(e.without_url())
    }
}

/// One prior message of the conversation, as sent by the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

fn default_role() -> String {
    "user".to_string()
}

impl ChatTurn {
    #[cfg(test)]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct LlmHealth {
    pub status: HealthStatus,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LlmHealth {
    pub fn healthy(provider: Provider, model: &str) -> Self {
        Self {
            status: HealthStatus::Healthy,
            provider: provider.to_string(),
            current_model: Some(model.to_string()),
            models: None,
            error: None,
        }
    }

    pub fn unhealthy(provider: Provider, error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            provider: provider.to_string(),
            current_model: None,
            models: None,
            error: Some(error.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// The chat seam. Carried in `AppState` as `Arc<dyn ChatModel>` so handlers can be
/// exercised against a stub.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn provider(&self) -> Provider;

    fn model(&self) -> &str;

    /// Sends `message` with `system` context and the most recent `history` turns.
    async fn chat(
        &self,
        system: &str,
        history: &[ChatTurn],
        message: &str,
    ) -> Result<String, LlmError>;

    async fn health(&self) -> LlmHealth;
}

/// HTTP client for the configured provider.
/// Rotates through the configured API keys on 429 and retries 5xx with backoff.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    provider: Provider,
    model: String,
    base_url: String,
    api_keys: Vec<String>,
}

impl LlmClient {
    pub fn new(
        provider: Provider,
        model: String,
        base_url: String,
        api_keys: Vec<String>,
    ) -> Result<Self, LlmError> {
        Self::with_timeout(provider, model, base_url, api_keys, CHAT_TIMEOUT)
    }

    fn with_timeout(
        provider: Provider,
        model: String,
        base_url: String,
        api_keys: Vec<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            provider,
            model,
            base_url,
            api_keys,
        })
    }

    fn key_for_attempt(&self, attempt: usize) -> Option<&str> {
        if self.api_keys.is_empty() {
            None
        } else {
            Some(self.api_keys[attempt % self.api_keys.len()].as_str())
        }
    }

    /// Attaches the provider's auth scheme to `request`.
    fn authorize(&self, request: RequestBuilder, key: Option<&str>) -> RequestBuilder {
        match (self.provider, key) {
            (Provider::Gemini, Some(key)) => request.header(GEMINI_KEY_HEADER, key),
            (Provider::Groq | Provider::Mistral, Some(key)) => request.bearer_auth(key),
            _ => request,
        }
    }

    fn chat_request(
        &self,
        key: Option<&str>,
        system: &str,
        history: &[ChatTurn],
        message: &str,
    ) -> RequestBuilder {
        let url = providers::chat_url(self.provider, &self.model, &self.base_url);
        let request = self.client.post(url);

        let request = match self.provider {
            Provider::Gemini => request.json(&providers::gemini_request(system, history, message)),
            Provider::Groq | Provider::Mistral | Provider::LmStudio => request.json(
                &providers::openai_request(self.provider, &self.model, system, history, message),
            ),
            Provider::Ollama => {
                request.json(&providers::ollama_request(&self.model, system, history, message))
            }
            Provider::LlamaCpp => {
                request.json(&providers::llamacpp_request(system, history, message))
            }
        };

        self.authorize(request, key)
    }

    async fn probe(&self) -> Result<LlmHealth, LlmError> {
        let key = self.key_for_attempt(0);
        if self.provider.is_cloud() && key.is_none() {
            return Err(LlmError::MissingApiKey(self.provider));
        }

        let url = providers::health_url(self.provider, &self.model, &self.base_url);
        let request = match self.provider {
            Provider::Gemini => self.client.post(url).json(&providers::gemini_ping()),
            _ => self.client.get(url),
        };
        let response = self
            .authorize(request, key)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?;

        // llama.cpp and LM Studio only need to answer at all.
        if matches!(self.provider, Provider::LmStudio | Provider::LlamaCpp) {
            return Ok(LlmHealth::healthy(self.provider, &self.model));
        }

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let mut health = LlmHealth::healthy(self.provider, &self.model);
        if self.provider == Provider::Ollama {
            let tags: providers::OllamaTags = response.json().await?;
            health.models = Some(tags.models.into_iter().map(|m| m.name).collect());
        }
        Ok(health)
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        system: &str,
        history: &[ChatTurn],
        message: &str,
    ) -> Result<String, LlmError> {
        if self.provider.is_cloud() && self.api_keys.is_empty() {
            return Err(LlmError::MissingApiKey(self.provider));
        }

        let history = recent_history(history);
        let attempts = MAX_ATTEMPTS.max(self.api_keys.len());
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..attempts {
            // A fresh key is tried immediately; revisiting a key backs off first.
            if attempt > 0 && attempt >= self.api_keys.len() {
                let delay = Duration::from_millis(500u64 << (attempt - 1).min(4));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let key = self.key_for_attempt(attempt);
            let response = match self.chat_request(key, system, history, message).send().await {
                Ok(r) => r,
                // A hung endpoint already cost a full timeout; let the caller fall back.
                Err(e) if e.is_timeout() => return Err(e.into()),
                Err(e) => {
                    last_error = Some(e.into());
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 {
                warn!(
                    "{} rate limited key #{}",
                    self.provider,
                    attempt % self.api_keys.len().max(1) + 1
                );
                last_error = Some(LlmError::RateLimited {
                    attempts: attempt + 1,
                });
                continue;
            }

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            let body = response.text().await?;
            if !status.is_success() {
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let reply = providers::parse_reply(self.provider, &body)?;
            debug!(
                "LLM call succeeded: provider={}, reply_chars={}",
                self.provider,
                reply.len()
            );
            return Ok(reply);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited { attempts }))
    }

    async fn health(&self) -> LlmHealth {
        match self.probe().await {
            Ok(health) => health,
            Err(e) => LlmHealth::unhealthy(self.provider, e.to_string()),
        }
    }
}

/// The last [`HISTORY_WINDOW`] turns of `history`.
pub fn recent_history(history: &[ChatTurn]) -> &[ChatTurn] {
    &history[history.len().saturating_sub(HISTORY_WINDOW)..]
}
