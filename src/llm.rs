//! LLM provider integrations for SQL synthesis and answer composition.
//!
//! This module provides a unified interface for interacting with multiple LLM
//! providers. It handles authentication, request formatting, response parsing,
//! and automatic retry with exponential backoff.
//!
//! Pipeline components never talk to [`LlmClient`] directly; they take any
//! [`LanguageModel`], which keeps them testable with scripted models.
//!
//! # Supported Providers
//!
//! | Provider | Endpoint | Authentication |
//! |----------|----------|----------------|
//! | OpenAI | `api.openai.com` | Bearer token |
//! | Anthropic | `api.anthropic.com` | x-api-key header |
//! | Ollama | Local (configurable) | None |
//!
//! # Retry Behavior
//!
//! The client retries on transient errors:
//! - Connection timeouts
//! - Rate limiting (429)
//! - Server errors (5xx)
//!
//! Retry delays use exponential backoff with configurable parameters. Every
//! request carries the configured timeout.
//!
//! # Example
//!
//! ```
//! use compliance_rag::{
//!     config::RetryConfig,
//!     llm::{LlmClient, LlmProvider}
//! };
//!
//! let provider = LlmProvider::Ollama {
//!     base_url:    "http://localhost:11434".into(),
//!     model:       "llama3.2:3b".into(),
//!     temperature: 0.1
//! };
//!
//! let client = LlmClient::with_retry_config(provider, RetryConfig::default());
//! assert_eq!(client.model_name(), "llama3.2:3b");
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{
    config::{LlmConfig, RetryConfig},
    error::{
        AppError, AppResult, config_error, connectivity_error, describe, http_error, llm_api_error
    }
};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_PROVIDER: &str = "ollama";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:3b";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Text-completion endpoint: one prompt in, one completion out.
#[allow(async_fn_in_trait)]
pub trait LanguageModel {
    /// Send a prompt and return the raw completion text
    async fn invoke(&self, prompt: &str) -> AppResult<String>;
}

/// LLM provider configuration with authentication credentials.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// OpenAI API (GPT-4, GPT-3.5, etc.)
    OpenAI {
        /// API key (sk-...)
        api_key: String,
        /// Model identifier (e.g., "gpt-4o-mini")
        model:   String
    },
    /// Anthropic API (Claude models)
    Anthropic {
        /// API key
        api_key: String,
        /// Model identifier (e.g., "claude-sonnet-4-20250514")
        model:   String
    },
    /// Local Ollama instance
    Ollama {
        /// Base URL (e.g., "http://localhost:11434")
        base_url:    String,
        /// Model name (e.g., "llama3.2:3b")
        model:       String,
        /// Sampling temperature
        temperature: f32
    }
}

impl LlmProvider {
    /// Model identifier regardless of provider
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI {
                model, ..
            }
            | Self::Anthropic {
                model, ..
            }
            | Self::Ollama {
                model, ..
            } => model
        }
    }

    /// Resolve the provider named in config, filling in the default model
    ///
    /// # Errors
    ///
    /// Unknown provider names, and hosted providers without an API key.
    pub fn from_config(config: &LlmConfig) -> AppResult<Self> {
        let name = config
            .provider
            .as_deref()
            .unwrap_or(DEFAULT_PROVIDER)
            .to_lowercase();
        let model = |default: &str| config.model.clone().unwrap_or_else(|| default.to_string());
        match name.as_str() {
            "openai" | "open-ai" => {
                let api_key = config.api_key.clone().ok_or_else(|| {
                    config_error("API key required for OpenAI (use --api-key or LLM_API_KEY)")
                })?;
                Ok(Self::OpenAI {
                    api_key,
                    model: model(DEFAULT_OPENAI_MODEL)
                })
            }
            "anthropic" => {
                let api_key = config.api_key.clone().ok_or_else(|| {
                    config_error("API key required for Anthropic (use --api-key or LLM_API_KEY)")
                })?;
                Ok(Self::Anthropic {
                    api_key,
                    model: model(DEFAULT_ANTHROPIC_MODEL)
                })
            }
            "ollama" => Ok(Self::Ollama {
                base_url:    config
                    .ollama_url
                    .clone()
                    .unwrap_or_else(|| String::from(DEFAULT_OLLAMA_URL)),
                model:       model(DEFAULT_OLLAMA_MODEL),
                temperature: config.temperature
            }),
            other => Err(config_error(format!(
                "Unknown LLM provider '{}' (expected ollama, openai or anthropic)",
                other
            )))
        }
    }
}

/// HTTP client for LLM API communication with retry support.
///
/// Handles provider-specific request formatting and response parsing.
/// Automatically retries transient failures with exponential backoff.
pub struct LlmClient {
    provider:     LlmProvider,
    client:       reqwest::Client,
    retry_config: RetryConfig
}

#[derive(Serialize)]
struct OpenAIRequest {
    model:    String,
    messages: Vec<OpenAIRequestMessage>
}

#[derive(Serialize)]
struct OpenAIRequestMessage {
    role:    String,
    content: String
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: String
}

#[derive(Serialize)]
struct AnthropicRequest {
    model:      String,
    max_tokens: u32,
    messages:   Vec<AnthropicMessage>
}

#[derive(Serialize)]
struct AnthropicMessage {
    role:    String,
    content: String
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String
}

#[derive(Serialize)]
struct OllamaRequest {
    model:   String,
    prompt:  String,
    stream:  bool,
    options: OllamaOptions
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String
}

#[derive(Deserialize)]
struct OllamaTags {
    models: Vec<OllamaModel>
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String
}

impl LlmClient {
    /// Create new LLM client with default retry configuration
    pub fn new(provider: LlmProvider) -> Self {
        Self::with_retry_config(provider, RetryConfig::default())
    }

    /// Create new LLM client with custom retry configuration
    pub fn with_retry_config(provider: LlmProvider, retry_config: RetryConfig) -> Self {
        Self::with_timeout(provider, retry_config, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create new LLM client with custom retry configuration and request timeout
    pub fn with_timeout(provider: LlmProvider, retry_config: RetryConfig, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            provider,
            client,
            retry_config
        }
    }

    /// Model identifier this client talks to
    pub fn model_name(&self) -> &str {
        self.provider.model()
    }

    /// Check that the endpoint is reachable before a session starts
    ///
    /// Ollama is asked for its model list; hosted providers only need a key,
    /// which the provider variant already guarantees.
    pub async fn ping(&self) -> AppResult<()> {
        let LlmProvider::Ollama {
            base_url,
            model,
            ..
        } = &self.provider
        else {
            return Ok(());
        };
        let url = format!("{}/api/tags", base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| connectivity_error("Ollama", e.to_string()))?;
        if !response.status().is_success() {
            return Err(connectivity_error(
                "Ollama",
                format!("unexpected status {}", response.status())
            ));
        }
        let tags: OllamaTags = response.json().await.map_err(http_error)?;
        let pulled = tags
            .models
            .iter()
            .any(|m| m.name == *model || m.name == format!("{}:latest", model));
        if !pulled {
            return Err(connectivity_error(
                "Ollama",
                format!("model '{}' is not pulled", model)
            ));
        }
        Ok(())
    }

    async fn call_with_retry(&self, prompt: &str) -> AppResult<String> {
        let mut last_error = None;
        let mut delay = self.retry_config.initial_delay_ms;
        for attempt in 0..=self.retry_config.max_retries {
            if attempt > 0 {
                warn!(
                    attempt = attempt + 1,
                    max = self.retry_config.max_retries + 1,
                    delay_ms = delay,
                    "retrying LLM request"
                );
                sleep(Duration::from_millis(delay)).await;
                delay = ((delay as f64 * self.retry_config.backoff_factor) as u64)
                    .min(self.retry_config.max_delay_ms);
            }
            match self.call_provider(prompt).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if is_retryable_error(&e) {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| llm_api_error("All retry attempts failed")))
    }

    async fn call_provider(&self, prompt: &str) -> AppResult<String> {
        debug!(model = self.model_name(), prompt_len = prompt.len(), "calling LLM");
        match &self.provider {
            LlmProvider::OpenAI {
                api_key,
                model
            } => self.call_openai(api_key, model, prompt).await,
            LlmProvider::Anthropic {
                api_key,
                model
            } => self.call_anthropic(api_key, model, prompt).await,
            LlmProvider::Ollama {
                base_url,
                model,
                temperature
            } => {
                self.call_ollama(base_url, model, *temperature, prompt)
                    .await
            }
        }
    }

    async fn call_openai(&self, api_key: &str, model: &str, prompt: &str) -> AppResult<String> {
        let request = OpenAIRequest {
            model:    model.to_string(),
            messages: vec![OpenAIRequestMessage {
                role:    String::from("user"),
                content: prompt.to_string()
            }]
        };
        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await
            .map_err(http_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(llm_api_error(format!(
                "OpenAI API error {}: {}",
                status, text
            )));
        }
        let result: OpenAIResponse = response.json().await.map_err(http_error)?;
        result
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| llm_api_error("Empty response from OpenAI"))
    }

    async fn call_anthropic(&self, api_key: &str, model: &str, prompt: &str) -> AppResult<String> {
        let request = AnthropicRequest {
            model:      model.to_string(),
            max_tokens: 4096,
            messages:   vec![AnthropicMessage {
                role:    String::from("user"),
                content: prompt.to_string()
            }]
        };
        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(http_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(llm_api_error(format!(
                "Anthropic API error {}: {}",
                status, text
            )));
        }
        let result: AnthropicResponse = response.json().await.map_err(http_error)?;
        result
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| llm_api_error("Empty response from Anthropic"))
    }

    async fn call_ollama(
        &self,
        base_url: &str,
        model: &str,
        temperature: f32,
        prompt: &str
    ) -> AppResult<String> {
        let request = OllamaRequest {
            model:   model.to_string(),
            prompt:  prompt.to_string(),
            stream:  false,
            options: OllamaOptions {
                temperature
            }
        };
        let url = format!("{}/api/generate", base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(http_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(llm_api_error(format!(
                "Ollama API error {}: {}",
                status, text
            )));
        }
        let result: OllamaResponse = response.json().await.map_err(http_error)?;
        Ok(result.response)
    }
}

impl LanguageModel for LlmClient {
    async fn invoke(&self, prompt: &str) -> AppResult<String> {
        self.call_with_retry(prompt).await
    }
}

/// Whether an error looks transient (timeouts, connectivity, 429, 5xx)
pub fn is_retryable_error(error: &AppError) -> bool {
    let msg = describe(error).to_lowercase();
    msg.contains("timeout")
        || msg.contains("connection")
        || msg.contains("429")
        || msg.contains("rate limit")
        || msg.contains("500")
        || msg.contains("502")
        || msg.contains("503")
        || msg.contains("504")
}
