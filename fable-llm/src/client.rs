//! LLM client: Ollama and OpenAI-compatible HTTP backends.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use fable_core::config::LlmConfig;

use crate::backend::GenerationBackend;
use crate::error::LlmError;
use crate::types::{GenerationParams, LlmResponse};

/// Provider backend for LLM inference.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// Ollama running locally.
    Ollama {
        /// e.g. `http://localhost:11434`.
        base_url: String,
    },
    /// OpenAI-compatible chat completions API.
    OpenAiCompatible {
        /// e.g. `https://api.openai.com`.
        base_url: String,
        /// Bearer token.
        api_key: String,
    },
    /// No LLM available; every call fails and the caller falls back.
    None,
}

/// HTTP client that routes prompts to the configured provider.
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    model: String,
    system_prompt: String,
    max_retries: u32,
    request_timeout: Option<Duration>,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let provider = match &self.provider {
            LlmProvider::Ollama { .. } => "ollama",
            LlmProvider::OpenAiCompatible { .. } => "openai",
            LlmProvider::None => "none",
        };
        f.debug_struct("LlmClient")
            .field("provider", &provider)
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    /// Create a new LLM client.
    #[must_use]
    pub fn new(
        provider: LlmProvider,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            provider,
            http: Client::new(),
            model: model.into(),
            system_prompt: system_prompt.into(),
            max_retries,
            request_timeout: None,
        }
    }

    /// Create a client with no backend (all calls fail → fallback narrative).
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmProvider::None, String::new(), String::new(), 0)
    }

    /// Build a client from the `[llm]` config section. The API key for
    /// `openai` is read from the environment variable named by
    /// `api_key_env`.
    ///
    /// # Errors
    ///
    /// [`LlmError::ConfigError`] for an unknown provider or a missing key.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let provider = match config.provider.as_str() {
            "ollama" => LlmProvider::Ollama {
                base_url: config.base_url.clone(),
            },
            "openai" => {
                let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                    LlmError::ConfigError(format!(
                        "environment variable {} is not set",
                        config.api_key_env
                    ))
                })?;
                LlmProvider::OpenAiCompatible {
                    base_url: config.base_url.clone(),
                    api_key,
                }
            }
            "none" => LlmProvider::None,
            other => {
                return Err(LlmError::ConfigError(format!("unknown provider: '{other}'")));
            }
        };
        Ok(Self::new(
            provider,
            config.model.clone(),
            config.system_prompt.clone(),
            config.max_retries,
        ))
    }

    /// Apply a per-attempt HTTP timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Check if the client has a backend configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    /// Send `prompt` to the provider and return the raw response.
    ///
    /// # Errors
    ///
    /// [`LlmError::Unavailable`] with no provider,
    /// [`LlmError::RetriesExhausted`] when every attempt fails, or
    /// [`LlmError::ParseError`] for a malformed response body.
    pub async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<LlmResponse, LlmError> {
        match &self.provider {
            LlmProvider::None => Err(LlmError::Unavailable("No LLM provider configured".into())),
            LlmProvider::Ollama { base_url } => self.complete_ollama(base_url, prompt, params).await,
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                self.complete_openai(base_url, api_key, prompt, params).await
            }
        }
    }

    async fn complete_ollama(
        &self,
        base_url: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<LlmResponse, LlmError> {
        let url = format!("{base_url}/api/generate");
        let body = json!({
            "model": self.model,
            "prompt": format!("{}\n\n{}", self.system_prompt, prompt),
            "stream": false,
            "options": {
                "temperature": params.temperature,
                "num_predict": params.max_tokens,
            }
        });

        let (json, latency_ms) = self.post_with_retries("ollama", &url, None, &body).await?;
        let text = json["response"]
            .as_str()
            .ok_or_else(|| LlmError::ParseError("missing 'response' field".into()))?;

        Ok(LlmResponse {
            text: text.trim().to_string(),
            tokens_generated: token_count(&json["eval_count"]),
            latency_ms,
            model: self.model.clone(),
        })
    }

    async fn complete_openai(
        &self,
        base_url: &str,
        api_key: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<LlmResponse, LlmError> {
        let url = format!("{base_url}/v1/chat/completions");
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.system_prompt },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        });

        let (json, latency_ms) = self
            .post_with_retries("openai", &url, Some(api_key), &body)
            .await?;
        let text = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::ParseError("missing 'choices[0].message.content'".into()))?;

        Ok(LlmResponse {
            text: text.trim().to_string(),
            tokens_generated: token_count(&json["usage"]["completion_tokens"]),
            latency_ms,
            model: self.model.clone(),
        })
    }

    /// POST `body` up to `max_retries + 1` times; returns the decoded JSON
    /// body of the first successful response and its latency.
    async fn post_with_retries(
        &self,
        provider: &'static str,
        url: &str,
        api_key: Option<&str>,
        body: &Value,
    ) -> Result<(Value, u64), LlmError> {
        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(
                    provider,
                    attempt = attempt + 1,
                    of = self.max_retries + 1,
                    "Retrying LLM call"
                );
            }

            let mut request = self.http.post(url).json(body);
            if let Some(key) = api_key {
                request = request.bearer_auth(key);
            }
            if let Some(timeout) = self.request_timeout {
                request = request.timeout(timeout);
            }

            let start = Instant::now();
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    let json: Value = resp
                        .json()
                        .await
                        .map_err(|e| LlmError::ParseError(e.to_string()))?;
                    return Ok((json, latency_ms));
                }
                Ok(resp) => {
                    let status = resp.status();
                    last_error = format!("HTTP {status}: {}", resp.text().await.unwrap_or_default());
                    warn!(provider, error = %last_error, "LLM provider returned error");
                }
                Err(e) => {
                    if e.is_timeout() {
                        warn!(provider, "LLM request timed out");
                    } else {
                        warn!(provider, error = %e, "LLM request failed");
                    }
                    last_error = e.to_string();
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }
}

impl GenerationBackend for LlmClient {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        let response = self.complete(prompt, params).await?;
        debug!(
            model = %response.model,
            tokens = response.tokens_generated,
            latency_ms = response.latency_ms,
            "LLM generation complete"
        );
        Ok(response.text)
    }
}

fn token_count(value: &Value) -> u32 {
    value
        .as_u64()
        .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX))
}
