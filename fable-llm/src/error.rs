//! LLM error types.

use thiserror::Error;

/// Errors from the narrative generation stack.
///
/// Only [`LlmError::Template`] and [`LlmError::ConfigError`] ever reach a
/// caller of [`crate::NarrativeGenerator`]: every other variant is recovered
/// inside the pipeline by falling back or skipping the cache.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("LLM request failed: {0}")]
    RequestFailed(String),

    /// LLM response was not valid JSON.
    #[error("Failed to parse LLM response as JSON: {0}")]
    ParseError(String),

    /// Request timed out.
    #[error("LLM request timed out after {0}ms")]
    Timeout(u64),

    /// LLM provider is unavailable.
    #[error("LLM provider unavailable: {0}")]
    Unavailable(String),

    /// All retry attempts exhausted.
    #[error("All LLM retry attempts exhausted after {attempts} tries: {last_error}")]
    RetriesExhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Error from the final attempt.
        last_error: String,
    },

    /// Configuration error.
    #[error("LLM configuration error: {0}")]
    ConfigError(String),

    /// No prompt template registered under this name.
    #[error("Prompt template not found: {0}")]
    TemplateNotFound(String),

    /// A prompt template file could not be read or parsed.
    #[error("Prompt template error: {0}")]
    Template(String),

    /// The narrative cache could not be reached.
    #[error("Narrative cache unavailable: {0}")]
    CacheUnavailable(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(0)
        } else if err.is_connect() {
            LlmError::Unavailable(err.to_string())
        } else {
            LlmError::RequestFailed(err.to_string())
        }
    }
}
