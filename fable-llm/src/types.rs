//! Core types for generation requests and responses.

use serde::{Deserialize, Serialize};

/// Sampling parameters passed to a generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

impl GenerationParams {
    /// Parameters taken from the `[narrative]` config section.
    #[must_use]
    pub fn from_config(config: &fable_core::config::NarrativeConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// A raw response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// The generated text, trimmed.
    pub text: String,
    /// How many tokens were generated, if the provider reports it.
    pub tokens_generated: u32,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// Which model was used.
    pub model: String,
}
