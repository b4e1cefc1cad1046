//! Configuration for a fable deployment.
//!
//! Maps directly to `fable.toml`. Every field has a default, so an empty
//! file is a valid configuration. The config is an ordinary value: build it
//! once and pass references into the constructors that need it.

use serde::{Deserialize, Serialize};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FableConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Command interpreter tuning.
    #[serde(default)]
    pub commands: CommandConfig,
    /// Narrative generation pipeline.
    #[serde(default)]
    pub narrative: NarrativeConfig,
    /// Generation backend settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// In-process narrative cache.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Session persistence.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl FableConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `CoreError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::CoreError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Command interpreter tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Minimum similarity ratio for an approximate match.
    #[serde(default = "default_fuzzy_cutoff")]
    pub fuzzy_cutoff: f64,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            fuzzy_cutoff: default_fuzzy_cutoff(),
        }
    }
}

/// Narrative generation pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeConfig {
    /// Consult and populate the narrative cache.
    #[serde(default = "default_true")]
    pub caching_enabled: bool,
    /// Max output tokens for the built-in template.
    #[serde(default = "default_500")]
    pub max_tokens: u32,
    /// Sampling temperature for the built-in template.
    #[serde(default = "default_0_7")]
    pub temperature: f32,
    /// Hard timeout around each backend call; elapse counts as a failure.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// Directory of TOML prompt templates, if any.
    #[serde(default)]
    pub template_dir: Option<String>,
    /// Template used when a request does not name one.
    #[serde(default = "default_template")]
    pub default_template: String,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            caching_enabled: true,
            max_tokens: 500,
            temperature: 0.7,
            request_timeout_ms: None,
            template_dir: None,
            default_template: default_template(),
        }
    }
}

/// Generation backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider: "ollama", "openai", "none".
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Base URL for the LLM API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Retries after the first failed attempt.
    #[serde(default = "default_2")]
    pub max_retries: u32,
    /// System prompt sent ahead of every narrative prompt.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_retries: 2,
            system_prompt: default_system_prompt(),
        }
    }
}

/// In-process narrative cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached narratives.
    #[serde(default = "default_1024")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

/// Session persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Detect save corruption via checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            wal_mode: true,
            checksum_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_template() -> String { "location_description".to_string() }
fn default_provider() -> String { "ollama".to_string() }
fn default_base_url() -> String { "http://localhost:11434".to_string() }
fn default_model() -> String { "llama3.1:8b".to_string() }
fn default_api_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_system_prompt() -> String {
    "You are a creative narrative generator for a text-based adventure game.".to_string()
}
fn default_fuzzy_cutoff() -> f64 { crate::command::DEFAULT_FUZZY_CUTOFF }
fn default_0_7() -> f32 { 0.7 }
fn default_2() -> u32 { 2 }
fn default_500() -> u32 { 500 }
fn default_1024() -> usize { 1024 }
