//! Prompt templates for narrative generation.
//!
//! A template is plain text with `{key}` placeholders. The built-in
//! [`LOCATION_DESCRIPTION`] template is always available; more can be loaded
//! from a directory of TOML files:
//!
//! ```toml
//! [prompt]
//! name = "tavern_scene"          # defaults to the file stem
//! version = "1.0"
//! max_tokens = 300
//! temperature = 0.9
//! text = "{memory_log}Describe a {location_type} with a {tone} mood, mentioning {required_elements}."
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use fable_core::config::NarrativeConfig;

use crate::error::LlmError;
use crate::types::GenerationParams;

/// Name of the built-in location description template.
pub const DEFAULT_TEMPLATE_NAME: &str = "location_description";

/// Built-in location description template. `{memory_log}` is either empty
/// or ends in a newline, so it prefixes the instruction directly.
pub const LOCATION_DESCRIPTION: &str = "{memory_log}Generate a detailed description of a \
{location_type} environment, using a {tone} tone. Be sure to include the following elements: \
{required_elements}.";

/// Template interpolation for prompts.
///
/// Replaces each `{key}` with its value in a single left-to-right pass:
/// substituted text is never scanned again, so a value that itself
/// contains `{key}` is inserted literally. Unknown placeholders are kept.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substitution = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (*value, close))
        });
        match substitution {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// A loaded, ready-to-render prompt template.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    /// Lookup name.
    pub name: String,
    /// Version string (e.g. "1.0").
    pub version: String,
    /// Maximum output tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Template text with `{key}` placeholders.
    pub text: String,
}

impl PromptTemplate {
    /// The built-in location description template with the given parameters.
    #[must_use]
    pub fn location_description(params: GenerationParams) -> Self {
        Self {
            name: DEFAULT_TEMPLATE_NAME.into(),
            version: "builtin".into(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            text: LOCATION_DESCRIPTION.into(),
        }
    }

    /// Generation parameters for this template.
    #[must_use]
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Render with the given variables.
    #[must_use]
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        render_template(&self.text, vars)
    }
}

/// Resolves template names to templates.
pub trait TemplateSource: Send + Sync {
    /// Look up `name`.
    ///
    /// # Errors
    ///
    /// [`LlmError::TemplateNotFound`] if no such template exists.
    fn resolve(&self, name: &str) -> Result<PromptTemplate, LlmError>;
}

/// `[prompt]` table of a template file.
#[derive(Debug, Clone, Deserialize)]
struct TomlPromptFile {
    prompt: TomlPromptData,
}

#[derive(Debug, Clone, Deserialize)]
struct TomlPromptData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_temperature")]
    temperature: f32,
    text: String,
}

fn default_version() -> String { "1.0".to_string() }
fn default_max_tokens() -> u32 { GenerationParams::default().max_tokens }
fn default_temperature() -> f32 { GenerationParams::default().temperature }

// ---------------------------------------------------------------------------
// PromptEngine
// ---------------------------------------------------------------------------

/// Named collection of prompt templates.
///
/// ```
/// use fable_llm::prompt::{PromptEngine, DEFAULT_TEMPLATE_NAME};
///
/// let engine = PromptEngine::builtin();
/// let prompt = engine
///     .render(
///         DEFAULT_TEMPLATE_NAME,
///         &[("memory_log", ""), ("location_type", "cave"), ("tone", "eerie"), ("required_elements", "bats")],
///     )
///     .expect("built-in template");
/// assert!(prompt.starts_with("Generate a detailed description of a cave"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PromptEngine {
    templates: HashMap<String, PromptTemplate>,
}

impl PromptEngine {
    /// Engine holding only the built-in template with default parameters.
    #[must_use]
    pub fn builtin() -> Self {
        Self::builtin_with(GenerationParams::default())
    }

    /// Engine holding only the built-in template with `params`.
    #[must_use]
    pub fn builtin_with(params: GenerationParams) -> Self {
        let mut engine = Self::default();
        engine.insert(PromptTemplate::location_description(params));
        engine
    }

    /// Built-in template (parameters from config) plus everything in
    /// `template_dir`, if set. Files override the built-in by name.
    ///
    /// # Errors
    ///
    /// [`LlmError::Template`] if the directory cannot be loaded.
    pub fn from_config(config: &NarrativeConfig) -> Result<Self, LlmError> {
        let mut engine = Self::builtin_with(GenerationParams::from_config(config));
        if let Some(dir) = &config.template_dir {
            for template in Self::from_directory(dir)?.templates.into_values() {
                engine.insert(template);
            }
        }
        Ok(engine)
    }

    /// Load every `*.toml` file in `dir`.
    ///
    /// # Errors
    ///
    /// [`LlmError::Template`] if the directory cannot be read, a file
    /// fails to parse, or no templates are found.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self, LlmError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| LlmError::Template(format!("failed to read {}: {e}", dir.display())))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| LlmError::Template(format!("failed to read {}: {e}", dir.display())))?
                .path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut engine = Self::default();
        for path in paths {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| LlmError::Template(format!("failed to read {}: {e}", path.display())))?;
            let parsed: TomlPromptFile = toml::from_str(&content)
                .map_err(|e| LlmError::Template(format!("failed to parse {}: {e}", path.display())))?;

            let d = parsed.prompt;
            let name = d.name.unwrap_or_else(|| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            debug!(template = %name, version = %d.version, "Loaded prompt template");
            engine.insert(PromptTemplate {
                name,
                version: d.version,
                max_tokens: d.max_tokens,
                temperature: d.temperature,
                text: d.text,
            });
        }

        if engine.is_empty() {
            return Err(LlmError::Template(format!(
                "no prompt templates found in directory: {}",
                dir.display()
            )));
        }
        Ok(engine)
    }

    /// Add or replace a template.
    pub fn insert(&mut self, template: PromptTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Get a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.templates.get(name)
    }

    /// Render a named template.
    ///
    /// # Errors
    ///
    /// [`LlmError::TemplateNotFound`] if `name` is not loaded.
    pub fn render(&self, name: &str, vars: &[(&str, &str)]) -> Result<String, LlmError> {
        self.get(name)
            .map(|tpl| tpl.render(vars))
            .ok_or_else(|| LlmError::TemplateNotFound(name.to_string()))
    }

    /// Number of loaded templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no templates are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Names of all loaded templates, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl TemplateSource for PromptEngine {
    fn resolve(&self, name: &str) -> Result<PromptTemplate, LlmError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| LlmError::TemplateNotFound(name.to_string()))
    }
}
