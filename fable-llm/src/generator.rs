//! Narrative generation pipeline.
//!
//! One call to [`NarrativeGenerator::generate`]:
//!
//! 1. resolve the prompt template (unknown names fall back to the built-in)
//! 2. render it with the memory log and the scene parameters
//! 3. derive the cache key from the rendered prompt
//! 4. on a cache hit, return the cached text without touching the backend
//! 5. otherwise call the backend; any error or timeout yields the fallback
//! 6. validate backend text against the required elements; a miss yields
//!    the fallback
//! 7. write the final text to the cache (failures are logged and dropped)
//! 8. append the final text to memory, if given
//!
//! Nothing in the pipeline can fail from the caller's point of view; the
//! worst outcome is the deterministic fallback text.

use std::time::Duration;

use tracing::{debug, error, warn};

use fable_core::config::NarrativeConfig;
use fable_core::memory::NarrativeMemory;

use crate::backend::GenerationBackend;
use crate::cache::{cache_key, NarrativeCache, NoCache};
use crate::error::LlmError;
use crate::prompt::{PromptEngine, PromptTemplate, TemplateSource};
use crate::types::GenerationParams;

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

/// Scene parameters for one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeRequest {
    /// Kind of place, e.g. "cave".
    pub location_type: String,
    /// Desired tone, e.g. "mysterious".
    pub tone: String,
    /// Comma-separated elements the text must mention.
    pub required_elements: String,
    /// Template name; `None` uses the configured default.
    pub template: Option<String>,
}

impl NarrativeRequest {
    /// Request using the default template.
    pub fn new(
        location_type: impl Into<String>,
        tone: impl Into<String>,
        required_elements: impl Into<String>,
    ) -> Self {
        Self {
            location_type: location_type.into(),
            tone: tone.into(),
            required_elements: required_elements.into(),
            template: None,
        }
    }

    /// Use a named template.
    #[must_use]
    pub fn with_template(mut self, name: impl Into<String>) -> Self {
        self.template = Some(name.into());
        self
    }
}

/// Why the fallback text was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The backend failed or timed out.
    BackendFailure,
    /// The backend text did not mention these required elements.
    ValidationFailure {
        /// Missing elements, trimmed and lowercased.
        missing: Vec<String>,
    },
}

/// Which path produced a narrative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrativeOrigin {
    /// Served from the cache.
    Cache,
    /// Generated and validated.
    Backend,
    /// Deterministic fallback text.
    Fallback(FallbackReason),
}

/// Result of [`NarrativeGenerator::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narrative {
    /// Final text, as returned to the player.
    pub text: String,
    /// How it was produced.
    pub origin: NarrativeOrigin,
    /// Cache key of the rendered prompt.
    pub cache_key: String,
}

impl Narrative {
    /// Whether the fallback text was used.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self.origin, NarrativeOrigin::Fallback(_))
    }
}

// ---------------------------------------------------------------------------
// Validation and fallback
// ---------------------------------------------------------------------------

/// Required elements not found in `text`, compared case-insensitively.
/// Empty entries (e.g. from `"a,,b"`) are ignored.
#[must_use]
pub fn missing_elements(text: &str, required_elements: &str) -> Vec<String> {
    let haystack = text.to_lowercase();
    required_elements
        .split(',')
        .map(|element| element.trim().to_lowercase())
        .filter(|element| !element.is_empty() && !haystack.contains(element.as_str()))
        .collect()
}

/// Whether `text` mentions every required element.
#[must_use]
pub fn validate_narrative(text: &str, required_elements: &str) -> bool {
    missing_elements(text, required_elements).is_empty()
}

/// Deterministic text used when generation fails. It quotes
/// `required_elements` verbatim, so it always passes [`validate_narrative`].
#[must_use]
pub fn fallback_narrative(location_type: &str, tone: &str, required_elements: &str) -> String {
    format!(
        "In this {location_type}, the ambiance is decidedly {tone}. While detailed descriptions \
         elude capture, essential elements such as {required_elements} are subtly suggested by \
         the surroundings."
    )
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Settings for [`NarrativeGenerator`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Consult and populate the cache.
    pub caching_enabled: bool,
    /// Timeout around each backend call.
    pub request_timeout: Option<Duration>,
    /// Template used when a request names none.
    pub default_template: String,
    /// Parameters of the built-in template.
    pub default_params: GenerationParams,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::from_config(&NarrativeConfig::default())
    }
}

impl GeneratorConfig {
    /// Settings from the `[narrative]` config section.
    #[must_use]
    pub fn from_config(config: &NarrativeConfig) -> Self {
        Self {
            caching_enabled: config.caching_enabled,
            request_timeout: config.request_timeout_ms.map(Duration::from_millis),
            default_template: config.default_template.clone(),
            default_params: GenerationParams::from_config(config),
        }
    }
}

/// Builds prompts, consults the cache, calls the backend, and validates.
pub struct NarrativeGenerator<B, C = NoCache> {
    backend: B,
    cache: C,
    templates: Box<dyn TemplateSource>,
    builtin: PromptTemplate,
    config: GeneratorConfig,
}

impl<B, C> std::fmt::Debug for NarrativeGenerator<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeGenerator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<B: GenerationBackend, C: NarrativeCache> NarrativeGenerator<B, C> {
    /// Generator using only the built-in template.
    pub fn new(backend: B, cache: C, config: GeneratorConfig) -> Self {
        let templates = PromptEngine::builtin_with(config.default_params);
        Self {
            backend,
            cache,
            templates: Box::new(templates),
            builtin: PromptTemplate::location_description(config.default_params),
            config,
        }
    }

    /// Generator configured from the `[narrative]` section, loading
    /// `template_dir` if set.
    ///
    /// # Errors
    ///
    /// [`LlmError::Template`] if the template directory cannot be loaded.
    pub fn from_config(backend: B, cache: C, config: &NarrativeConfig) -> Result<Self, LlmError> {
        let templates = PromptEngine::from_config(config)?;
        Ok(Self::new(backend, cache, GeneratorConfig::from_config(config))
            .with_templates(templates))
    }

    /// Replace the template source. The built-in template remains the
    /// fallback for names the source cannot resolve.
    #[must_use]
    pub fn with_templates(mut self, source: impl TemplateSource + 'static) -> Self {
        self.templates = Box::new(source);
        self
    }

    /// The generation backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Active settings.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Produce narrative text for `request`. If `memory` is given, its log
    /// is rendered into the prompt and the final text is appended to it.
    pub async fn generate(
        &self,
        request: &NarrativeRequest,
        memory: Option<&mut NarrativeMemory>,
    ) -> Narrative {
        let template = self.resolve_template(request.template.as_deref());
        let memory_log = memory.as_deref().map(NarrativeMemory::log).unwrap_or_default();
        let prompt = template.render(&[
            ("memory_log", memory_log.as_str()),
            ("location_type", request.location_type.as_str()),
            ("tone", request.tone.as_str()),
            ("required_elements", request.required_elements.as_str()),
        ]);
        let key = cache_key(&prompt);

        let cached = if self.config.caching_enabled {
            self.cached(&key).await
        } else {
            None
        };

        let (text, origin) = match cached {
            Some(text) => {
                debug!(cache_key = %key, "Using cached narrative");
                (text, NarrativeOrigin::Cache)
            }
            None => {
                let (text, origin) = self.produce(request, &prompt, template.params()).await;
                if self.config.caching_enabled {
                    if let Err(e) = self.cache.set(&key, text.as_bytes().to_vec()).await {
                        error!(cache_key = %key, error = %e, "Error storing narrative in cache");
                    }
                }
                (text, origin)
            }
        };

        if let Some(memory) = memory {
            memory.add_event(text.clone());
        }

        Narrative {
            text,
            origin,
            cache_key: key,
        }
    }

    fn resolve_template(&self, name: Option<&str>) -> PromptTemplate {
        let name = name.unwrap_or(&self.config.default_template);
        match self.templates.resolve(name) {
            Ok(template) => template,
            Err(e) => {
                warn!(template = name, error = %e, "Falling back to built-in template");
                self.builtin.clone()
            }
        }
    }

    /// Cached text for `key`. Unreachable caches, empty values, and values
    /// that are not UTF-8 all count as misses.
    async fn cached(&self, key: &str) -> Option<String> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) if !bytes.is_empty() => match String::from_utf8(bytes) {
                Ok(text) => Some(text),
                Err(_) => {
                    warn!(cache_key = key, "Cached narrative is not UTF-8, ignoring");
                    None
                }
            },
            Ok(_) => None,
            Err(e) => {
                warn!(cache_key = key, error = %e, "Cache lookup failed");
                None
            }
        }
    }

    /// Backend call plus validation, with fallback on either failing.
    async fn produce(
        &self,
        request: &NarrativeRequest,
        prompt: &str,
        params: GenerationParams,
    ) -> (String, NarrativeOrigin) {
        let fallback =
            || fallback_narrative(&request.location_type, &request.tone, &request.required_elements);

        let text = match self.call_backend(prompt, &params).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Narrative backend failed, using fallback");
                return (
                    fallback(),
                    NarrativeOrigin::Fallback(FallbackReason::BackendFailure),
                );
            }
        };

        let missing = missing_elements(&text, &request.required_elements);
        if missing.is_empty() {
            (text, NarrativeOrigin::Backend)
        } else {
            warn!(
                missing = ?missing,
                "Generated narrative failed validation, using fallback"
            );
            (
                fallback(),
                NarrativeOrigin::Fallback(FallbackReason::ValidationFailure { missing }),
            )
        }
    }

    async fn call_backend(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, LlmError> {
        let call = self.backend.generate(prompt, params);
        match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                LlmError::Timeout(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX))
            })?,
            None => call.await,
        }
    }
}
