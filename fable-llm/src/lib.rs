//! # fable-llm: Narrative Generation for Fable
//!
//! Turns a scene description (location type, tone, required elements) and
//! the session's narrative memory into prose:
//!
//! ```text
//! template ─► render(memory log, scene) ─► SHA-256 key ─► cache? ──hit──► text
//!                                                          │miss
//!                                                          ▼
//!                                     backend ─► validate ─► text | fallback
//!                                                          │
//!                                                          ▼
//!                                           cache write (best effort) ─► memory
//! ```
//!
//! Backends:
//!   - **Ollama** (local, default)
//!   - **OpenAI-compatible API**
//!   - **None**: every call falls back to the deterministic text
//!
//! The backend and the cache are collaborator traits
//! ([`GenerationBackend`], [`NarrativeCache`]) so tests and embedders can
//! supply their own.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod cache;
pub mod client;
pub mod error;
pub mod generator;
pub mod prompt;
pub mod types;

pub use backend::GenerationBackend;
pub use cache::{cache_key, LruNarrativeCache, NarrativeCache, NoCache};
pub use client::{LlmClient, LlmProvider};
pub use error::LlmError;
pub use generator::{
    fallback_narrative, validate_narrative, FallbackReason, GeneratorConfig, Narrative,
    NarrativeGenerator, NarrativeOrigin, NarrativeRequest,
};
pub use prompt::{PromptEngine, PromptTemplate, TemplateSource};
pub use types::{GenerationParams, LlmResponse};
