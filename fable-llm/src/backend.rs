//! The generation-backend contract.

use std::future::Future;

use crate::error::LlmError;
use crate::types::GenerationParams;

/// Anything that turns a rendered prompt into text.
///
/// Implementations may suspend on network I/O and need not apply a timeout
/// of their own; [`crate::NarrativeGenerator`] wraps every call and treats
/// any error, including its own timeout, as a backend failure.
pub trait GenerationBackend: Send + Sync {
    /// Generate text for `prompt`.
    ///
    /// # Errors
    ///
    /// Any provider failure.
    fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}
