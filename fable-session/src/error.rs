//! Session error types.

use fable_core::CoreError;
use thiserror::Error;

/// Errors surfaced by [`crate::Session`].
///
/// Generation problems never appear here: the narrative pipeline always
/// recovers with fallback text.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A world operation failed, usually a graph integrity violation.
    #[error("World error: {0}")]
    World(#[from] CoreError),

    /// A world definition file is malformed or inconsistent.
    #[error("Invalid world definition: {0}")]
    Definition(String),
}

impl SessionError {
    /// Whether this should be reported to the player as an internal error
    /// (corrupt state or a bug) rather than a content problem.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        match self {
            Self::World(e) => e.is_integrity_violation() || matches!(e, CoreError::Database(_)),
            Self::Definition(_) => false,
        }
    }
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
