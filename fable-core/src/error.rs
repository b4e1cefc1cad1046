//! Error types for the fable core library.

use thiserror::Error;

/// Top-level error type for all fable core operations.
///
/// The graph variants (`DuplicateNode`, `UnknownNode`, `UnknownTransition`)
/// indicate a caller bug or corrupt state and are never recovered locally.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A node with this id is already present in the graph.
    #[error("Node '{0}' already exists")]
    DuplicateNode(String),

    /// A node with this id does not exist in the graph.
    #[error("Node '{0}' does not exist")]
    UnknownNode(String),

    /// The node or the named exit on it does not exist.
    #[error("Transition '{exit}' from node '{from}' does not exist")]
    UnknownTransition {
        /// Source node id.
        from: String,
        /// Exit name that was looked up.
        exit: String,
    },

    /// The node is the player's current location and cannot be removed.
    #[error("Node '{0}' is the current location")]
    OccupiedNode(String),

    /// The item is not held by the player (or not present at the location).
    #[error("Item '{0}' is not available")]
    UnknownItem(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether this error is a graph integrity violation.
    #[must_use]
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateNode(_)
                | Self::UnknownNode(_)
                | Self::UnknownTransition { .. }
                | Self::OccupiedNode(_)
        )
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, CoreError>;
