//! Error types for the govsim core library.
//!
//! The engine itself is total: applying deltas, decaying memory, dispatching
//! actions and evaluating selectors never fail. These errors only surface at
//! the I/O and content boundaries.

use thiserror::Error;

/// Top-level error type for govsim operations that touch I/O or content.
#[derive(Error, Debug)]
pub enum SimError {
    /// Configuration could not be parsed or holds out-of-range values.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A save with the given id does not exist.
    #[error("Save not found: {0}")]
    SaveNotFound(String),

    /// Scenario content references a node that does not exist.
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// A choice index is out of range for the given node.
    #[error("Unknown choice {index} at node {node}")]
    UnknownChoice {
        /// Node the choice was requested at.
        node: String,
        /// Requested zero-based choice index.
        index: usize,
    },

    /// Scenario content is structurally invalid.
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for SimError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, SimError>;
