//! Error types for extraction operations.
//!
//! This module defines [`ExtractError`] which covers every failure that can occur
//! while parsing exhibit HTML, normalizing table content, loading rule tables, or
//! persisting learned patterns and artifacts.

use thiserror::Error;

/// Errors that can occur during extraction operations.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// A `<table>` element could not be turned into a grid.
    #[error("HTML error: {0}")]
    Html(String),

    /// Error parsing text into a typed value.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A table violates its structural invariants.
    #[error("Invalid table {table_id}: {reason}")]
    InvalidTable {
        /// Identifier of the offending table.
        table_id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A rule table or pipeline configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error interacting with the pattern store.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Filesystem error while reading input or writing artifacts.
    #[error("I/O error: {0}")]
    Io(String),

    /// Error serializing or deserializing JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The filing source collaborator failed.
    #[error("Filing source {source_name} failed: {message}")]
    Source {
        /// Name of the filing source.
        source_name: String,
        /// Failure description.
        message: String,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`ExtractError`].
pub type Result<T> = std::result::Result<T, ExtractError>;
