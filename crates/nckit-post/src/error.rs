//! Error types for the post-processor crate.
//!
//! Only structural problems are errors here. Degraded output (empty
//! programs, missing feeds, unsupported five-axis modes) is reported
//! through the warnings of a [`crate::PostOutput`].

use std::io;
use thiserror::Error;

/// Errors that can occur while configuring or running the post-processor.
#[derive(Error, Debug)]
pub enum PostError {
    /// The controller name does not match any dialect.
    #[error("Unknown controller dialect: {0}")]
    UnknownDialect(String),

    /// A post configuration value is out of range.
    #[error("Invalid post config '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    /// Writing the program to its sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PostError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for post-processor operations.
pub type PostResult<T> = Result<T, PostError>;
