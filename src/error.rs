//! Error handling shared by the infrastructure seams of every example
//!
//! Business rules report failures through their own enums (see each
//! pattern module) whose `Display` is the human-readable reason. This module
//! covers the collaborators that touch the outside world:
//! - File and JSON storage
//! - SQLite connections
//! - HTTP sessions
//! - Lifecycle misuse (using a connection before `connect()`)
//! - Failures reported by injected collaborators

use serde::Serialize;
use strum::Display;

/// Result alias for infrastructure operations
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// ERROR CATEGORIES
// =============================================================================

/// Coarse grouping used as a structured logging field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Io,
    Serialization,
    Database,
    Network,
    Lifecycle,
    Collaborator,
}

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Failure raised by a storage, network or lifecycle seam
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A resource was used before its explicit `connect()` step
    #[error("{resource} not connected")]
    NotConnected { resource: &'static str },

    /// Failure reported verbatim by an injected collaborator
    #[error("{0}")]
    Collaborator(String),
}

impl Error {
    /// Shorthand for collaborator-reported failures, mostly used by fakes
    pub fn collaborator(message: impl Into<String>) -> Self {
        Error::Collaborator(message.into())
    }

    pub fn not_connected(resource: &'static str) -> Self {
        Error::NotConnected { resource }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Io(_) => ErrorCategory::Io,
            Error::Json(_) => ErrorCategory::Serialization,
            Error::Database(_) => ErrorCategory::Database,
            Error::Http(_) => ErrorCategory::Network,
            Error::NotConnected { .. } => ErrorCategory::Lifecycle,
            Error::Collaborator(_) => ErrorCategory::Collaborator,
        }
    }
}
