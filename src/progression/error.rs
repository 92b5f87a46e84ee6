//! Error taxonomy for the progression engine
//!
//! Unique-constraint races (a concurrent daily claim, a badge unlocked
//! twice) are deliberately NOT errors here: they are translated into
//! idempotent "already done" results at the call site. Only the advisory
//! marker stores fail closed; durable-store failures surface as
//! `Database` so callers can retry.

use std::path::PathBuf;

/// Engine-level error type
#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    /// Unknown user or badge key
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed input (unknown action type, unknown leaderboard category,
    /// out-of-range amounts)
    #[error("invalid input: {0}")]
    Validation(String),

    /// The local marker store (advisory cache layer) is inaccessible
    #[error("marker store unavailable: {path}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Durable store failure - retryable, never interpreted as "already claimed"
    #[error("database error")]
    Database(#[from] rusqlite::Error),

    /// Marker file held something that is not a JSON object
    #[error("corrupt marker file: {0}")]
    CorruptMarkers(#[from] serde_json::Error),
}

pub type Result<T, E = ProgressionError> = std::result::Result<T, E>;

impl ProgressionError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
