//! Error types for nestwatch-store.

use std::path::PathBuf;

/// Result type for nestwatch-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in nestwatch-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A stored sample could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The history key is not usable.
    #[error("Invalid history key: {0:?}")]
    InvalidKey(String),

    /// Database was written by a newer schema than this build understands.
    #[error("Unsupported schema version {found} (this build supports up to {supported})")]
    UnsupportedSchema { found: i32, supported: i32 },
}
