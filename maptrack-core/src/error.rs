//! Error types for maptrack-core

use thiserror::Error;

/// Main error type for the maptrack-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Persistence backend error
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error for store blobs
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Store-internal error (lock poisoning, closed write queue)
    #[error("store error: {0}")]
    Store(String),
}

/// Result type alias for maptrack-core
pub type Result<T> = std::result::Result<T, Error>;
