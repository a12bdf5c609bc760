//! Error types for dyad-core

use thiserror::Error;

/// Main error type for the dyad-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two snapshots belong to different conversations
    #[error("fingerprint mismatch: {before} vs {after}")]
    FingerprintMismatch { before: String, after: String },
}

/// Result type alias for dyad-core
pub type Result<T> = std::result::Result<T, Error>;
