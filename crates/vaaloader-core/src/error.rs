//! Error types for VAA decoding and persistence.

use thiserror::Error;

/// Errors that can occur while decoding a single VAA.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("VAA too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("Unsupported VAA version {0}")]
    UnsupportedVersion(u8),

    #[error("VAA truncated while reading {field}")]
    Truncated { field: &'static str },
}

/// Errors from a `VaaRepository` backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Upsert of '{id}' failed: {reason}")]
    Write { id: String, reason: String },

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl StorageError {
    /// Returns `true` if the backend could not be reached at all.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}
