//! Error types for the repository layer.

use thiserror::Error;

/// Errors that can occur in repository operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    #[error("key pair generation failed: {0}")]
    KeyGeneration(String),

    #[error("private key serialization failed: {0}")]
    KeySerialization(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("peer id mismatch: config has {configured}, key derives {derived}")]
    PeerIdMismatch { configured: String, derived: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("repository is closed")]
    Closed,
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RepoError>;
