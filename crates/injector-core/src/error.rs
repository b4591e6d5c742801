//! Error types for injector-core

use crate::model::SecretId;

/// Result type for injector-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in injector-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Secret carries no target directory
    #[error("Secret {secret} has no target path (annotation {annotation:?} is missing or empty)")]
    MissingPath { secret: SecretId, annotation: String },

    /// A key listed in a secret list is absent from the fetched secret
    #[error("Secret {secret} has no key {key:?}")]
    MissingKey { secret: SecretId, key: String },

    /// A change-feed payload could not be decoded as a secret
    #[error("Unexpected object shape: {reason}")]
    UnexpectedShape { reason: String },

    /// A secret list record is structurally valid JSON but unusable
    #[error("Invalid secret list entry #{index}: {reason}")]
    InvalidManifestEntry { index: usize, reason: String },

    /// The change-feed reported an error
    #[error("Change feed error: {message}")]
    Feed { message: String },

    /// The initial listing never completed
    #[error("Failed to sync cache: {reason}")]
    CacheSyncFailed { reason: String },

    /// A blocking filesystem task panicked or was cancelled
    #[error("Sync task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Filesystem error from injector-fs
    #[error(transparent)]
    Fs(#[from] injector_fs::Error),
}

impl Error {
    pub fn shape(reason: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            reason: reason.into(),
        }
    }
}
