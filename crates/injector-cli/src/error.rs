//! Error types for injector-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from injector-core
    #[error(transparent)]
    Core(#[from] injector_core::Error),

    /// Error from injector-fs
    #[error(transparent)]
    Fs(#[from] injector_fs::Error),

    /// Error talking to the cluster
    #[error(transparent)]
    Kube(#[from] injector_kube::KubeError),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    /// A blocking task panicked
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
