//! Error types for injector-kube

/// Result type alias for Kubernetes operations.
pub type KubeResult<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while talking to the cluster.
#[derive(Debug, thiserror::Error)]
pub enum KubeError {
    /// No usable cluster configuration was found
    #[error("Failed to load cluster configuration: {message}")]
    Config { message: String },

    #[error("Kubernetes API error: {message}")]
    Api { message: String },

    #[error("Secret not found: {secret}")]
    SecretNotFound { secret: String },

    /// A fetched secret could not be turned into a materializable secret
    #[error(transparent)]
    Core(#[from] injector_core::Error),
}

impl From<kube::Error> for KubeError {
    fn from(err: kube::Error) -> Self {
        KubeError::Api {
            message: err.to_string(),
        }
    }
}
