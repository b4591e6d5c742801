//! Cluster client loading
//!
//! Configuration is looked up in order:
//! 1. An explicitly given kubeconfig file
//! 2. The default kubeconfig (`KUBECONFIG` or `~/.kube/config`)
//! 3. The in-cluster service account
//!
//! An explicit path that cannot be loaded is an error; it never falls
//! through to the other sources.

use std::path::Path;

use kube::Client;
use kube::config::{Config, KubeConfigOptions, Kubeconfig};

use crate::error::{KubeError, KubeResult};

/// Resolve cluster configuration.
pub async fn load_config(kubeconfig: Option<&Path>) -> KubeResult<Config> {
    let options = KubeConfigOptions::default();

    if let Some(path) = kubeconfig {
        tracing::info!(path = %path.display(), "Loading kubeconfig");
        let kubeconfig = Kubeconfig::read_from(path).map_err(|e| KubeError::Config {
            message: format!("{}: {}", path.display(), e),
        })?;
        return Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .map_err(|e| KubeError::Config {
                message: format!("{}: {}", path.display(), e),
            });
    }

    match Config::from_kubeconfig(&options).await {
        Ok(config) => {
            tracing::info!("Loaded default kubeconfig");
            Ok(config)
        }
        Err(kubeconfig_err) => {
            tracing::info!(error = %kubeconfig_err, "No default kubeconfig, trying in-cluster config");
            Config::incluster().map_err(|e| KubeError::Config {
                message: format!(
                    "no kubeconfig ({}) and in-cluster config unavailable ({})",
                    kubeconfig_err, e
                ),
            })
        }
    }
}

/// Build a client from [`load_config`].
pub async fn connect(kubeconfig: Option<&Path>) -> KubeResult<Client> {
    let config = load_config(kubeconfig).await?;
    let client = Client::try_from(config)?;
    tracing::debug!(namespace = client.default_namespace(), "Kubernetes client initialized");
    Ok(client)
}
