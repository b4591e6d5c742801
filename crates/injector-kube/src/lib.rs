//! Kubernetes integration for the secret injector
//!
//! - [`client`]: cluster configuration lookup (explicit kubeconfig, default
//!   kubeconfig, in-cluster)
//! - [`KubeSecretFeed`]: a [`ChangeFeed`](injector_core::ChangeFeed) over a
//!   label-filtered secret watch
//! - [`fetch_manifest_secrets`]: one-shot lookup of secret list records

pub mod cache;
pub mod client;
pub mod error;
pub mod feed;
pub mod fetch;

pub use cache::SecretCache;
pub use client::{connect, load_config};
pub use error::{KubeError, KubeResult};
pub use feed::{KubeSecretFeed, WatchScope};
pub use fetch::{FetchedSecret, fetch_manifest_secrets};
