//! Resolving secret list records against the cluster

use std::collections::BTreeMap;

use injector_core::{ManifestEntry, Secret, SecretsManifest};
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret as KubeSecret;
use kube::{Api, Client};

use crate::error::{KubeError, KubeResult};

/// A secret list record and what fetching it produced.
#[derive(Debug)]
pub struct FetchedSecret {
    pub entry: ManifestEntry,
    pub result: KubeResult<Secret>,
}

/// Fetch every record of `manifest`.
///
/// Records without a namespace use the client's default namespace. One
/// record failing does not stop the others.
pub async fn fetch_manifest_secrets(client: &Client, manifest: &SecretsManifest) -> Vec<FetchedSecret> {
    let mut fetched = Vec::with_capacity(manifest.len());
    for entry in manifest.iter() {
        let result = fetch_entry(client, entry).await;
        if let Err(e) = &result {
            tracing::warn!(secret = %entry.id(), error = %e, "Failed to fetch secret");
        }
        fetched.push(FetchedSecret {
            entry: entry.clone(),
            result,
        });
    }
    fetched
}

async fn fetch_entry(client: &Client, entry: &ManifestEntry) -> KubeResult<Secret> {
    let api: Api<KubeSecret> = match &entry.namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::default_namespaced(client.clone()),
    };

    let object = match api.get(&entry.name).await {
        Ok(object) => object,
        Err(kube::Error::Api(err)) if err.code == 404 => {
            return Err(KubeError::SecretNotFound {
                secret: entry.id().to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    tracing::debug!(secret = %entry.id(), "Fetched secret");

    Ok(Secret::from_manifest_entry(entry, secret_data(object))?)
}

fn secret_data(object: KubeSecret) -> BTreeMap<String, Vec<u8>> {
    object
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|(key, ByteString(value))| (key, value))
        .collect()
}
