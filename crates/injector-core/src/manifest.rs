//! Declarative secret lists
//!
//! A secret list is a JSON (or YAML) array of records naming which secrets
//! to materialize and where:
//!
//! ```json
//! [{ "name": "db", "namespace": "prod", "path": "/run/secrets/db", "keys": ["password"] }]
//! ```
//!
//! Loading is all-or-nothing: a missing file, malformed document or
//! unusable record fails the whole load.

use std::path::{Path, PathBuf};

use injector_fs::{ConfigStore, Format, validate_key};
use serde::{Deserialize, Serialize};

use crate::model::SecretId;
use crate::{Error, Result};

/// One record of a secret list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
}

impl ManifestEntry {
    pub fn id(&self) -> SecretId {
        SecretId::new(self.namespace.clone(), self.name.clone())
    }

    fn validate(&self, index: usize) -> Result<()> {
        let invalid = |reason: String| Error::InvalidManifestEntry { index, reason };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty".into()));
        }
        if self.path.as_os_str().is_empty() {
            return Err(invalid(format!("path of {} is empty", self.id())));
        }
        for key in &self.keys {
            validate_key(key).map_err(|e| invalid(e.to_string()))?;
        }
        Ok(())
    }
}

/// An ordered list of [`ManifestEntry`] records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretsManifest {
    entries: Vec<ManifestEntry>,
}

impl SecretsManifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// Load a secret list from disk.
    ///
    /// `.yaml`/`.yml` files are read as YAML, everything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let format = match Format::from_path(path) {
            Some(Format::Yaml) => Format::Yaml,
            _ => Format::Json,
        };
        let manifest: Self = ConfigStore::new().load_as(path, format)?;
        manifest.validate()?;

        tracing::debug!(
            path = %path.display(),
            entries = manifest.len(),
            "Loaded secret list"
        );
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        self.entries
            .iter()
            .enumerate()
            .try_for_each(|(index, entry)| entry.validate(index))
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for SecretsManifest {
    type Item = ManifestEntry;
    type IntoIter = std::vec::IntoIter<ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
