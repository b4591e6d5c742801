//! Domain model: secrets and their data items
//!
//! A [`Secret`] is built fresh from every notification and dropped once the
//! notification is handled. Nothing here touches the filesystem.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use injector_fs::Digest;

use crate::manifest::ManifestEntry;
use crate::{Error, Result};

/// Annotation naming the directory a secret is materialized into.
pub const DEFAULT_PATH_ANNOTATION: &str = "secret-injector/path";

/// Identity of a secret in the source store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretId {
    pub namespace: Option<String>,
    pub name: String,
}

impl SecretId {
    pub fn new(namespace: Option<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.filter(|ns| !ns.is_empty()),
            name: name.into(),
        }
    }
}

impl fmt::Display for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}/{}", namespace, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// One key/payload pair of a secret, materialized as one file.
#[derive(Debug, Clone)]
pub struct DataItem {
    key: String,
    value: Vec<u8>,
    digest: OnceLock<Digest>,
}

impl DataItem {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            digest: OnceLock::new(),
        }
    }

    /// File name of this item beneath the secret's target path.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Digest of the payload, computed on first use and cached.
    pub fn digest(&self) -> &Digest {
        self.digest.get_or_init(|| Digest::of(&self.value))
    }
}

impl PartialEq for DataItem {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value
    }
}

impl Eq for DataItem {}

/// A secret ready to be materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    id: SecretId,
    path: Option<PathBuf>,
    items: Vec<DataItem>,
}

impl Secret {
    /// Build a secret. Items are ordered by key; an empty path counts as
    /// absent and is only rejected once the secret is synced.
    pub fn new<K, V>(
        id: SecretId,
        path: Option<PathBuf>,
        data: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let ordered: BTreeMap<String, Vec<u8>> = data
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        Self {
            id,
            path: path.filter(|p| !p.as_os_str().is_empty()),
            items: ordered
                .into_iter()
                .map(|(key, value)| DataItem::new(key, value))
                .collect(),
        }
    }

    /// Build a secret from a secret list record and the data fetched for it.
    ///
    /// When the record names `keys`, only those are kept and each must be
    /// present in `data`.
    pub fn from_manifest_entry(
        entry: &ManifestEntry,
        mut data: BTreeMap<String, Vec<u8>>,
    ) -> Result<Self> {
        let id = entry.id();
        if !entry.keys.is_empty() {
            let mut selected = BTreeMap::new();
            for key in &entry.keys {
                let value = data.remove(key).ok_or_else(|| Error::MissingKey {
                    secret: id.clone(),
                    key: key.clone(),
                })?;
                selected.insert(key.clone(), value);
            }
            data = selected;
        }
        Ok(Self::new(id, Some(entry.path.clone()), data))
    }

    pub fn id(&self) -> &SecretId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.id.namespace.as_deref()
    }

    /// The configured target directory, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The target directory, or [`Error::MissingPath`].
    pub fn target_path(&self, annotation: &str) -> Result<&Path> {
        self.path().ok_or_else(|| Error::MissingPath {
            secret: self.id.clone(),
            annotation: annotation.to_string(),
        })
    }

    pub fn items(&self) -> &[DataItem] {
        &self.items
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(DataItem::key)
    }
}
