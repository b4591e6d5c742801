//! SyncEngine implementation
//!
//! The SyncEngine reconciles a [`Secret`] with the files beneath its target
//! path. It keeps no state of its own: whatever is on disk is taken as the
//! last written version.

use std::collections::BTreeSet;
use std::path::Path;

use injector_fs::{Digest, WriteOptions, io, item_path, validate_base, validate_key};

use crate::config::InjectorConfig;
use crate::model::{DEFAULT_PATH_ANNOTATION, DataItem, Secret};
use crate::Result;

use super::report::{
    CheckReport, DriftItem, ItemReport, RemovalReport, SecretReport, SyncOutcome,
};

/// Engine for materializing secrets onto the filesystem
#[derive(Debug, Clone)]
pub struct SyncEngine {
    options: WriteOptions,
    /// Annotation named in missing-path errors
    annotation: String,
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(WriteOptions::default())
    }
}

impl SyncEngine {
    pub fn new(options: WriteOptions) -> Self {
        Self {
            options,
            annotation: DEFAULT_PATH_ANNOTATION.to_string(),
        }
    }

    pub fn from_config(config: &InjectorConfig) -> Self {
        Self::new(config.write_options()).with_annotation(config.path_annotation.clone())
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = annotation.into();
        self
    }

    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Sync one data item into `base`.
    ///
    /// Returns [`SyncOutcome::Skipped`] without touching the filesystem when
    /// the file already holds content with the item's digest. A missing or
    /// unreadable file is rewritten.
    pub fn sync_item(&self, item: &DataItem, base: &Path) -> Result<SyncOutcome> {
        let path = item_path(base, item.key())?;

        match io::read_bytes(&path) {
            Ok(existing) if Digest::of(&existing) == *item.digest() => {
                tracing::debug!(path = %path.display(), "Content unchanged, skipping");
                return Ok(SyncOutcome::Skipped);
            }
            Ok(_) => tracing::debug!(path = %path.display(), "Content differs"),
            Err(injector_fs::Error::NotFound { .. }) => {
                tracing::debug!(path = %path.display(), "No existing file")
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Existing file unreadable, rewriting")
            }
        }

        io::write_atomic(&path, item.value(), &self.options)?;
        if let Err(e) = io::remove_stale_temp_files(&path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to clean up stale temp files");
        }

        tracing::info!(
            path = %path.display(),
            digest = %item.digest(),
            "Wrote secret item"
        );
        Ok(SyncOutcome::Written)
    }

    /// Sync every item of `secret`.
    ///
    /// Fails as a whole only if the secret has no target path; item
    /// failures are recorded in the report and do not stop the others.
    pub fn sync_secret(&self, secret: &Secret) -> Result<SecretReport> {
        let base = secret.target_path(&self.annotation)?;
        let mut report = SecretReport::new(secret.id().clone());

        for item in secret.items() {
            let result = self.sync_item(item, base);
            if let Err(e) = &result {
                tracing::error!(
                    secret = %secret.id(),
                    key = item.key(),
                    error = %e,
                    "Failed to sync secret item"
                );
            }
            report.items.push(ItemReport {
                key: item.key().to_string(),
                path: base.join(item.key()),
                result,
            });
        }

        tracing::debug!(
            secret = %secret.id(),
            written = report.written(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Synced secret"
        );
        Ok(report)
    }

    /// Compare `secret` with the filesystem without writing anything.
    pub fn check_secret(&self, secret: &Secret) -> CheckReport {
        let base = match secret.target_path(&self.annotation) {
            Ok(base) => base,
            Err(e) => return CheckReport::broken(e.to_string()),
        };

        let mut drifted = Vec::new();
        let mut missing = Vec::new();

        for item in secret.items() {
            let drift = |description: String| DriftItem {
                secret: secret.id().to_string(),
                key: item.key().to_string(),
                path: base.join(item.key()),
                description,
            };

            let path = match item_path(base, item.key()) {
                Ok(path) => path,
                Err(e) => {
                    drifted.push(drift(e.to_string()));
                    continue;
                }
            };

            match io::read_bytes(&path) {
                Ok(existing) => {
                    let actual = Digest::of(&existing);
                    if actual != *item.digest() {
                        drifted.push(drift(format!(
                            "Checksum mismatch: expected {}, got {}",
                            item.digest(),
                            actual
                        )));
                    }
                }
                Err(injector_fs::Error::NotFound { .. }) => {
                    missing.push(drift("File not found".to_string()));
                }
                Err(e) => missing.push(drift(format!("Failed to read file: {}", e))),
            }
        }

        CheckReport::from_items(drifted, missing)
    }

    /// Remove the files written for `keys` beneath `base`, then `base`
    /// itself if nothing else is left in it.
    ///
    /// Already-missing files and directories are not errors.
    pub fn remove_secret_artifacts<'a>(
        &self,
        base: &Path,
        keys: impl IntoIterator<Item = &'a str>,
    ) -> Result<RemovalReport> {
        validate_base(base)?;
        let mut report = RemovalReport::default();

        for key in keys {
            let result = item_path(base, key).and_then(|path| {
                let removed = io::remove_file_if_exists(&path)?;
                io::remove_stale_temp_files(&path)?;
                Ok((path, removed))
            });

            match result {
                Ok((path, true)) => {
                    tracing::info!(path = %path.display(), "Removed secret item");
                    report.removed.push(path);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(key, error = %e, "Failed to remove secret item");
                    report.errors.push((key.to_string(), e.into()));
                }
            }
        }

        report.directory_removed = io::remove_dir_if_empty(base)?;
        if report.directory_removed {
            tracing::info!(path = %base.display(), "Removed secret directory");
        }
        Ok(report)
    }

    /// Remove everything [`sync_secret`](Self::sync_secret) wrote for `secret`.
    pub fn remove_secret(&self, secret: &Secret) -> Result<RemovalReport> {
        let base = secret.target_path(&self.annotation)?;
        self.remove_secret_artifacts(base, secret.keys())
    }

    /// Remove the files an earlier version of a secret wrote that `current`
    /// no longer owns.
    ///
    /// Keys dropped from the secret lose their files. When the target path
    /// moved, every key of `previous` is removed from the old directory.
    /// Nothing happens unless both versions name a target path.
    pub fn remove_superseded(&self, previous: &Secret, current: &Secret) -> Result<RemovalReport> {
        let (Some(old_base), Some(new_base)) = (previous.path(), current.path()) else {
            return Ok(RemovalReport::default());
        };

        // Keys that never passed validation were never written.
        let written = previous.keys().filter(|key| validate_key(key).is_ok());

        if old_base != new_base {
            tracing::info!(
                from = %old_base.display(),
                to = %new_base.display(),
                "Secret target path moved"
            );
            return self.remove_secret_artifacts(old_base, written);
        }

        let kept: BTreeSet<&str> = current.keys().collect();
        let dropped: Vec<&str> = written.filter(|key| !kept.contains(key)).collect();
        if dropped.is_empty() {
            return Ok(RemovalReport::default());
        }
        tracing::debug!(keys = ?dropped, "Removing keys dropped from secret");
        self.remove_secret_artifacts(old_base, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SecretId;
    use crate::Error;
    use crate::sync::CheckStatus;
    use std::fs;
    use tempfile::TempDir;

    fn engine() -> SyncEngine {
        SyncEngine::new(WriteOptions {
            robustness: injector_fs::RobustnessConfig {
                enable_fsync: false,
                ..Default::default()
            },
            ..WriteOptions::default()
        })
    }

    #[test]
    fn invalid_key_is_error_not_skip() {
        let temp = TempDir::new().unwrap();
        let item = DataItem::new("../escape", "x");

        let result = engine().sync_item(&item, temp.path());
        assert!(matches!(
            result,
            Err(Error::Fs(injector_fs::Error::InvalidKey { .. }))
        ));
        assert!(!temp.path().parent().unwrap().join("escape").exists());
    }

    #[test]
    fn check_reports_missing_and_drifted() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("app");
        let secret = Secret::new(
            SecretId::new(None, "app"),
            Some(base.clone()),
            [("same", "1"), ("changed", "2"), ("absent", "3")],
        );
        fs::create_dir_all(&base).unwrap();
        fs::write(base.join("same"), "1").unwrap();
        fs::write(base.join("changed"), "old").unwrap();

        let report = engine().check_secret(&secret);
        assert_eq!(report.status, CheckStatus::Drifted);
        assert_eq!(report.drifted.len(), 1);
        assert_eq!(report.drifted[0].key, "changed");
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].key, "absent");

        // check never writes
        assert_eq!(fs::read_to_string(base.join("changed")).unwrap(), "old");
        assert!(!base.join("absent").exists());
    }

    #[test]
    fn check_without_path_is_broken() {
        let secret = Secret::new(SecretId::new(None, "app"), None, [("k", "v")]);
        let report = engine().check_secret(&secret);
        assert_eq!(report.status, CheckStatus::Broken);
    }

    #[test]
    fn superseded_keys_are_removed_and_shared_keys_kept() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("app");
        let previous = Secret::new(
            SecretId::new(None, "app"),
            Some(base.clone()),
            [("password", "1"), ("token", "2")],
        );
        let current = Secret::new(SecretId::new(None, "app"), Some(base.clone()), [("password", "3")]);
        let engine = engine();
        engine.sync_secret(&previous).unwrap();
        engine.sync_secret(&current).unwrap();

        let report = engine.remove_superseded(&previous, &current).unwrap();

        assert_eq!(report.removed, vec![base.join("token")]);
        assert!(!report.directory_removed);
        assert_eq!(fs::read_to_string(base.join("password")).unwrap(), "3");
    }

    #[test]
    fn superseded_without_path_is_noop() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("app");
        fs::create_dir_all(&base).unwrap();
        fs::write(base.join("token"), "2").unwrap();
        let previous = Secret::new(SecretId::new(None, "app"), Some(base.clone()), [("token", "2")]);
        let current = Secret::new(SecretId::new(None, "app"), None, [("password", "1")]);

        let report = engine().remove_superseded(&previous, &current).unwrap();

        assert!(report.removed.is_empty());
        assert!(base.join("token").exists());
    }

    #[test]
    fn remove_refuses_filesystem_root() {
        let result = engine().remove_secret_artifacts(Path::new("/"), ["passwd"]);
        assert!(matches!(
            result,
            Err(Error::Fs(injector_fs::Error::UnsafePath { .. }))
        ));
    }
}
