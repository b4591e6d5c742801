//! Injector configuration
//!
//! Every field has a default, so an absent config file and an empty one
//! behave the same. CLI flags are applied on top by the binary.

use std::path::Path;
use std::time::Duration;

use injector_fs::{ConfigStore, RobustnessConfig, WriteOptions};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::model::DEFAULT_PATH_ANNOTATION;

/// Label selector applied to the watch when none is configured.
pub const DEFAULT_LABEL_SELECTOR: &str = "secret-injector/enabled=true";

/// Runtime configuration of the injector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InjectorConfig {
    /// Annotation holding a secret's target directory
    pub path_annotation: String,
    /// Label selector restricting which secrets are watched
    pub label_selector: Option<String>,
    /// Namespace to watch; all namespaces when unset
    pub namespace: Option<String>,
    /// Permission bits of materialized files
    pub file_mode: u32,
    /// Permission bits of created directories
    pub dir_mode: u32,
    /// Flush each file to disk before it replaces the previous version
    pub fsync: bool,
    pub lock_timeout_ms: u64,
    /// Re-deliver every cached secret at this interval
    pub resync_interval_secs: Option<u64>,
    /// Give up if the initial listing takes longer than this
    pub sync_timeout_secs: Option<u64>,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        let write = WriteOptions::default();
        Self {
            path_annotation: DEFAULT_PATH_ANNOTATION.to_string(),
            label_selector: Some(DEFAULT_LABEL_SELECTOR.to_string()),
            namespace: None,
            file_mode: write.file_mode,
            dir_mode: write.dir_mode,
            fsync: write.robustness.enable_fsync,
            lock_timeout_ms: write.robustness.lock_timeout.as_millis() as u64,
            resync_interval_secs: None,
            sync_timeout_secs: None,
        }
    }
}

impl InjectorConfig {
    /// Load configuration from a TOML, JSON or YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let config = ConfigStore::new().load(path)?;
        tracing::debug!(path = %path.display(), "Loaded injector config");
        Ok(config)
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            file_mode: self.file_mode,
            dir_mode: self.dir_mode,
            robustness: RobustnessConfig {
                lock_timeout: Duration::from_millis(self.lock_timeout_ms),
                enable_fsync: self.fsync,
            },
        }
    }

    pub fn resync_interval(&self) -> Option<Duration> {
        self.resync_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn sync_timeout(&self) -> Option<Duration> {
        self.sync_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_write_options() {
        let config = InjectorConfig::default();
        assert_eq!(config.write_options(), WriteOptions::default());
        assert_eq!(config.path_annotation, DEFAULT_PATH_ANNOTATION);
        assert_eq!(config.resync_interval(), None);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("injector.toml");
        fs::write(
            &path,
            "file_mode = 0o600\nresync_interval_secs = 30\nnamespace = \"apps\"\n",
        )
        .unwrap();

        let config = InjectorConfig::load(&path).unwrap();
        assert_eq!(config.file_mode, 0o600);
        assert_eq!(config.dir_mode, 0o755);
        assert_eq!(config.namespace.as_deref(), Some("apps"));
        assert_eq!(config.resync_interval(), Some(Duration::from_secs(30)));
        assert_eq!(config.path_annotation, DEFAULT_PATH_ANNOTATION);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("injector.json");
        fs::write(&path, r#"{"file_mdoe": 384}"#).unwrap();

        assert!(InjectorConfig::load(&path).is_err());
    }

    #[test]
    fn zero_intervals_disable_timers() {
        let config = InjectorConfig {
            resync_interval_secs: Some(0),
            sync_timeout_secs: Some(0),
            ..InjectorConfig::default()
        };
        assert_eq!(config.resync_interval(), None);
        assert_eq!(config.sync_timeout(), None);
    }
}
