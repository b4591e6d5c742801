//! Resolved runtime settings
//!
//! Merges the config file (if any) with command-line overrides. Flags
//! always win over file values.

use std::path::{Path, PathBuf};

use injector_core::InjectorConfig;

use crate::cli::WatchArgs;
use crate::error::Result;

/// Settings shared by every command
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub config: InjectorConfig,
    pub kubeconfig: Option<PathBuf>,
}

impl Context {
    /// Load the config file, or use defaults when none is given.
    pub fn load(config_path: Option<&Path>, kubeconfig: Option<PathBuf>) -> Result<Self> {
        let config = match config_path {
            Some(path) => InjectorConfig::load(path)?,
            None => InjectorConfig::default(),
        };
        Ok(Self { config, kubeconfig })
    }

    /// Apply `watch` flags on top of the loaded config.
    pub fn apply_watch_args(&mut self, args: &WatchArgs) {
        if let Some(namespace) = &args.namespace {
            self.config.namespace = Some(namespace.clone());
        }
        if args.all {
            self.config.label_selector = None;
        } else if let Some(selector) = &args.selector {
            self.config.label_selector = Some(selector.clone());
        }
        if let Some(secs) = args.resync_secs {
            self.config.resync_interval_secs = Some(secs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use injector_core::DEFAULT_LABEL_SELECTOR;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_config_file() {
        let ctx = Context::load(None, None).unwrap();
        assert_eq!(ctx.config, InjectorConfig::default());
    }

    #[test]
    fn test_flags_override_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("injector.toml");
        fs::write(&path, "namespace = \"from-file\"\nlabel_selector = \"a=b\"\n").unwrap();

        let mut ctx = Context::load(Some(&path), None).unwrap();
        ctx.apply_watch_args(&WatchArgs {
            namespace: Some("from-flag".into()),
            resync_secs: Some(60),
            ..WatchArgs::default()
        });

        assert_eq!(ctx.config.namespace.as_deref(), Some("from-flag"));
        assert_eq!(ctx.config.label_selector.as_deref(), Some("a=b"));
        assert_eq!(ctx.config.resync_interval_secs, Some(60));
    }

    #[test]
    fn test_all_clears_selector() {
        let mut ctx = Context::load(None, None).unwrap();
        assert_eq!(ctx.config.label_selector.as_deref(), Some(DEFAULT_LABEL_SELECTOR));

        ctx.apply_watch_args(&WatchArgs {
            all: true,
            ..WatchArgs::default()
        });
        assert_eq!(ctx.config.label_selector, None);
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(Context::load(Some(&temp.path().join("absent.toml")), None).is_err());
    }
}
