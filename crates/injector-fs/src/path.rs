//! Validation of data keys and target directories
//!
//! Data keys become file names directly beneath a secret's target
//! directory, so they must be a single plain path component.

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result, io};

/// Check that `key` is usable as a single file name.
///
/// Rejects empty keys, `.`/`..`, path separators and NUL bytes. Names
/// shaped like the temp files of an atomic write are refused as well, since
/// writing a sibling key would sweep them away as stale.
pub fn validate_key(key: &str) -> Result<()> {
    let reason = if key.is_empty() {
        Some("key is empty")
    } else if key == "." || key == ".." {
        Some("key is a relative directory reference")
    } else if key.contains('/') || key.contains('\\') {
        Some("key contains a path separator")
    } else if key.contains('\0') {
        Some("key contains a NUL byte")
    } else if io::is_temp_file_name(key) {
        Some("key has the shape of a temp file")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidKey {
            key: key.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Resolve the file path of a data item beneath `base`.
pub fn item_path(base: &Path, key: &str) -> Result<PathBuf> {
    validate_key(key)?;
    Ok(base.join(key))
}

/// Check that `base` is a directory we may remove artifacts from.
///
/// The filesystem root and the empty path are never valid targets.
pub fn validate_base(base: &Path) -> Result<()> {
    if base.as_os_str().is_empty() {
        return Err(Error::UnsafePath {
            path: base.to_path_buf(),
            reason: "path is empty".to_string(),
        });
    }
    let only_root = base
        .components()
        .all(|c| matches!(c, Component::RootDir | Component::Prefix(_)));
    if only_root {
        return Err(Error::UnsafePath {
            path: base.to_path_buf(),
            reason: "path is a filesystem root".to_string(),
        });
    }
    Ok(())
}
