//! Atomic I/O operations with file locking

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use backoff::ExponentialBackoff;
use fs2::FileExt;

use crate::{Error, Result};

/// Distinguishes temp files created by concurrent writers in one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Knobs for lock acquisition and durability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobustnessConfig {
    /// How long to keep retrying the advisory lock on the temp file
    pub lock_timeout: Duration,
    /// Whether to fsync the temp file before it replaces the target
    pub enable_fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            enable_fsync: true,
        }
    }
}

/// Options applied to every materialized file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Permission bits of written files (unix only)
    pub file_mode: u32,
    /// Permission bits of created directories (unix only)
    pub dir_mode: u32,
    pub robustness: RobustnessConfig,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            file_mode: 0o644,
            dir_mode: 0o755,
            robustness: RobustnessConfig::default(),
        }
    }
}

/// Read the full content of a file.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::from_read(path, e))
}

/// Read text content from a file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::from_read(path, e))
}

/// Create `path` and all missing parents. Existing directories are fine.
pub fn create_dir_all(path: &Path, mode: u32) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    builder.create(path).map_err(|e| Error::io(path, e))
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so readers observe either the old or
/// the new content, never a mix. Parent directories are created first.
/// The temp file is removed again if any step fails.
pub fn write_atomic(path: &Path, content: &[u8], options: &WriteOptions) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent, options.dir_mode)?;
    }

    let temp_path = temp_path_for(path);
    let result = write_temp(&temp_path, path, content, options)
        .and_then(|()| fs::rename(&temp_path, path).map_err(|e| Error::io(path, e)));

    if result.is_err() {
        // Best effort: the temp file may never have been created.
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Remove a file. Returns `false` if it was already gone.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Remove a directory only if it exists and holds no entries.
///
/// Returns `true` when the directory was removed.
pub fn remove_dir_if_empty(path: &Path) -> Result<bool> {
    let mut entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(Error::io(path, e)),
    };
    if entries.next().is_some() {
        return Ok(false);
    }

    match fs::remove_dir(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Remove temp files an interrupted [`write_atomic`] of `path` left behind.
///
/// Must not race with a live writer of the same path.
pub fn remove_stale_temp_files(path: &Path) -> Result<usize> {
    let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
        return Ok(0);
    };
    let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
    let prefix = format!(".{}.", name.to_string_lossy());

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(Error::io(dir, e)),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if is_temp_name_for(&file_name, &prefix) && remove_file_if_exists(&entry.path())? {
            tracing::debug!(path = %entry.path().display(), "Removed stale temp file");
            removed += 1;
        }
    }
    Ok(removed)
}

/// Matches `.{name}.{pid}.{counter}.tmp` exactly, so `.{name}.old.1.2.tmp`
/// belonging to a different file is left alone.
fn is_temp_name_for(file_name: &str, prefix: &str) -> bool {
    file_name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(".tmp"))
        .is_some_and(is_pid_and_counter)
}

/// Whether `file_name` has the shape of a temp file [`write_atomic`] creates
/// for any target.
pub(crate) fn is_temp_file_name(file_name: &str) -> bool {
    let Some(rest) = file_name
        .strip_prefix('.')
        .and_then(|rest| rest.strip_suffix(".tmp"))
    else {
        return false;
    };
    let mut parts = rest.rsplitn(3, '.');
    let (Some(counter), Some(pid), Some(name)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !name.is_empty() && is_number(pid) && is_number(counter)
}

fn is_pid_and_counter(rest: &str) -> bool {
    rest.split_once('.')
        .is_some_and(|(pid, counter)| is_number(pid) && is_number(counter))
}

fn is_number(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

/// Temp files live next to the target so the rename stays on one filesystem.
fn temp_path_for(path: &Path) -> PathBuf {
    let temp_name = format!(
        ".{}.{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    path.with_file_name(temp_name)
}

fn write_temp(temp_path: &Path, target: &Path, content: &[u8], options: &WriteOptions) -> Result<()> {
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(temp_path)
        .map_err(|e| Error::io(temp_path, e))?;

    lock_exclusive(&temp_file, target, options.robustness.lock_timeout)?;

    temp_file
        .set_len(0)
        .map_err(|e| Error::io(temp_path, e))?;
    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .set_permissions(fs::Permissions::from_mode(options.file_mode))
            .map_err(|e| Error::io(temp_path, e))?;
    }

    if options.robustness.enable_fsync {
        temp_file
            .sync_all()
            .map_err(|e| Error::io(temp_path, e))?;
    }

    // The advisory lock is released when the handle closes.
    drop(temp_file);
    Ok(())
}

fn lock_exclusive(file: &File, target: &Path, timeout: Duration) -> Result<()> {
    let policy = ExponentialBackoff {
        initial_interval: Duration::from_millis(10),
        max_interval: Duration::from_millis(250),
        max_elapsed_time: Some(timeout),
        ..ExponentialBackoff::default()
    };

    backoff::retry(policy, || {
        file.try_lock_exclusive().map_err(backoff::Error::transient)
    })
    .map_err(|e| {
        tracing::warn!(path = %target.display(), error = %e, "Lock acquisition timed out");
        Error::LockFailed {
            path: target.to_path_buf(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_paths_are_unique_and_hidden() {
        let target = Path::new("/out/app/password");
        let a = temp_path_for(target);
        let b = temp_path_for(target);

        assert_ne!(a, b);
        assert_eq!(a.parent(), target.parent());
        let name = a.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(".password."));
        assert!(name.ends_with(".tmp"));
        assert!(is_temp_name_for(&name, ".password."));
    }

    #[test]
    fn temp_name_matching_is_exact() {
        assert!(is_temp_name_for(".password.42.0.tmp", ".password."));
        assert!(!is_temp_name_for(".password.old.42.0.tmp", ".password."));
        assert!(!is_temp_name_for(".password.42.tmp", ".password."));
        assert!(!is_temp_name_for("password.42.0.tmp", ".password."));
    }

    #[test]
    fn temp_file_shape_is_recognized_for_any_target() {
        assert!(is_temp_file_name(".password.42.0.tmp"));
        assert!(is_temp_file_name(".tls.crt.7.13.tmp"));
        assert!(!is_temp_file_name("..1.2.tmp"));
        assert!(!is_temp_file_name(".password.tmp"));
        assert!(!is_temp_file_name(".password.x.0.tmp"));
        assert!(!is_temp_file_name("password.1.2.tmp"));
    }

    #[test]
    fn stale_temp_files_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("password");
        fs::write(dir.path().join(".password.1.0.tmp"), "partial").unwrap();
        fs::write(dir.path().join(".password.old.1.0.tmp"), "other").unwrap();
        fs::write(&target, "kept").unwrap();

        assert_eq!(remove_stale_temp_files(&target).unwrap(), 1);
        assert!(!dir.path().join(".password.1.0.tmp").exists());
        assert!(dir.path().join(".password.old.1.0.tmp").exists());
        assert_eq!(fs::read_to_string(&target).unwrap(), "kept");
    }
}
