//! [`TestOutput`]: a temporary root that secrets are materialized under.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory with assertion helpers for materialized files.
///
/// # Example
///
/// ```rust,no_run
/// use injector_test_utils::TestOutput;
///
/// let out = TestOutput::new();
/// let target = out.secret_dir("app");
/// // ... sync a secret into `target` ...
/// out.assert_file_content("app/password", "s3cr3t");
/// ```
pub struct TestOutput {
    temp_dir: TempDir,
}

impl Default for TestOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl TestOutput {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("TestOutput::new: failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of a (not yet created) target directory under the root.
    pub fn secret_dir(&self, name: &str) -> PathBuf {
        self.root().join(name)
    }

    /// Write a file relative to the root, creating parents.
    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("TestOutput::write: failed to create parent");
        }
        fs::write(&path, content).expect("TestOutput::write: failed to write file");
        path
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root().join(relative))
            .unwrap_or_else(|e| panic!("failed to read {relative}: {e}"))
    }

    pub fn assert_file_content(&self, relative: &str, expected: &str) {
        assert_eq!(self.read(relative), expected, "content of {relative}");
    }

    pub fn assert_exists(&self, relative: &str) {
        assert!(
            self.root().join(relative).exists(),
            "expected {relative} to exist"
        );
    }

    pub fn assert_not_exists(&self, relative: &str) {
        assert!(
            !self.root().join(relative).exists(),
            "expected {relative} to be absent"
        );
    }

    /// Names of hidden temp files left in `relative`.
    pub fn temp_files(&self, relative: &str) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.root().join(relative)) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with('.') && name.ends_with(".tmp"))
            .collect();
        names.sort();
        names
    }
}
