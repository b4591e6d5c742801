//! Format-agnostic document loading

use std::fmt;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::{Error, Result, io};

/// Document formats understood by [`ConfigStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
    Yaml,
}

impl Format {
    /// Detect the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_string_lossy().to_lowercase();
        match extension.as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        })
    }
}

/// Format-agnostic document store.
///
/// Detects the format from the file extension and deserializes
/// transparently. Used for both the injector config and secret lists.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Load a document from a file.
    ///
    /// Format is detected from file extension:
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    /// - `.yaml`, `.yml` -> YAML
    ///
    /// A missing file yields [`Error::NotFound`]; nothing is defaulted.
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let format = Format::from_path(path).ok_or_else(|| Error::UnsupportedFormat {
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default(),
        })?;
        self.load_as(path, format)
    }

    /// Load a document in an explicit format, ignoring the extension.
    pub fn load_as<T: DeserializeOwned>(&self, path: &Path, format: Format) -> Result<T> {
        let content = io::read_text(path)?;
        let parse_error = |message: String| Error::ConfigParse {
            path: path.to_path_buf(),
            format: format.to_string(),
            message,
        };

        match format {
            Format::Toml => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
            Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
            Format::Yaml => serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string())),
        }
    }
}
