//! Ingestion settings.

use crate::error::{OracleError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Folder scanned for custom tables when none is configured.
pub const DEFAULT_ROOT_FOLDER: &str = "mythic-gme-tables";

/// Settings for loading custom tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Folder holding custom table files. Created if absent.
    pub root_folder: PathBuf,
    /// Whether built-in tables are registered alongside custom ones.
    pub include_builtins: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            root_folder: PathBuf::from(DEFAULT_ROOT_FOLDER),
            include_builtins: true,
        }
    }
}

impl IngestConfig {
    /// Load settings from a JSON file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| OracleError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&contents).map_err(|e| OracleError::Config {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Override the root folder.
    pub fn with_root_folder(mut self, root_folder: impl Into<PathBuf>) -> Self {
        self.root_folder = root_folder.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.root_folder, PathBuf::from("mythic-gme-tables"));
        assert!(config.include_builtins);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        write!(file, r#"{{"root_folder": "my-tables"}}"#).expect("Failed to write settings");

        let config = IngestConfig::load(file.path()).unwrap();
        assert_eq!(config.root_folder, PathBuf::from("my-tables"));
        assert!(config.include_builtins);
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        write!(file, r#"{{"rootFolder": "x"}}"#).expect("Failed to write settings");

        let err = IngestConfig::load(file.path()).unwrap_err();
        assert_eq!(err.kind(), "Config");
    }
}
