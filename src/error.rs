//! Oracle table error types.
//!
//! All errors are typed and provide root cause information. Table
//! validation problems are not errors in this sense: they are data
//! ([`crate::validate::ValidationError`]) collected in the ledger.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for oracle table operations.
#[derive(Error, Debug)]
pub enum OracleError {
    /// I/O error during file operations.
    #[error("I/O error for path {path}: {source}")]
    Io {
        /// The file path that caused the I/O error.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The table root folder could not be created or accessed.
    #[error("Cannot create table folder {path}: {source}")]
    FolderCreate {
        /// The folder that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("JSON error in {path}: {source}")]
    Json {
        /// The file being read or written.
        path: PathBuf,
        /// The underlying serde_json error.
        #[source]
        source: serde_json::Error,
    },

    /// The filesystem watcher could not be set up.
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// Invalid settings file.
    #[error("Invalid configuration: {message}")]
    Config {
        /// What is wrong with the configuration.
        message: String,
    },

    /// Table id not present in the registry.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Generic error with context.
    #[error("{0}")]
    Other(String),
}

impl OracleError {
    /// Stable identifier for this error kind, used in CLI payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            OracleError::Io { .. } => "Io",
            OracleError::FolderCreate { .. } => "FolderCreate",
            OracleError::Json { .. } => "Json",
            OracleError::Watch(_) => "Watch",
            OracleError::Config { .. } => "Config",
            OracleError::TableNotFound(_) => "TableNotFound",
            OracleError::Other(_) => "Other",
        }
    }

    /// File associated with this error, if any.
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            OracleError::Io { path, .. }
            | OracleError::FolderCreate { path, .. }
            | OracleError::Json { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Remediation hint for the user.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            OracleError::FolderCreate { .. } => {
                Some("Check that the parent directory exists and is writable, or pass --root")
            }
            OracleError::TableNotFound(_) => Some("Run `oracle-tables list` to see known table ids"),
            OracleError::Config { .. } => {
                Some("Settings files are JSON objects, e.g. {\"root_folder\": \"tables\"}")
            }
            _ => None,
        }
    }
}

/// Result type alias for oracle table operations.
pub type Result<T> = std::result::Result<T, OracleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_file_path() {
        let err = OracleError::FolderCreate {
            path: PathBuf::from("tables"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.kind(), "FolderCreate");
        assert_eq!(err.file_path(), Some(Path::new("tables")));
        assert!(err.hint().is_some());
        assert!(err.to_string().contains("tables"));
    }
}
