//! Per-file validation error ledger.
//!
//! Holds the errors from the most recent load attempt of every tracked
//! file. Entries only change through [`ErrorLedger::set_errors`] and
//! [`ErrorLedger::clear`], so what the ledger reports always matches the
//! last load of each file.

use crate::validate::ValidationError;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Validation errors keyed by file, in first-insertion order.
#[derive(Debug, Default, Clone)]
pub struct ErrorLedger {
    entries: IndexMap<PathBuf, Vec<ValidationError>>,
}

impl ErrorLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the errors recorded for `file`.
    ///
    /// An empty list is a no-op; use [`ErrorLedger::clear`] to drop a
    /// file's entry. A replaced file keeps its original position.
    pub fn set_errors(&mut self, file: &Path, errors: Vec<ValidationError>) {
        if errors.is_empty() {
            return;
        }
        self.entries.insert(file.to_path_buf(), errors);
    }

    /// Remove the entry for `file`. Returns whether one existed.
    pub fn clear(&mut self, file: &Path) -> bool {
        self.entries.shift_remove(file).is_some()
    }

    /// Remove every entry.
    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    /// Errors recorded for `file`.
    pub fn errors_for(&self, file: &Path) -> &[ValidationError] {
        self.entries.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All errors, files in insertion order then per-file order.
    pub fn all_errors(&self) -> Vec<ValidationError> {
        self.entries.values().flatten().cloned().collect()
    }

    /// Files with at least one recorded error.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }

    /// Errors grouped by file, in insertion order.
    pub fn grouped(&self) -> impl Iterator<Item = (&Path, &[ValidationError])> {
        self.entries
            .iter()
            .map(|(path, errors)| (path.as_path(), errors.as_slice()))
    }

    /// Total number of errors.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Whether no file has errors.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
