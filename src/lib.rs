//! Oracle Tables: validated, hot-reloaded oracle table registry.
//!
//! This library loads user-authored oracle tables (dice range to text
//! lookup tables) from a folder of JSON files, validates them, merges them
//! with the built-in tables, and keeps the combined registry in sync with
//! the folder as files change.

#![warn(missing_docs)]
// env_logger is used by src/main.rs (binary), not this library
#![expect(unused_crate_dependencies)]

pub mod builtin;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod ledger;
pub mod registry;
pub mod store;
pub mod table;
pub mod validate;
pub mod watch;

/// Re-export common error types for convenience.
pub use error::{OracleError, Result};

/// Re-export the ingestion entry points for convenience.
pub use ingest::{LoadedFile, Notice, TableIngestor};
pub use registry::{Registry, TableRegistry};
pub use table::TableDefinition;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
