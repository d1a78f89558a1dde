//! Command-line interface for Oracle Tables.
//!
//! This module handles argument parsing and output payloads only.
//! NO loading or validation logic lives here.

use crate::config::IngestConfig;
use crate::error::{OracleError, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// Oracle Tables: validated oracle table registry.
#[derive(Parser, Debug)]
#[command(name = "oracle-tables")]
#[command(author, version, about, long_about = None)]
#[command(subcommand_required = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Folder holding custom table files (overrides the settings file).
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// JSON settings file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit JSON payloads instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Load every custom table and report validation errors.
    Check,

    /// List all registered tables.
    List,

    /// Print one table as JSON.
    Show {
        /// Table id.
        #[arg(short, long)]
        id: String,
    },

    /// Print the result a roll value selects on a table.
    Lookup {
        /// Table id.
        #[arg(short, long)]
        id: String,

        /// Roll value.
        #[arg(short = 'n', long, allow_negative_numbers = true)]
        value: i64,
    },

    /// Print the category tree.
    Tree,

    /// Load tables, then reload them as files change until interrupted.
    Watch {
        /// How long to wait for filesystem events per poll, in milliseconds.
        #[arg(long, default_value_t = 250)]
        poll_ms: u64,
    },
}

impl Cli {
    /// Settings after applying the settings file and command-line overrides.
    pub fn ingest_config(&self) -> Result<IngestConfig> {
        let config = match &self.config {
            Some(path) => IngestConfig::load(path)?,
            None => IngestConfig::default(),
        };
        Ok(match &self.root {
            Some(root) => config.with_root_folder(root),
            None => config,
        })
    }
}

/// Parse command-line arguments.
///
/// Returns the parsed Cli struct or exits on error.
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// JSON success payload for CLI responses.
#[derive(Serialize)]
pub struct CliSuccessPayload {
    /// Status indicator ("ok").
    pub status: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CliSuccessPayload {
    /// Construct a payload containing only the message.
    pub fn message_only(message: String) -> Self {
        Self {
            status: "ok",
            message,
            data: None,
        }
    }

    /// Construct a payload with structured data.
    pub fn with_data(message: String, data: Value) -> Self {
        Self {
            status: "ok",
            message,
            data: Some(data),
        }
    }
}

/// JSON error payload for CLI responses.
#[derive(Serialize)]
pub struct CliErrorPayload {
    /// Status indicator ("error").
    pub status: &'static str,
    /// Structured error details.
    pub error: ErrorDetails,
}

/// Details for a CLI error payload.
#[derive(Serialize)]
pub struct ErrorDetails {
    /// Error kind identifier (TableNotFound, etc.).
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Optional file context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Optional hint for remediation steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Optional structured data, such as validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CliErrorPayload {
    /// Build payload from an OracleError instance.
    pub fn from_error(error: &OracleError) -> Self {
        CliErrorPayload {
            status: "error",
            error: ErrorDetails {
                kind: error.kind(),
                message: error.to_string(),
                file: error
                    .file_path()
                    .map(|path| path.to_string_lossy().to_string()),
                hint: error.hint().map(|h| h.to_string()),
                data: None,
            },
        }
    }

    /// Payload for a run that completed but found validation errors.
    pub fn validation_failed(message: String, data: Value) -> Self {
        CliErrorPayload {
            status: "error",
            error: ErrorDetails {
                kind: "Validation",
                message,
                file: None,
                hint: Some("Fix the listed files; they are reloaded on save".to_string()),
                data: Some(data),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lookup_with_global_flags() {
        let cli = Cli::try_parse_from([
            "oracle-tables",
            "lookup",
            "--id",
            "mythic-event-focus",
            "--value",
            "42",
            "--root",
            "my-tables",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Lookup { value: 42, .. }));
        let config = cli.ingest_config().unwrap();
        assert_eq!(config.root_folder, PathBuf::from("my-tables"));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["oracle-tables"]).is_err());
    }

    #[test]
    fn test_error_payload() {
        let payload = CliErrorPayload::from_error(&OracleError::TableNotFound("x".to_string()));
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"]["kind"], "TableNotFound");
        assert!(value["error"].get("file").is_none());
    }
}
