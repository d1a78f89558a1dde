//! Oracle Tables CLI binary
//!
//! This is the main entry point for the oracle-tables command-line interface.
//! The CLI is a thin adapter over existing APIs - NO logic is implemented here.

use oracle_tables::builtin::builtin_tables;
use oracle_tables::cli::{CliErrorPayload, CliSuccessPayload, Commands};
use oracle_tables::config::IngestConfig;
use oracle_tables::store::FsStore;
use oracle_tables::watch::{ChangeWatcher, FsNotifier};
use oracle_tables::{OracleError, Registry, TableIngestor};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;

type Ingestor = TableIngestor<FsStore, Registry>;

/// Result of a command that ran to completion.
struct Outcome {
    message: String,
    data: Option<Value>,
    success: bool,
}

impl Outcome {
    fn ok(message: String, data: Option<Value>) -> Self {
        Self {
            message,
            data,
            success: true,
        }
    }
}

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = oracle_tables::cli::parse_args();

    // Initialize logger if verbose
    if cli.verbose {
        env_logger::init();
    }

    let json_output = cli.json;
    let result = cli.ingest_config().and_then(|config| match cli.command {
        Commands::Check => execute_check(&config),
        Commands::List => execute_list(&config),
        Commands::Show { id } => execute_show(&config, &id),
        Commands::Lookup { id, value } => execute_lookup(&config, &id, value),
        Commands::Tree => execute_tree(&config),
        Commands::Watch { poll_ms } => execute_watch(&config, Duration::from_millis(poll_ms)),
    });

    match result {
        Ok(outcome) => {
            if json_output {
                let payload = if outcome.success {
                    match outcome.data {
                        Some(data) => serde_json::to_string(&CliSuccessPayload::with_data(
                            outcome.message,
                            data,
                        )),
                        None => serde_json::to_string(&CliSuccessPayload::message_only(
                            outcome.message,
                        )),
                    }
                } else {
                    serde_json::to_string(&CliErrorPayload::validation_failed(
                        outcome.message,
                        outcome.data.unwrap_or(Value::Null),
                    ))
                };
                match payload {
                    Ok(text) => println!("{}", text),
                    Err(e) => eprintln!("Error: failed to serialize output: {}", e),
                }
            } else {
                println!("{}", outcome.message);
            }
            if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            if json_output {
                match serde_json::to_string(&CliErrorPayload::from_error(&e)) {
                    Ok(text) => println!("{}", text),
                    Err(_) => eprintln!("Error: {}", e),
                }
            } else {
                eprintln!("Error: {}", e);
                if let Some(hint) = e.hint() {
                    eprintln!("Hint: {}", hint);
                }
            }
            ExitCode::from(1)
        }
    }
}

/// Build an ingestor with the configured built-ins, then load everything.
fn load(config: &IngestConfig, root: PathBuf) -> Ingestor {
    let builtins = if config.include_builtins {
        builtin_tables()
    } else {
        Vec::new()
    };
    let registry = Registry::new(builtins);
    let builtin_ids = registry.builtin_ids();
    let mut ingestor = TableIngestor::new(root, FsStore, registry, builtin_ids);
    ingestor.reload_all();
    report_notices(&mut ingestor);
    ingestor
}

fn report_notices(ingestor: &mut Ingestor) {
    for notice in ingestor.take_notices() {
        eprintln!("Notice: {}", notice);
    }
}

/// Render the ledger grouped by file.
fn render_errors(ingestor: &Ingestor) -> String {
    let mut lines = Vec::new();
    for (file, errors) in ingestor.ledger().grouped() {
        lines.push(format!("{}:", file.display()));
        for error in errors {
            let mut context = String::new();
            if let Some(element) = error.element {
                context.push_str(&format!("#{} ", element));
            }
            if let Some(table_id) = &error.table_id {
                context.push_str(&format!("[{}] ", table_id));
            }
            if let Some(field) = &error.field {
                context.push_str(&format!("({}) ", field));
            }
            lines.push(format!("  {}: {}{}", error.severity.as_str(), context, error.message));
        }
    }
    lines.join("\n")
}

/// Execute the check command.
fn execute_check(config: &IngestConfig) -> Result<Outcome, OracleError> {
    let ingestor = load(config, config.root_folder.clone());
    let custom = ingestor.custom_tables();
    let errors = ingestor.all_errors();

    let summary = format!(
        "{} custom tables loaded, {} errors",
        custom.len(),
        errors.len()
    );
    let message = if errors.is_empty() {
        summary
    } else {
        format!("{}\n{}", render_errors(&ingestor), summary)
    };

    Ok(Outcome {
        message,
        data: Some(json!({
            "tables": custom.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            "errors": errors,
        })),
        success: errors.is_empty(),
    })
}

/// Execute the list command.
fn execute_list(config: &IngestConfig) -> Result<Outcome, OracleError> {
    let ingestor = load(config, config.root_folder.clone());
    let registry = ingestor.registry();

    let lines: Vec<String> = registry
        .tables()
        .map(|table| {
            format!(
                "{:<32} {:<6} {:<10} {}{}",
                table.id,
                table.dice.as_str(),
                table.kind.as_str(),
                table.category,
                if table.is_custom() { " (custom)" } else { "" }
            )
        })
        .collect();
    let data: Vec<Value> = registry
        .tables()
        .map(|table| {
            json!({
                "id": table.id,
                "name": table.name,
                "category": table.category,
                "type": table.kind.as_str(),
                "diceType": table.dice.as_str(),
                "custom": table.is_custom(),
            })
        })
        .collect();

    Ok(Outcome::ok(lines.join("\n"), Some(Value::Array(data))))
}

/// Execute the show command.
fn execute_show(config: &IngestConfig, id: &str) -> Result<Outcome, OracleError> {
    let ingestor = load(config, config.root_folder.clone());
    let table = ingestor
        .registry()
        .get(id)
        .ok_or_else(|| OracleError::TableNotFound(id.to_string()))?;

    let value = serde_json::to_value(table).map_err(|e| OracleError::Json {
        path: PathBuf::from(id),
        source: e,
    })?;
    let pretty = serde_json::to_string_pretty(&value).map_err(|e| OracleError::Json {
        path: PathBuf::from(id),
        source: e,
    })?;
    Ok(Outcome::ok(pretty, Some(value)))
}

/// Execute the lookup command.
fn execute_lookup(config: &IngestConfig, id: &str, value: i64) -> Result<Outcome, OracleError> {
    let ingestor = load(config, config.root_folder.clone());
    let table = ingestor
        .registry()
        .get(id)
        .ok_or_else(|| OracleError::TableNotFound(id.to_string()))?;

    let entry = table.lookup(value).ok_or_else(|| {
        OracleError::Other(format!(
            "No entry of '{}' covers {} ({})",
            id,
            value,
            table.dice.as_str()
        ))
    })?;

    Ok(Outcome::ok(
        entry.result.clone(),
        Some(json!({ "table": id, "value": value, "range": entry.range, "result": entry.result })),
    ))
}

/// Execute the tree command.
fn execute_tree(config: &IngestConfig) -> Result<Outcome, OracleError> {
    let ingestor = load(config, config.root_folder.clone());
    let outline = ingestor.registry().category_tree().outline();
    Ok(Outcome::ok(
        outline.join("\n"),
        Some(json!({ "outline": outline })),
    ))
}

/// Execute the watch command.
///
/// Runs until the process is interrupted.
fn execute_watch(config: &IngestConfig, poll: Duration) -> Result<Outcome, OracleError> {
    // Events arrive with absolute paths, so the ingestor must key on one too.
    let root = resolve_root(&config.root_folder)?;
    let ingestor = Rc::new(RefCell::new(load(config, root.clone())));
    print_status(&ingestor.borrow());

    let mut notifier = FsNotifier::new(&root)?;
    let mut watcher = ChangeWatcher::new(&root, TableIngestor::watch_handlers(&ingestor));
    watcher.start(&mut notifier);

    loop {
        if notifier.dispatch_timeout(poll) > 0 {
            let mut current = ingestor.borrow_mut();
            report_notices(&mut current);
            print_status(&current);
        }
    }
}

fn print_status(ingestor: &Ingestor) {
    let errors = ingestor.all_errors();
    if !errors.is_empty() {
        println!("{}", render_errors(ingestor));
    }
    println!(
        "{} custom tables loaded, {} errors",
        ingestor.custom_tables().len(),
        errors.len()
    );
}

fn resolve_root(root: &Path) -> Result<PathBuf, OracleError> {
    std::fs::create_dir_all(root).map_err(|e| OracleError::FolderCreate {
        path: root.to_path_buf(),
        source: e,
    })?;
    std::fs::canonicalize(root).map_err(|e| OracleError::Io {
        path: root.to_path_buf(),
        source: e,
    })
}
