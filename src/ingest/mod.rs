//! Custom table ingestion.
//!
//! The [`TableIngestor`] owns the record of every table file it has seen:
//! which tables each file contributed and which errors its last load
//! produced. It keeps the [`TableRegistry`] in step with that record as
//! files are discovered, changed and deleted.
//!
//! Failures are contained at the smallest scope. A bad entry fails its
//! table, a bad table is skipped while its siblings load, and a bad file
//! never stops a folder scan. Only an unusable root folder is escalated,
//! as a [`Notice`].

use crate::error::{OracleError, Result};
use crate::ledger::ErrorLedger;
use crate::registry::TableRegistry;
use crate::store::{is_table_file, FileStore};
use crate::table::TableDefinition;
use crate::validate::{validate_document, DuplicateScope, ErrorKind, ValidationError};
use crate::watch::WatchHandlers;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Outcome of the most recent load of one file.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFile {
    /// File path.
    pub path: PathBuf,
    /// Tables that passed validation and id checks.
    pub tables: Vec<TableDefinition>,
    /// Everything that went wrong.
    pub errors: Vec<ValidationError>,
    /// When the load ran.
    pub loaded_at: DateTime<Utc>,
}

/// A problem serious enough to show the user immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// What happened.
    pub message: String,
    /// What the user can do about it.
    pub hint: Option<&'static str>,
}

impl From<&OracleError> for Notice {
    fn from(err: &OracleError) -> Self {
        Notice {
            message: err.to_string(),
            hint: err.hint(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hint {
            Some(hint) => write!(f, "{} ({})", self.message, hint),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Loads custom tables from a folder and keeps a registry in sync.
pub struct TableIngestor<S, R> {
    root: PathBuf,
    store: S,
    registry: R,
    builtin_ids: HashSet<String>,
    files: IndexMap<PathBuf, LoadedFile>,
    ledger: ErrorLedger,
    notices: Vec<Notice>,
}

impl<S: FileStore, R: TableRegistry> TableIngestor<S, R> {
    /// Create an ingestor for `root`.
    ///
    /// `builtin_ids` are reserved: custom tables using them are rejected.
    pub fn new(
        root: impl Into<PathBuf>,
        store: S,
        registry: R,
        builtin_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            root: root.into(),
            store,
            registry,
            builtin_ids: builtin_ids.into_iter().collect(),
            files: IndexMap::new(),
            ledger: ErrorLedger::new(),
            notices: Vec::new(),
        }
    }

    /// Root folder scanned for tables.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The registry being kept in sync.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Errors from the last load of every file.
    pub fn ledger(&self) -> &ErrorLedger {
        &self.ledger
    }

    /// All current errors, flattened.
    pub fn all_errors(&self) -> Vec<ValidationError> {
        self.ledger.all_errors()
    }

    /// Every accepted custom table, in file order.
    pub fn custom_tables(&self) -> Vec<TableDefinition> {
        self.files
            .values()
            .flat_map(|file| file.tables.iter().cloned())
            .collect()
    }

    /// Last load outcome for `path`.
    pub fn loaded_file(&self, path: &Path) -> Option<&LoadedFile> {
        self.files.get(path)
    }

    /// Paths currently tracked.
    pub fn tracked_files(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    /// Drain notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Load one file and record the outcome.
    ///
    /// Does not touch the registry; see [`TableIngestor::handle_modify`].
    pub fn load_file(&mut self, path: &Path) -> LoadedFile {
        let loaded_at = Utc::now();

        let (tables, errors) = match self.store.read(path) {
            Err(err) => (
                Vec::new(),
                vec![ValidationError::new(
                    ErrorKind::Io,
                    path,
                    format!("read failed: {}", err),
                )],
            ),
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Err(err) => (
                    Vec::new(),
                    vec![ValidationError::new(
                        ErrorKind::Parse,
                        path,
                        format!("syntax error: {}", err),
                    )],
                ),
                Ok(raw) => self.accept_tables(path, &raw, loaded_at),
            },
        };

        log::debug!(
            "Loaded {}: {} tables, {} errors",
            path.display(),
            tables.len(),
            errors.len()
        );

        if errors.is_empty() {
            self.ledger.clear(path);
        } else {
            self.ledger.set_errors(path, errors.clone());
        }

        let loaded = LoadedFile {
            path: path.to_path_buf(),
            tables,
            errors,
            loaded_at,
        };
        self.files.insert(path.to_path_buf(), loaded.clone());
        loaded
    }

    /// Validate every table in a parsed document and apply id checks.
    fn accept_tables(
        &self,
        path: &Path,
        raw: &Value,
        loaded_at: DateTime<Utc>,
    ) -> (Vec<TableDefinition>, Vec<ValidationError>) {
        let is_array = raw.is_array();
        let mut tables: Vec<TableDefinition> = Vec::new();
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for (index, result) in validate_document(raw, path, loaded_at).into_iter().enumerate() {
            let table = match result {
                Ok(table) => table,
                Err(table_errors) => {
                    errors.extend(table_errors);
                    continue;
                }
            };

            match self.id_conflict(path, &table.id, &seen) {
                Some((scope, message)) => {
                    log::warn!("{}: {}", path.display(), message);
                    let mut error =
                        ValidationError::new(ErrorKind::DuplicateId(scope), path, message)
                            .with_table(Some(&table.id))
                            .with_field("id");
                    if is_array {
                        error = error.with_element(index);
                    }
                    errors.push(error);
                }
                None => {
                    seen.insert(table.id.clone());
                    tables.push(table);
                }
            }
        }

        (tables, errors)
    }

    /// First id rule `id` breaks: same file, then built-ins, then other files.
    fn id_conflict(
        &self,
        path: &Path,
        id: &str,
        seen: &HashSet<String>,
    ) -> Option<(DuplicateScope, String)> {
        if seen.contains(id) {
            return Some((
                DuplicateScope::InFile,
                format!("duplicate table id '{}' (already defined earlier in this file)", id),
            ));
        }
        if self.builtin_ids.contains(id) {
            return Some((
                DuplicateScope::Builtin,
                format!("table id '{}' conflicts with a built-in table", id),
            ));
        }
        let owner = self
            .files
            .iter()
            .filter(|(other, _)| other.as_path() != path)
            .find(|(_, file)| file.tables.iter().any(|table| table.id == id))
            .map(|(other, _)| other);
        owner.map(|other| {
            (
                DuplicateScope::CrossFile,
                format!(
                    "table id '{}' is already defined in {}",
                    id,
                    other.display()
                ),
            )
        })
    }

    /// Load every table file under the root folder.
    ///
    /// Creates the root folder if it is missing. Returns the accepted
    /// tables of all files; does not touch the registry.
    pub fn load_all(&mut self) -> Vec<TableDefinition> {
        if let Err(err) = self.ensure_root() {
            self.escalate(ErrorKind::FolderCreate, err);
            return Vec::new();
        }

        let paths = match self.store.list_tree(&self.root) {
            Ok(paths) => paths,
            Err(source) => {
                let err = OracleError::Io {
                    path: self.root.clone(),
                    source,
                };
                self.escalate(ErrorKind::Io, err);
                return Vec::new();
            }
        };
        self.ledger.clear(&self.root);

        let mut accepted = Vec::new();
        let mut file_count = 0;
        for path in paths.iter().filter(|path| is_table_file(path)) {
            file_count += 1;
            accepted.extend(self.load_file(path).tables);
        }

        log::info!(
            "Loaded {} custom tables from {} files in {} ({} errors)",
            accepted.len(),
            file_count,
            self.root.display(),
            self.ledger.len()
        );
        accepted
    }

    /// Forget everything, rescan, and rebuild the registry's custom tables.
    pub fn reload_all(&mut self) -> Vec<TableDefinition> {
        self.ledger.clear_all();
        self.files.clear();

        let accepted = self.load_all();

        self.registry.clear_all_custom();
        for table in &accepted {
            self.registry.add_table(table.clone());
        }
        accepted
    }

    /// A table file appeared.
    pub fn handle_create(&mut self, path: &Path) {
        log::debug!("Table file created: {}", path.display());
        self.refresh(path);
    }

    /// A table file changed.
    pub fn handle_modify(&mut self, path: &Path) {
        log::debug!("Table file modified: {}", path.display());
        self.refresh(path);
    }

    /// A table file went away.
    ///
    /// Other files that lost an id conflict to this one are not reloaded;
    /// they keep their duplicate-id errors until they change or
    /// [`TableIngestor::reload_all`] runs.
    pub fn handle_delete(&mut self, path: &Path) {
        log::debug!("Table file deleted: {}", path.display());
        self.retract(path);
        self.ledger.clear(path);
        self.files.shift_remove(path);
    }

    /// Build watcher callbacks that feed events into a shared ingestor.
    pub fn watch_handlers(this: &Rc<RefCell<Self>>) -> WatchHandlers
    where
        S: 'static,
        R: 'static,
    {
        WatchHandlers {
            on_create: Self::handler(this, Self::handle_create),
            on_modify: Self::handler(this, Self::handle_modify),
            on_delete: Self::handler(this, Self::handle_delete),
        }
    }

    fn handler(
        this: &Rc<RefCell<Self>>,
        handle: fn(&mut Self, &Path),
    ) -> Box<dyn FnMut(&Path)>
    where
        S: 'static,
        R: 'static,
    {
        let ingestor = Rc::clone(this);
        Box::new(move |path: &Path| match ingestor.try_borrow_mut() {
            Ok(mut guard) => handle(&mut *guard, path),
            Err(_) => log::error!(
                "Ingestor busy, change to {} was not applied",
                path.display()
            ),
        })
    }

    /// Retract the file's tables, then load it again and register the result.
    ///
    /// Retraction happens before the read so stale tables never outlive a
    /// change, even when the new version fails to load.
    fn refresh(&mut self, path: &Path) {
        self.retract(path);
        let loaded = self.load_file(path);
        for table in loaded.tables {
            self.registry.add_table(table);
        }
    }

    /// Remove the file's previously accepted tables from the registry.
    fn retract(&mut self, path: &Path) {
        if let Some(previous) = self.files.get(path) {
            for table in &previous.tables {
                self.registry.remove_table(&table.id);
            }
        }
    }

    fn ensure_root(&self) -> Result<()> {
        if self.store.exists(&self.root) {
            return Ok(());
        }
        log::info!("Creating table folder {}", self.root.display());
        self.store
            .create_folder(&self.root)
            .map_err(|source| OracleError::FolderCreate {
                path: self.root.clone(),
                source,
            })
    }

    /// Record a root-level failure in the ledger and raise a notice.
    fn escalate(&mut self, kind: ErrorKind, err: OracleError) {
        log::error!("{}", err);
        self.ledger.set_errors(
            &self.root,
            vec![ValidationError::new(kind, &self.root, err.to_string())],
        );
        self.notices.push(Notice::from(&err));
    }
}
