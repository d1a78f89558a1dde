//! File storage collaborators.
//!
//! The ingestor never touches `std::fs` directly. It goes through a
//! [`FileStore`], which is either the real filesystem ([`FsStore`]) or an
//! in-memory tree ([`MemoryStore`]) used by tests and embedders that own
//! their own storage.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Extension of table files.
pub const TABLE_EXTENSION: &str = "json";

/// Whether `path` names a table file by extension.
pub fn is_table_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(TABLE_EXTENSION)
}

/// Storage operations the ingestor depends on.
pub trait FileStore {
    /// Read a file as UTF-8 text.
    fn read(&self, path: &Path) -> io::Result<String>;

    /// Every file under `folder`, recursively, in sorted order.
    fn list_tree(&self, folder: &Path) -> io::Result<Vec<PathBuf>>;

    /// Create `path` and its parents. Succeeds if it already exists.
    fn create_folder(&self, path: &Path) -> io::Result<()>;

    /// Whether `path` exists as a file or folder.
    fn exists(&self, path: &Path) -> bool;
}

impl<S: FileStore + ?Sized> FileStore for &S {
    fn read(&self, path: &Path) -> io::Result<String> {
        (**self).read(path)
    }

    fn list_tree(&self, folder: &Path) -> io::Result<Vec<PathBuf>> {
        (**self).list_tree(folder)
    }

    fn create_folder(&self, path: &Path) -> io::Result<()> {
        (**self).create_folder(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
}

impl<S: FileStore + ?Sized> FileStore for Rc<S> {
    fn read(&self, path: &Path) -> io::Result<String> {
        (**self).read(path)
    }

    fn list_tree(&self, folder: &Path) -> io::Result<Vec<PathBuf>> {
        (**self).list_tree(folder)
    }

    fn create_folder(&self, path: &Path) -> io::Result<()> {
        (**self).create_folder(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
}

/// The local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStore;

impl FileStore for FsStore {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    /// Walks with an explicit stack so deep trees cannot overflow.
    ///
    /// Only a failure to read `folder` itself is an error. Unreadable
    /// subfolders and entries below it are logged and skipped.
    fn list_tree(&self, folder: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = Vec::new();
        let mut listing = Some(fs::read_dir(folder)?);

        while let Some(entries) = listing.take() {
            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        log::warn!("Skipping unreadable entry in table folder: {}", err);
                        continue;
                    }
                };
                let file_type = match entry.file_type() {
                    Ok(file_type) => file_type,
                    Err(err) => {
                        log::warn!("Skipping {}: {}", entry.path().display(), err);
                        continue;
                    }
                };
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    files.push(entry.path());
                } else if file_type.is_symlink() && entry.path().is_file() {
                    // Symlinked directories are not followed.
                    files.push(entry.path());
                }
            }

            while let Some(dir) = pending.pop() {
                match fs::read_dir(&dir) {
                    Ok(entries) => {
                        listing = Some(entries);
                        break;
                    }
                    Err(err) => log::warn!("Skipping folder {}: {}", dir.display(), err),
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn create_folder(&self, path: &Path) -> io::Result<()> {
        match fs::create_dir_all(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[derive(Debug, Default)]
struct MemoryTree {
    files: BTreeMap<PathBuf, String>,
    folders: BTreeSet<PathBuf>,
    unreadable: BTreeSet<PathBuf>,
    read_only: bool,
}

/// In-memory file tree with interior mutability.
///
/// Files can be written and removed through a shared reference while an
/// ingestor holds the store, which is how tests simulate the user editing
/// their table folder.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tree: RefCell<MemoryTree>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a file.
    pub fn write(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.tree.borrow_mut().files.insert(path.into(), contents.into());
    }

    /// Remove a file. Returns whether it existed.
    pub fn remove(&self, path: &Path) -> bool {
        self.tree.borrow_mut().files.remove(path).is_some()
    }

    /// Make reads of `path` fail with `PermissionDenied`.
    pub fn make_unreadable(&self, path: impl Into<PathBuf>) {
        self.tree.borrow_mut().unreadable.insert(path.into());
    }

    /// When set, creating a missing folder fails with `PermissionDenied`.
    pub fn set_read_only(&self, read_only: bool) {
        self.tree.borrow_mut().read_only = read_only;
    }
}

impl FileStore for MemoryStore {
    fn read(&self, path: &Path) -> io::Result<String> {
        let tree = self.tree.borrow();
        if tree.unreadable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            ));
        }
        tree.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }

    fn list_tree(&self, folder: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.exists(folder) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such folder: {}", folder.display()),
            ));
        }
        let tree = self.tree.borrow();
        Ok(tree
            .files
            .keys()
            .filter(|path| path.starts_with(folder) && path.as_path() != folder)
            .cloned()
            .collect())
    }

    fn create_folder(&self, path: &Path) -> io::Result<()> {
        if self.exists(path) {
            return Ok(());
        }
        let mut tree = self.tree.borrow_mut();
        if tree.read_only {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("read-only store: {}", path.display()),
            ));
        }
        tree.folders.insert(path.to_path_buf());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let tree = self.tree.borrow();
        tree.files.contains_key(path)
            || tree.folders.iter().any(|folder| folder.starts_with(path))
            || tree.files.keys().any(|file| file.starts_with(path))
    }
}
