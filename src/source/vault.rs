//! Directory-backed document source.

use super::DocumentSource;
use crate::model::error::InputError;
use crate::model::EntityId;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const MARKDOWN_EXTENSION: &str = "md";

/// A vault: a directory tree of markdown files.
///
/// Document ids are `/`-separated paths relative to the root, extension
/// included (`people/Su Shi.md`). Hidden files and directories are skipped.
#[derive(Debug, Clone)]
pub struct VaultSource {
    root: PathBuf,
}

impl VaultSource {
    /// Open a vault rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `InputError::RootNotFound` if `root` does not exist and
    /// `InputError::NotADirectory` if it is not a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, InputError> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(InputError::RootNotFound {
                path: root.to_path_buf(),
            });
        }
        if !root.is_dir() {
            return Err(InputError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Vault root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of a document id.
    pub fn path_of(&self, id: &EntityId) -> PathBuf {
        id.as_str()
            .split('/')
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    /// Document id of a filesystem path inside the vault.
    ///
    /// Returns `None` for paths outside the root, non-markdown files, and
    /// hidden entries.
    pub fn id_for_path(&self, path: &Path) -> Option<EntityId> {
        if path.extension()? != MARKDOWN_EXTENSION {
            return None;
        }
        EntityId::new(self.relative_key(path)?).ok()
    }

    /// `/`-separated path of `path` relative to the root.
    ///
    /// Returns `None` for the root itself, paths outside it, and anything
    /// with a hidden component.
    pub fn relative_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    let part = part.to_str()?;
                    if part.starts_with('.') {
                        return None;
                    }
                    parts.push(part);
                }
                _ => return None,
            }
        }
        (!parts.is_empty()).then(|| parts.join("/"))
    }

    /// Ids of every document below `dir`, sorted by path.
    ///
    /// # Errors
    ///
    /// Returns `InputError` when `dir` itself cannot be read. Unreadable
    /// entries further down are logged and skipped.
    pub fn documents_under(&self, dir: &Path) -> Result<Vec<EntityId>, InputError> {
        let mut ids = Vec::new();
        for entry in WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(std::io::Error::other(e).into()),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable vault entry");
                    continue;
                }
            };
            if entry.file_type().is_file() {
                if let Some(id) = self.id_for_path(entry.path()) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_str().is_some_and(|n| n.starts_with('.'))
}

impl DocumentSource for VaultSource {
    fn list_documents(&self) -> Result<Vec<EntityId>, InputError> {
        self.documents_under(&self.root)
    }

    fn read(&self, id: &EntityId) -> Result<String, InputError> {
        Ok(std::fs::read_to_string(self.path_of(id))?)
    }
}
