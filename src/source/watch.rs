//! Filesystem notifications for a vault.

use super::vault::VaultSource;
use super::FileChangeEvent;
use crate::model::error::InputError;
use crate::model::EntityId;
use indexmap::IndexSet;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// Debounce window for raw notifications.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Recursive watcher over a vault root.
///
/// The debouncer reports paths, not operations, so a rename arrives as a
/// `Deleted` for the old id and a `Changed` for the new one.
pub struct VaultWatcher {
    root: PathBuf,
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    event_rx: Receiver<DebounceEventResult>,
}

impl std::fmt::Debug for VaultWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultWatcher")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl VaultWatcher {
    /// Start watching `vault`'s root recursively.
    ///
    /// # Errors
    ///
    /// Returns `InputError::Watch` if the platform watcher cannot be created
    /// or cannot watch the root.
    pub fn new(vault: &VaultSource) -> Result<Self, InputError> {
        let root = vault.root().to_path_buf();
        let watch_error = |e: notify::Error| InputError::Watch {
            path: root.clone(),
            reason: e.to_string(),
        };

        let (tx, rx) = std::sync::mpsc::channel();
        let mut debouncer = new_debouncer(DEBOUNCE, tx).map_err(watch_error)?;
        debouncer
            .watcher()
            .watch(&root, notify::RecursiveMode::Recursive)
            .map_err(watch_error)?;

        tracing::info!(root = %root.display(), "Watching vault");
        Ok(Self {
            root,
            _debouncer: debouncer,
            event_rx: rx,
        })
    }

    /// Watched vault root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Drain pending notifications without blocking.
    pub fn poll_events(&self, vault: &VaultSource) -> Vec<FileChangeEvent> {
        let mut paths = IndexSet::new();
        while let Ok(result) = self.event_rx.try_recv() {
            match result {
                Ok(events) => paths.extend(events.into_iter().map(|event| event.path)),
                Err(error) => tracing::warn!(error = %error, "watcher error"),
            }
        }
        events_for_paths(vault, paths.iter().map(PathBuf::as_path))
    }
}

/// Turn changed paths into change events, one per document.
///
/// A document path that still exists is `Changed`, otherwise `Deleted`. An
/// existing folder yields `Changed` for every document below it, since a
/// folder moved into place is reported only by its own path. Any other
/// vanished path yields `FolderRemoved`. Hidden and foreign paths, and
/// non-markdown files, are dropped.
pub fn events_for_paths<'a>(
    vault: &VaultSource,
    paths: impl IntoIterator<Item = &'a Path>,
) -> Vec<FileChangeEvent> {
    let mut seen = IndexSet::new();
    let mut folders = IndexSet::new();
    let mut events = Vec::new();
    let mut push = |id: EntityId, exists: bool, events: &mut Vec<FileChangeEvent>| {
        if seen.insert(id.clone()) {
            events.push(if exists {
                FileChangeEvent::Changed(id)
            } else {
                FileChangeEvent::Deleted(id)
            });
        }
    };

    for path in paths {
        if let Some(id) = vault.id_for_path(path) {
            if !path.is_dir() {
                push(id, path.is_file(), &mut events);
                continue;
            }
        }
        let Some(key) = vault.relative_key(path) else {
            continue;
        };
        if path.is_dir() {
            match vault.documents_under(path) {
                Ok(ids) => ids.into_iter().for_each(|id| push(id, true, &mut events)),
                Err(e) => tracing::warn!(folder = %key, error = %e, "cannot scan folder"),
            }
        } else if !path.exists() && folders.insert(key.clone()) {
            events.push(FileChangeEvent::FolderRemoved(key));
        }
    }
    events
}
