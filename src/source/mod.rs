//! Document sources and change-driven index synchronisation.
//!
//! This module provides the impure edge between a vault on disk and the
//! pure [`crate::index::EntityStore`]:
//! - [`DocumentSource`] enumerates and reads documents
//! - [`VaultSource`] implements it over a directory of `.md` files
//! - [`IndexSync`] applies [`FileChangeEvent`]s and full rebuilds
//! - [`RebuildScheduler`] defers rebuilds on a single thread
//! - [`VaultWatcher`] turns filesystem notifications into change events

use crate::model::error::InputError;
use crate::model::EntityId;

pub mod scheduler;
pub mod sync;
pub mod vault;
pub mod watch;

pub use scheduler::RebuildScheduler;
pub use sync::{IndexSync, ScanReport};
pub use vault::VaultSource;
pub use watch::VaultWatcher;

/// Collaborator supplying document text by id.
pub trait DocumentSource {
    /// Ids of every candidate document, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns `InputError` when the collection as a whole cannot be listed.
    fn list_documents(&self) -> Result<Vec<EntityId>, InputError>;

    /// Full text of one document.
    ///
    /// # Errors
    ///
    /// Returns `InputError` when the document cannot be read. Callers treat
    /// this as a per-document fault.
    fn read(&self, id: &EntityId) -> Result<String, InputError>;
}

/// Add/update/delete/rename signal from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChangeEvent {
    /// Document created or modified.
    Changed(EntityId),
    /// Document removed.
    Deleted(EntityId),
    /// Document moved; `from` no longer exists.
    Renamed {
        /// Previous id.
        from: EntityId,
        /// New id.
        to: EntityId,
    },
    /// Folder removed or moved away; every document below it is gone.
    ///
    /// Holds the folder's `/`-separated path relative to the vault root.
    FolderRemoved(String),
}
