//! Change-driven index synchronisation.
//!
//! [`IndexSync`] owns the [`EntityStore`] and keeps it consistent with a
//! [`DocumentSource`] under incremental change events and full rebuilds.
//! Per-document problems never abort anything: they are logged and the
//! document is left out of the index.

use super::scheduler::RebuildScheduler;
use super::{DocumentSource, FileChangeEvent};
use crate::index::EntityStore;
use crate::model::error::InputError;
use crate::model::{Admission, EntityId, RejectReason, Rejection};
use crate::parser;
use std::time::{Duration, Instant};

/// Outcome of one full rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Documents admitted to the index.
    pub admitted: usize,
    /// Documents inside the data sources that were not admitted.
    pub rejected: Vec<Rejection>,
    /// Documents outside the data sources.
    pub skipped: usize,
}

impl ScanReport {
    /// Number of rejected documents.
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    /// Rejections that point at a broken document rather than an ordinary note.
    pub fn faults(&self) -> impl Iterator<Item = &Rejection> {
        self.rejected.iter().filter(|r| !r.reason().is_routine())
    }
}

/// What a single change event did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Outside the data sources.
    Ignored,
    /// The document was admitted and upserted.
    Upserted,
    /// The document left the index.
    Removed,
    /// Not admitted and not previously indexed.
    Unchanged,
    /// The document could not be read; the store was left untouched.
    Faulted,
}

/// Store plus the policy that feeds it.
#[derive(Debug)]
pub struct IndexSync<S> {
    source: S,
    store: EntityStore,
    data_sources: Vec<String>,
    scheduler: RebuildScheduler,
    initial_scan_done: bool,
}

impl<S: DocumentSource> IndexSync<S> {
    /// Sync over `source`, restricted to `data_sources` (empty = everything).
    ///
    /// Nothing is scanned until [`Self::start`] schedules the initial rebuild
    /// or [`Self::rebuild`] is called directly.
    pub fn new(source: S, data_sources: Vec<String>, initial_delay: Duration) -> Self {
        Self {
            source,
            store: EntityStore::new(),
            data_sources: normalize_data_sources(data_sources),
            scheduler: RebuildScheduler::new(initial_delay),
            initial_scan_done: false,
        }
    }

    /// Current index.
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Document source being synchronised.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the document source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Normalised data-source folders. Empty means the whole vault.
    pub fn data_sources(&self) -> &[String] {
        &self.data_sources
    }

    /// Whether the first full scan has run.
    pub fn is_initial_scan_done(&self) -> bool {
        self.initial_scan_done
    }

    /// Whether a deferred rebuild is waiting.
    pub fn is_rebuild_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Schedule the deferred initial scan.
    pub fn start(&mut self, now: Instant) {
        if self.scheduler.schedule(now) {
            tracing::debug!(
                delay_ms = self.scheduler.delay().as_millis() as u64,
                "initial scan scheduled"
            );
        }
    }

    /// Request a deferred rebuild. Coalesces with a pending one.
    pub fn request_rebuild(&mut self, now: Instant) {
        self.scheduler.schedule(now);
    }

    /// Run the pending rebuild if it is due.
    ///
    /// # Errors
    ///
    /// Propagates a failure to list the source; see [`Self::rebuild`].
    pub fn poll(&mut self, now: Instant) -> Result<Option<ScanReport>, InputError> {
        if self.scheduler.take_due(now) {
            self.rebuild().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Replace the data-source filter.
    ///
    /// Rebuilds immediately once the initial scan has happened; before that
    /// the scheduled initial scan picks the new filter up.
    ///
    /// # Errors
    ///
    /// Propagates a failure to list the source.
    pub fn set_data_sources(
        &mut self,
        data_sources: Vec<String>,
    ) -> Result<Option<ScanReport>, InputError> {
        self.data_sources = normalize_data_sources(data_sources);
        if self.initial_scan_done {
            self.rebuild().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Whether `id` lies inside one of the data-source folders.
    pub fn in_data_sources(&self, id: &str) -> bool {
        self.data_sources.is_empty()
            || self.data_sources.iter().any(|folder| {
                id == folder
                    || id
                        .strip_prefix(folder.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
    }

    /// Clear the store and re-admit every in-scope document.
    ///
    /// # Errors
    ///
    /// Returns `InputError` only if the source cannot be listed; the store is
    /// left untouched in that case.
    pub fn rebuild(&mut self) -> Result<ScanReport, InputError> {
        tracing::info!("Rebuilding index");
        let ids = self.source.list_documents()?;

        self.store.clear();
        let mut report = ScanReport::default();
        for id in ids {
            if !self.in_data_sources(id.as_str()) {
                report.skipped += 1;
                continue;
            }
            match self.admit(&id) {
                Admission::Admitted(entity) => {
                    self.store.upsert(entity);
                    report.admitted += 1;
                }
                Admission::Rejected(rejection) => {
                    log_rejection(&rejection);
                    report.rejected.push(rejection);
                }
            }
        }
        self.initial_scan_done = true;

        tracing::info!(
            admitted = report.admitted,
            rejected = report.rejected_count(),
            skipped = report.skipped,
            total = self.store.len(),
            "Index rebuilt"
        );
        Ok(report)
    }

    /// Apply one change event.
    pub fn handle_event(&mut self, event: &FileChangeEvent) -> SyncAction {
        match event {
            FileChangeEvent::Changed(id) => self.handle_changed(id),
            FileChangeEvent::Deleted(id) => {
                if !self.in_data_sources(id.as_str()) {
                    return SyncAction::Ignored;
                }
                self.remove(id)
            }
            FileChangeEvent::Renamed { from, to } => {
                if !self.in_data_sources(from.as_str()) && !self.in_data_sources(to.as_str()) {
                    return SyncAction::Ignored;
                }
                let removed = self.remove(from);
                match self.handle_changed(to) {
                    SyncAction::Ignored | SyncAction::Unchanged => removed,
                    action => action,
                }
            }
            FileChangeEvent::FolderRemoved(folder) => self.remove_folder(folder),
        }
    }

    /// Drop every indexed document below `folder`.
    fn remove_folder(&mut self, folder: &str) -> SyncAction {
        let folder = folder.trim_matches('/');
        let doomed: Vec<EntityId> = self
            .store
            .iter()
            .map(|entity| entity.id())
            .filter(|id| {
                id.as_str()
                    .strip_prefix(folder)
                    .is_some_and(|rest| rest.starts_with('/'))
            })
            .cloned()
            .collect();
        if doomed.is_empty() {
            return SyncAction::Unchanged;
        }
        for id in &doomed {
            self.store.remove(id.as_str());
        }
        tracing::debug!(folder, removed = doomed.len(), "Removed folder");
        SyncAction::Removed
    }

    fn handle_changed(&mut self, id: &EntityId) -> SyncAction {
        if !self.in_data_sources(id.as_str()) {
            return SyncAction::Ignored;
        }
        match self.admit(id) {
            Admission::Admitted(entity) => {
                tracing::debug!(id = %id, name = entity.name(), "Updated entity");
                self.store.upsert(entity);
                SyncAction::Upserted
            }
            Admission::Rejected(rejection) => {
                log_rejection(&rejection);
                if matches!(rejection.reason(), RejectReason::ScanFault(_)) {
                    SyncAction::Faulted
                } else {
                    self.remove(id)
                }
            }
        }
    }

    fn remove(&mut self, id: &EntityId) -> SyncAction {
        match self.store.remove(id.as_str()) {
            Some(_) => {
                tracing::debug!(id = %id, "Removed entity");
                SyncAction::Removed
            }
            None => SyncAction::Unchanged,
        }
    }

    fn admit(&self, id: &EntityId) -> Admission {
        match self.source.read(id) {
            Ok(text) => parser::parse_document(id, &text),
            Err(e) => Admission::rejected(id.clone(), RejectReason::ScanFault(e.to_string())),
        }
    }
}

fn normalize_data_sources(data_sources: Vec<String>) -> Vec<String> {
    data_sources
        .into_iter()
        .map(|folder| folder.trim().trim_matches('/').to_string())
        .filter(|folder| !folder.is_empty())
        .collect()
}

fn log_rejection(rejection: &Rejection) {
    if rejection.reason().is_routine() {
        tracing::debug!(id = %rejection.id(), reason = %rejection.reason(), "Document not indexed");
    } else {
        tracing::warn!(id = %rejection.id(), reason = %rejection.reason(), "Document rejected");
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
