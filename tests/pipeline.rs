//! Integration test: vault on disk → index → timeline layout.

use chronotrack::index::FilterCriteria;
use chronotrack::model::{EntityId, EntityType};
use chronotrack::source::sync::SyncAction;
use chronotrack::source::watch::events_for_paths;
use chronotrack::source::{DocumentSource, FileChangeEvent, IndexSync, VaultSource};
use chronotrack::timeline::TimelineSession;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Temporary vault removed on drop.
struct TempVault(PathBuf);

impl TempVault {
    fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("chronotrack_pipeline_{name}"));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        TempVault(root)
    }

    fn write(&self, relative: &str, text: &str) {
        let path = self.0.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempVault {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

fn song_vault(name: &str) -> TempVault {
    let vault = TempVault::new(name);
    vault.write(
        "people/Su Shi.md",
        "---\ntype: person\nborn: 1037\ndied: 1101\ntags: [poet, song]\n---\n\
         Friend of [[Ouyang Xiu]].\n",
    );
    vault.write(
        "people/Ouyang Xiu.md",
        "---\ntype: person\nborn: 1007\ndied: 1072\ntags: [song]\n---\n",
    );
    vault.write(
        "events/Crow Terrace Trial.md",
        "---\ntime_start: 1079-08\ntime_end: 1080-01\n\
         participants: [\"[[Su Shi]]\"]\nimportance: 4\n---\n",
    );
    vault.write("notes/Reading list.md", "# To read\n");
    vault.write(".obsidian/workspace.md", "---\ntime_start: 2024\n---\n");
    vault
}

fn id(raw: &str) -> EntityId {
    EntityId::new(raw).unwrap()
}

#[test]
fn scan_index_and_layout() {
    let vault = song_vault("scan");
    let source = VaultSource::new(vault.path()).unwrap();
    let mut sync = IndexSync::new(source, Vec::new(), Duration::ZERO);

    let report = sync.rebuild().unwrap();
    assert_eq!(report.admitted, 3);
    assert_eq!(report.rejected_count(), 1);
    assert_eq!(report.faults().count(), 0);

    let store = sync.store();
    assert_eq!(store.get_by_type(EntityType::Person).len(), 2);
    assert_eq!(
        store
            .get_related("people/Su Shi.md")
            .iter()
            .map(|e| e.id().as_str())
            .collect::<Vec<_>>(),
        vec!["events/Crow Terrace Trial.md", "people/Ouyang Xiu.md"]
    );
    // The trial names Su Shi by wikilink, not by path.
    assert_eq!(
        store
            .get_related("events/Crow Terrace Trial.md")
            .iter()
            .map(|e| e.id().as_str())
            .collect::<Vec<_>>(),
        vec!["people/Su Shi.md"]
    );

    let mut session = TimelineSession::default();
    let layout = session.layout(store);
    let order: Vec<&str> = layout.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "people/Ouyang Xiu.md",
            "people/Su Shi.md",
            "events/Crow Terrace Trial.md"
        ]
    );
    // The two lifetimes overlap, and the trial falls inside Su Shi's.
    assert_eq!(layout.get("people/Ouyang Xiu.md").unwrap().track, 0);
    assert_eq!(layout.get("people/Su Shi.md").unwrap().track, 1);
    assert_eq!(layout.get("events/Crow Terrace Trial.md").unwrap().track, 0);
    assert_eq!(layout.track_count, 2);
    store.check_invariants().unwrap();
}

#[test]
fn filtered_view_of_scanned_vault() {
    let vault = song_vault("filter");
    let source = VaultSource::new(vault.path()).unwrap();
    let mut sync = IndexSync::new(source, Vec::new(), Duration::ZERO);
    sync.rebuild().unwrap();

    let mut session = TimelineSession::default();
    session.set_criteria(FilterCriteria::new().with_importance(3, 5));

    let visible: Vec<&str> = session
        .visible_entities(sync.store())
        .iter()
        .map(|e| e.name())
        .collect();
    assert_eq!(visible, vec!["Crow Terrace Trial"]);
}

#[test]
fn data_sources_restrict_the_scan() {
    let vault = song_vault("data_sources");
    let source = VaultSource::new(vault.path()).unwrap();
    let mut sync = IndexSync::new(source, vec!["events".to_string()], Duration::ZERO);

    let report = sync.rebuild().unwrap();

    assert_eq!(report.admitted, 1);
    assert_eq!(report.skipped, 3);
}

#[test]
fn edits_on_disk_flow_through_change_events() {
    let vault = song_vault("events");
    let source = VaultSource::new(vault.path()).unwrap();
    let mut sync = IndexSync::new(source, Vec::new(), Duration::from_millis(50));
    let now = Instant::now();
    sync.start(now);
    assert!(sync.poll(now + Duration::from_millis(50)).unwrap().is_some());

    let mut session = TimelineSession::default();
    let before = session.layout(sync.store());

    vault.write("people/Wang Anshi.md", "---\ntype: person\nborn: 1021\ndied: 1086\n---\n");
    let action = sync.handle_event(&FileChangeEvent::Changed(id("people/Wang Anshi.md")));
    assert_eq!(action, SyncAction::Upserted);

    fs::remove_file(vault.path().join("events/Crow Terrace Trial.md")).unwrap();
    let action = sync.handle_event(&FileChangeEvent::Deleted(id("events/Crow Terrace Trial.md")));
    assert_eq!(action, SyncAction::Removed);

    let after = session.layout(sync.store());
    assert_eq!(before.len(), 3);
    assert_eq!(after.len(), 3);
    assert!(after.get("people/Wang Anshi.md").is_some());
    assert!(after.get("events/Crow Terrace Trial.md").is_none());
    assert_eq!(
        sync.source().list_documents().unwrap().len(),
        4,
        "hidden folder stays out of the listing"
    );
}

#[test]
fn folder_rename_and_delete_keep_index_in_step() {
    let vault = song_vault("folders");
    let source = VaultSource::new(vault.path()).unwrap();
    let mut sync = IndexSync::new(source, Vec::new(), Duration::ZERO);
    sync.rebuild().unwrap();

    let (people, persons) = (vault.path().join("people"), vault.path().join("persons"));
    fs::rename(&people, &persons).unwrap();
    let events = events_for_paths(sync.source(), [people.as_path(), persons.as_path()]);
    for event in &events {
        sync.handle_event(event);
    }

    let mut ids: Vec<&str> = sync.store().iter().map(|e| e.id().as_str()).collect();
    ids.sort();
    assert_eq!(
        ids,
        vec!["events/Crow Terrace Trial.md", "persons/Ouyang Xiu.md", "persons/Su Shi.md"]
    );

    fs::remove_dir_all(&persons).unwrap();
    let events = events_for_paths(sync.source(), [persons.as_path()]);
    assert_eq!(events, vec![FileChangeEvent::FolderRemoved("persons".to_string())]);
    assert_eq!(sync.handle_event(&events[0]), SyncAction::Removed);
    assert_eq!(sync.store().len(), 1);
    sync.store().check_invariants().unwrap();
}
