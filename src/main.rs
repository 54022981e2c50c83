//! chronotrack - Entry Point

use chronotrack::config::{self, CliOverrides, ResolvedConfig};
use chronotrack::index::{EntityStore, FilterCriteria};
use chronotrack::layout::format_date;
use chronotrack::model::{AppError, EntityId, EntityType};
use chronotrack::source::sync::SyncAction;
use chronotrack::source::{IndexSync, VaultSource, VaultWatcher};
use chronotrack::timeline::{TickMark, TimelineSession};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::info;

/// How often `--watch` drains notifications and checks the scheduler.
const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Output format for the layout listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// One JSON document.
    Json,
}

/// chronotrack - lay out timestamped notes on a time axis
#[derive(Parser, Debug)]
#[command(name = "chronotrack")]
#[command(version)]
#[command(about = "Index a vault of timestamped notes and pack them into non-overlapping tracks")]
pub struct Args {
    /// Vault directory (defaults to the current directory)
    pub vault: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Only index documents under this folder (repeatable)
    #[arg(long = "data-source")]
    pub data_sources: Vec<String>,

    /// Case-insensitive search over names and participants
    #[arg(short, long)]
    pub search: Option<String>,

    /// Only show entities of this type (repeatable)
    #[arg(short = 't', long = "type", value_parser = parse_entity_type)]
    pub types: Vec<EntityType>,

    /// Only show entities carrying this tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Importance window, e.g. `3-5`
    #[arg(long, value_parser = parse_importance_range)]
    pub importance: Option<(u8, u8)>,

    /// Drawing width in pixels
    #[arg(long)]
    pub width: Option<f64>,

    /// Zoom steps from the initial range; negative zooms out
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub zoom: i32,

    /// List entities related to this id instead of the layout
    #[arg(long, value_parser = parse_entity_id)]
    pub related: Option<EntityId>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Keep watching the vault and report changes
    #[arg(short, long)]
    pub watch: bool,

    /// Print index statistics
    #[arg(long)]
    pub stats: bool,
}

impl Args {
    fn criteria(&self) -> FilterCriteria {
        let mut criteria = FilterCriteria::new()
            .with_types(self.types.iter().copied())
            .with_tags(self.tags.iter().cloned());
        if let Some((min, max)) = self.importance {
            criteria = criteria.with_importance(min, max);
        }
        if let Some(search) = &self.search {
            criteria = criteria.with_search(search.clone());
        }
        criteria
    }

    fn cli_overrides(&self) -> CliOverrides {
        CliOverrides {
            data_sources: (!self.data_sources.is_empty()).then(|| self.data_sources.clone()),
            width: self.width,
            log_file_path: None,
        }
    }
}

fn parse_entity_type(raw: &str) -> Result<EntityType, String> {
    EntityType::try_parse(raw).ok_or_else(|| {
        format!("unknown type '{raw}' (expected person, event, concept or location)")
    })
}

fn parse_entity_id(raw: &str) -> Result<EntityId, String> {
    EntityId::new(raw).map_err(|e| e.to_string())
}

fn parse_importance_range(raw: &str) -> Result<(u8, u8), String> {
    let (min, max) = raw.split_once('-').unwrap_or((raw, raw));
    let parse = |s: &str| {
        s.trim()
            .parse::<u8>()
            .ok()
            .filter(|n| (1..=5).contains(n))
            .ok_or_else(|| format!("'{s}' is not an importance between 1 and 5"))
    };
    let (min, max) = (parse(min)?, parse(max)?);
    if min > max {
        return Err(format!("empty importance range {min}-{max}"));
    }
    Ok((min, max))
}

// ===== Output =====

/// One laid-out card.
#[derive(Debug, Serialize)]
struct Row<'a> {
    id: &'a str,
    name: &'a str,
    label: String,
    track: usize,
    x: f64,
    y: f64,
    width: f64,
}

#[derive(Debug, Serialize)]
struct LayoutReport<'a> {
    start: String,
    end: String,
    track_count: usize,
    overflow_tracks: usize,
    entities: Vec<Row<'a>>,
    ticks: Vec<TickMark>,
}

fn layout_report<'s>(session: &mut TimelineSession, store: &'s EntityStore) -> LayoutReport<'s> {
    let range = session.range(store);
    let layout = session.layout(store);
    let ticks = session.ticks(store);
    let cap = session.renderer().max_display_tracks();

    let entities = layout
        .iter()
        .filter_map(|(id, card)| {
            let entity = store.get(id.as_str())?;
            Some(Row {
                id: entity.id().as_str(),
                name: entity.name(),
                label: format_date(entity.time_start()),
                track: card.track,
                x: card.x,
                y: card.y,
                width: card.width,
            })
        })
        .collect();

    LayoutReport {
        start: format_date(range.start()),
        end: format_date(range.end()),
        track_count: layout.track_count,
        overflow_tracks: layout.overflow_track_count(cap),
        entities,
        ticks,
    }
}

fn write_text(out: &mut impl Write, report: &LayoutReport<'_>) -> std::io::Result<()> {
    writeln!(
        out,
        "{} .. {}  ({} entities, {} tracks)",
        report.start,
        report.end,
        report.entities.len(),
        report.track_count
    )?;
    for row in &report.entities {
        writeln!(
            out,
            "{:>3} {:>9.1} {:>6.1} {:>8.1}  {:<10} {}",
            row.track, row.x, row.y, row.width, row.label, row.id
        )?;
    }
    if report.overflow_tracks > 0 {
        writeln!(out, "+{} more tracks", report.overflow_tracks)?;
    }
    let labels: Vec<&str> = report.ticks.iter().map(|t| t.label.as_str()).collect();
    writeln!(out, "ticks: {}", labels.join(" | "))
}

fn write_related(
    out: &mut impl Write,
    store: &EntityStore,
    session: &mut TimelineSession,
    id: &EntityId,
    format: OutputFormat,
) -> Result<(), AppError> {
    session.select(Some(id.clone()));
    let related: Vec<&str> = session
        .related(store)
        .iter()
        .map(|e| e.id().as_str())
        .collect();
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&related)?)?,
        OutputFormat::Text => {
            for id in related {
                writeln!(out, "{id}")?;
            }
        }
    }
    Ok(())
}

fn apply_zoom(session: &mut TimelineSession, store: &EntityStore, steps: i32) {
    session.range(store);
    for _ in 0..steps.unsigned_abs() {
        if steps > 0 {
            session.zoom_in();
        } else {
            session.zoom_out();
        }
    }
}

fn write_stats(
    out: &mut impl Write,
    store: &EntityStore,
    format: OutputFormat,
) -> Result<(), AppError> {
    let stats = store.get_stats();
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?,
        OutputFormat::Text => writeln!(out, "{} entities ({})", stats.total, stats.summary())?,
    }
    Ok(())
}

fn write_output(
    out: &mut impl Write,
    args: &Args,
    store: &EntityStore,
    session: &mut TimelineSession,
) -> Result<(), AppError> {
    if args.stats {
        return write_stats(out, store, args.format);
    }
    if let Some(id) = &args.related {
        return write_related(out, store, session, id, args.format);
    }
    let report = layout_report(session, store);
    match args.format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?,
        OutputFormat::Text => write_text(out, &report)?,
    }
    Ok(())
}

// ===== Main =====

fn watch(
    sync: &mut IndexSync<VaultSource>,
    session: &mut TimelineSession,
    format: OutputFormat,
) -> Result<(), AppError> {
    let watcher = VaultWatcher::new(sync.source())?;
    let stdout = std::io::stdout();
    loop {
        let events = watcher.poll_events(sync.source());
        let mut changed = false;
        for event in &events {
            match sync.handle_event(event) {
                SyncAction::Upserted | SyncAction::Removed => changed = true,
                // A document we could not read may be half-written; rescan soon.
                SyncAction::Faulted => sync.request_rebuild(Instant::now()),
                SyncAction::Ignored | SyncAction::Unchanged => {}
            }
        }
        if sync.poll(Instant::now())?.is_some() || changed {
            session.invalidate();
            write_stats(&mut stdout.lock(), sync.store(), format)?;
        }
        std::thread::sleep(WATCH_POLL_INTERVAL);
    }
}

fn run(args: Args) -> Result<(), AppError> {
    // Defaults → Config File → Env Vars → CLI Args
    let config: ResolvedConfig = config::resolve(args.config.clone(), args.cli_overrides())?;

    chronotrack::logging::init(&config.log_file_path)?;
    info!(config = ?config, "Configuration loaded and resolved");

    let vault = VaultSource::new(args.vault.clone().unwrap_or_else(|| PathBuf::from(".")))?;
    let mut sync = IndexSync::new(vault, config.data_sources.clone(), config.initial_scan_delay);
    let report = sync.rebuild()?;
    info!(
        admitted = report.admitted,
        faults = report.faults().count(),
        "Initial scan complete"
    );

    let mut session = config.timeline_session();
    session.set_criteria(args.criteria());
    apply_zoom(&mut session, sync.store(), args.zoom);

    write_output(&mut std::io::stdout().lock(), &args, sync.store(), &mut session)?;

    if args.watch {
        watch(&mut sync, &mut session, args.format)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use chronotrack::model::Entity;

    fn store() -> EntityStore {
        let mut store = EntityStore::new();
        for (id, year, tags) in [
            ("Su Shi.md", 1037, vec!["song"]),
            ("Ouyang Xiu.md", 1007, vec!["song"]),
            ("Exam.md", 1057, vec![]),
        ] {
            store.upsert(
                Entity::new(
                    EntityId::new(id).unwrap(),
                    EntityType::Person,
                    id.trim_end_matches(".md"),
                    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap(),
                )
                .with_tags(tags.into_iter().map(String::from).collect()),
            );
        }
        store
    }

    #[test]
    fn test_help_does_not_error() {
        let result = Args::try_parse_from(["chronotrack", "--help"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_does_not_error() {
        let result = Args::try_parse_from(["chronotrack", "--version"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_no_args_defaults() {
        let args = Args::parse_from(["chronotrack"]);
        assert_eq!(args.vault, None);
        assert_eq!(args.config, None);
        assert!(args.types.is_empty());
        assert_eq!(args.importance, None);
        assert_eq!(args.zoom, 0);
        assert_eq!(args.format, OutputFormat::Text);
        assert!(!args.watch);
        assert!(!args.stats);
        assert!(args.criteria().is_empty());
        assert_eq!(args.cli_overrides(), CliOverrides::default());
    }

    #[test]
    fn test_vault_path_populates_vault_field() {
        let args = Args::parse_from(["chronotrack", "notes"]);
        assert_eq!(args.vault, Some(PathBuf::from("notes")));
    }

    #[test]
    fn test_repeated_filters_build_criteria() {
        let args = Args::parse_from([
            "chronotrack",
            "--type",
            "Person",
            "-t",
            "event",
            "--tag",
            "song",
            "--importance",
            "3-5",
            "-s",
            "su",
        ]);
        let criteria = args.criteria();
        assert_eq!(criteria.types, vec![EntityType::Person, EntityType::Event]);
        assert_eq!(criteria.tags, vec!["song"]);
        assert_eq!(criteria.importance, Some((3, 5)));
        assert_eq!(criteria.search.as_deref(), Some("su"));
    }

    #[test]
    fn test_unknown_type_rejects() {
        let result = Args::try_parse_from(["chronotrack", "--type", "dynasty"]);
        assert_eq!(result.unwrap_err().kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_importance_range_parsing() {
        assert_eq!(parse_importance_range("4"), Ok((4, 4)));
        assert_eq!(parse_importance_range("1-5"), Ok((1, 5)));
        assert!(parse_importance_range("5-1").is_err());
        assert!(parse_importance_range("0-3").is_err());
        assert!(parse_importance_range("a-b").is_err());
    }

    #[test]
    fn test_negative_zoom_and_format() {
        let args = Args::parse_from(["chronotrack", "--zoom", "-2", "--format", "json"]);
        assert_eq!(args.zoom, -2);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_data_sources_and_width_become_overrides() {
        let args = Args::parse_from([
            "chronotrack",
            "--data-source",
            "people",
            "--data-source",
            "events",
            "--width",
            "1200",
        ]);
        let overrides = args.cli_overrides();
        assert_eq!(
            overrides.data_sources,
            Some(vec!["people".to_string(), "events".to_string()])
        );
        assert_eq!(overrides.width, Some(1200.0));
    }

    #[test]
    fn test_text_output_lists_cards_in_layout_order() {
        let store = store();
        let mut session = TimelineSession::default();
        let args = Args::parse_from(["chronotrack"]);

        let mut out = Vec::new();
        write_output(&mut out, &args, &store, &mut session).unwrap();
        let text = String::from_utf8(out).unwrap();

        let position = |id: &str| text.find(id).unwrap();
        assert!(position("Ouyang Xiu.md") < position("Su Shi.md"));
        assert!(position("Su Shi.md") < position("Exam.md"));
        assert!(text.lines().next().unwrap().contains("(3 entities, 1 tracks)"));
        assert!(text.lines().last().unwrap().starts_with("ticks: "));
    }

    #[test]
    fn test_related_output() {
        let store = store();
        let mut session = TimelineSession::default();
        let args = Args::parse_from(["chronotrack", "--related", "Su Shi.md"]);

        let mut out = Vec::new();
        write_output(&mut out, &args, &store, &mut session).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "Ouyang Xiu.md\n");
    }

    #[test]
    fn test_stats_json_output() {
        let store = store();
        let mut session = TimelineSession::default();
        let args = Args::parse_from(["chronotrack", "--stats", "--format", "json"]);

        let mut out = Vec::new();
        write_output(&mut out, &args, &store, &mut session).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(json["total"], 3);
        assert_eq!(json["by_type"]["person"], 3);
    }

    #[test]
    fn test_zoom_narrows_range() {
        let store = store();
        let mut session = TimelineSession::default();
        let initial = session.range(&store);

        apply_zoom(&mut session, &store, 2);

        assert!(session.range(&store).span_millis() < initial.span_millis());
    }
}
