//! Configuration file loading with precedence handling.

use crate::cache::CacheCapacities;
use crate::layout::{
    Padding, TimelineBounds, TimelineRenderer, DEFAULT_TICK_COUNT, MAX_DISPLAY_TRACKS,
};
use crate::source::scheduler::DEFAULT_REBUILD_DELAY;
use crate::timeline::TimelineSession;
use crate::viewport::DRAG_THRESHOLD_PX;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Env var naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CHRONOTRACK_CONFIG";
/// Env var holding comma-separated data-source folders.
pub const DATA_SOURCES_ENV_VAR: &str = "CHRONOTRACK_DATA_SOURCES";

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file path contains invalid UTF-8 or cannot be resolved.
    #[error("Invalid config path: {0}")]
    InvalidPath(String),

    /// Failed to read config file (file may not exist or have permission issues).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML syntax.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// All fields are optional - if not specified, hardcoded defaults are used.
/// Corresponds to `~/.config/chronotrack/config.toml`.
///
/// ```toml
/// data_sources = ["people", "events"]
/// initial_scan_delay_ms = 500
///
/// [layout]
/// width = 1600
/// max_display_tracks = 8
///
/// [cache]
/// layout_capacity = 100
///
/// [viewport]
/// drag_threshold_px = 3.0
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Folder prefixes to index. Empty or absent means the whole vault.
    #[serde(default)]
    pub data_sources: Option<Vec<String>>,

    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,

    /// Delay before the first full scan.
    #[serde(default)]
    pub initial_scan_delay_ms: Option<u64>,

    /// `[layout]` section.
    #[serde(default)]
    pub layout: Option<LayoutSection>,

    /// `[cache]` section.
    #[serde(default)]
    pub cache: Option<CacheSection>,

    /// `[viewport]` section.
    #[serde(default)]
    pub viewport: Option<ViewportSection>,
}

/// `[layout]` section: pixel geometry and axis density.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LayoutSection {
    /// Timeline width in pixels.
    #[serde(default)]
    pub width: Option<f64>,
    /// Timeline height in pixels.
    #[serde(default)]
    pub height: Option<f64>,
    /// Top padding in pixels.
    #[serde(default)]
    pub padding_top: Option<f64>,
    /// Right padding in pixels.
    #[serde(default)]
    pub padding_right: Option<f64>,
    /// Bottom padding in pixels.
    #[serde(default)]
    pub padding_bottom: Option<f64>,
    /// Left padding in pixels.
    #[serde(default)]
    pub padding_left: Option<f64>,
    /// Tracks shown before the rest is reported as overflow.
    #[serde(default)]
    pub max_display_tracks: Option<usize>,
    /// Target number of axis ticks.
    #[serde(default)]
    pub tick_count: Option<usize>,
}

/// `[cache]` section. A capacity of 0 selects the cache default.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    /// Entries kept by the layout cache.
    #[serde(default)]
    pub layout_capacity: Option<usize>,
    /// Entries kept by the filter cache.
    #[serde(default)]
    pub filter_capacity: Option<usize>,
    /// Entries kept by the time-scale cache.
    #[serde(default)]
    pub time_scale_capacity: Option<usize>,
}

/// `[viewport]` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ViewportSection {
    /// Pointer travel in pixels before a press becomes a drag.
    #[serde(default)]
    pub drag_threshold_px: Option<f64>,
}

/// Resolved configuration after applying precedence rules.
///
/// Created by merging defaults, config file, env vars, and CLI args.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Normalised data-source folders; empty means everything.
    pub data_sources: Vec<String>,
    /// Path to log file for tracing output.
    pub log_file_path: PathBuf,
    /// Delay before the first full scan.
    pub initial_scan_delay: Duration,
    /// Pixel geometry of the timeline.
    pub bounds: TimelineBounds,
    /// Tracks shown before overflow.
    pub max_display_tracks: usize,
    /// Target number of axis ticks.
    pub tick_count: usize,
    /// Capacity of each session cache.
    pub cache: CacheCapacities,
    /// Pointer travel in pixels before a press becomes a drag.
    pub drag_threshold_px: f64,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            data_sources: Vec::new(),
            log_file_path: default_log_path(),
            initial_scan_delay: DEFAULT_REBUILD_DELAY,
            bounds: TimelineBounds::default(),
            max_display_tracks: MAX_DISPLAY_TRACKS,
            tick_count: DEFAULT_TICK_COUNT,
            cache: CacheCapacities::default(),
            drag_threshold_px: DRAG_THRESHOLD_PX,
        }
    }
}

impl ResolvedConfig {
    /// Renderer carrying the configured bounds and track cap.
    pub fn renderer(&self) -> TimelineRenderer {
        TimelineRenderer::new(self.bounds).with_max_display_tracks(self.max_display_tracks)
    }

    /// Fresh session carrying the configured geometry, caches and gestures.
    pub fn timeline_session(&self) -> TimelineSession {
        TimelineSession::new(self.renderer(), self.cache)
            .with_drag_threshold(self.drag_threshold_px)
            .with_tick_count(self.tick_count)
    }
}

/// Overrides from command-line flags. `None` leaves the value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    /// Replaces the data-source folders.
    pub data_sources: Option<Vec<String>>,
    /// Replaces the timeline width.
    pub width: Option<f64>,
    /// Replaces the log file path.
    pub log_file_path: Option<PathBuf>,
}

/// Resolve default log file path.
///
/// Returns `~/.local/state/chronotrack/chronotrack.log` on Linux, or the
/// platform state directory elsewhere. Falls back to the current directory.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        state_dir.join("chronotrack").join("chronotrack.log")
    } else {
        PathBuf::from("chronotrack.log")
    }
}

/// Load configuration file from a specific path.
///
/// Returns `Ok(None)` if file doesn't exist (not an error - use defaults).
///
/// # Errors
///
/// Returns error if file exists but has read or parse errors.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();

    // Missing file is not an error - use defaults
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    Ok(Some(config))
}

/// Resolve default config file path.
///
/// Returns `~/.config/chronotrack/config.toml` on Linux.
/// Returns `None` if the config directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("chronotrack").join("config.toml"))
}

/// Load configuration with precedence handling.
///
/// Precedence (highest to lowest):
/// 1. Explicit `config_path` argument (CLI `--config`)
/// 2. `CHRONOTRACK_CONFIG` environment variable
/// 3. Default path `~/.config/chronotrack/config.toml`
///
/// Missing config files are NOT errors - defaults are used.
///
/// # Errors
///
/// Returns error only if a config file exists but cannot be read or parsed,
/// or if `CHRONOTRACK_CONFIG` is not valid Unicode.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }

    match std::env::var(CONFIG_ENV_VAR) {
        Ok(env_path) => return load_config_file(PathBuf::from(env_path)),
        Err(std::env::VarError::NotUnicode(raw)) => {
            return Err(ConfigError::InvalidPath(raw.to_string_lossy().into_owned()))
        }
        Err(std::env::VarError::NotPresent) => {}
    }

    if let Some(default_path) = default_config_path() {
        return load_config_file(default_path);
    }

    Ok(None)
}

/// Split a comma-separated folder list, dropping blanks.
pub fn parse_data_sources(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Apply environment variable overrides to resolved config.
///
/// Checks for:
/// - `CHRONOTRACK_DATA_SOURCES`: comma-separated data-source folders
pub fn apply_env_overrides(mut config: ResolvedConfig) -> ResolvedConfig {
    if let Ok(raw) = std::env::var(DATA_SOURCES_ENV_VAR) {
        config.data_sources = parse_data_sources(&raw);
    }
    config
}

/// Merge config file into defaults to create resolved config.
///
/// For each field in `ConfigFile`, if `Some(value)`, use it; otherwise use default.
pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    let Some(config) = config_file else {
        return defaults;
    };

    let layout = config.layout.unwrap_or_default();
    let cache = config.cache.unwrap_or_default();
    let viewport = config.viewport.unwrap_or_default();
    let default_padding = Padding::default();

    ResolvedConfig {
        data_sources: config.data_sources.unwrap_or(defaults.data_sources),
        log_file_path: config.log_file_path.unwrap_or(defaults.log_file_path),
        initial_scan_delay: config
            .initial_scan_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.initial_scan_delay),
        bounds: TimelineBounds {
            width: layout.width.unwrap_or(defaults.bounds.width),
            height: layout.height.unwrap_or(defaults.bounds.height),
            padding: Padding {
                top: layout.padding_top.unwrap_or(default_padding.top),
                right: layout.padding_right.unwrap_or(default_padding.right),
                bottom: layout.padding_bottom.unwrap_or(default_padding.bottom),
                left: layout.padding_left.unwrap_or(default_padding.left),
            },
        },
        max_display_tracks: layout
            .max_display_tracks
            .unwrap_or(defaults.max_display_tracks),
        tick_count: layout.tick_count.unwrap_or(defaults.tick_count),
        cache: CacheCapacities {
            layout: cache.layout_capacity.unwrap_or(defaults.cache.layout),
            filter: cache.filter_capacity.unwrap_or(defaults.cache.filter),
            time_scale: cache
                .time_scale_capacity
                .unwrap_or(defaults.cache.time_scale),
        },
        drag_threshold_px: viewport
            .drag_threshold_px
            .unwrap_or(defaults.drag_threshold_px),
    }
}

/// Apply CLI argument overrides to resolved config.
///
/// CLI args have the highest precedence and override all other sources.
///
/// Precedence chain: Defaults → Config File → Env Vars → CLI Args (highest)
pub fn apply_cli_overrides(mut config: ResolvedConfig, overrides: CliOverrides) -> ResolvedConfig {
    if let Some(data_sources) = overrides.data_sources {
        config.data_sources = data_sources;
    }
    if let Some(width) = overrides.width {
        config.bounds.width = width;
    }
    if let Some(path) = overrides.log_file_path {
        config.log_file_path = path;
    }
    config
}

/// Full precedence chain in one call.
///
/// # Errors
///
/// Propagates config file read and parse errors.
pub fn resolve(
    config_path: Option<PathBuf>,
    overrides: CliOverrides,
) -> Result<ResolvedConfig, ConfigError> {
    let file = load_config_with_precedence(config_path)?;
    let config = apply_env_overrides(merge_config(file));
    Ok(apply_cli_overrides(config, overrides))
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
