//! Temporal track-packing layout engine.
//!
//! Pure functions from (entities, time scale) to non-overlapping card
//! rectangles. Nothing here is stored as a source of truth: every
//! [`LayoutResult`] can be recomputed from the entity list and the scale.

pub mod time_scale;

pub use time_scale::TimeScale;

use crate::model::{Entity, EntityId, TimeRange};
use chrono::{DateTime, Datelike, Months, TimeDelta, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use time_scale::DAY_MS;

/// Vertical distance between track origins.
pub const TRACK_HEIGHT: f64 = 80.0;
/// Fixed card height.
pub const CARD_HEIGHT: f64 = 60.0;
/// Minimum card width, also the pixel extent given to point entities.
pub const MIN_CARD_WIDTH: f64 = 100.0;
/// Display ceiling on the number of tracks used for height budgeting.
pub const MAX_DISPLAY_TRACKS: usize = 10;
/// Default number of ticks requested from a scale.
pub const DEFAULT_TICK_COUNT: usize = 10;

/// Inner padding of the drawable area, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Padding {
    /// Top padding in pixels.
    pub top: f64,
    /// Right padding in pixels.
    pub right: f64,
    /// Bottom padding in pixels.
    pub bottom: f64,
    /// Left padding in pixels.
    pub left: f64,
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            top: 40.0,
            right: 20.0,
            bottom: 40.0,
            left: 20.0,
        }
    }
}

/// Pixel geometry of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineBounds {
    /// Total width in pixels.
    pub width: f64,
    /// Total height in pixels.
    pub height: f64,
    /// Space kept clear around the tracks.
    pub padding: Padding,
}

impl Default for TimelineBounds {
    fn default() -> Self {
        Self {
            width: 2000.0,
            height: 800.0,
            padding: Padding::default(),
        }
    }
}

impl TimelineBounds {
    /// Horizontal space between the left and right padding. Never negative.
    pub fn effective_width(&self) -> f64 {
        (self.width - self.padding.left - self.padding.right).max(0.0)
    }

    /// Bit patterns of every field, for use in hashable cache keys.
    pub fn to_bits(&self) -> [u64; 6] {
        [
            self.width.to_bits(),
            self.height.to_bits(),
            self.padding.top.to_bits(),
            self.padding.right.to_bits(),
            self.padding.bottom.to_bits(),
            self.padding.left.to_bits(),
        ]
    }
}

/// Computed card rectangle for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntityLayout {
    /// Left edge in pixels.
    pub x: f64,
    /// Top edge in pixels.
    pub y: f64,
    /// Card width in pixels.
    pub width: f64,
    /// Card height in pixels.
    pub height: f64,
    /// Track the entity was packed into (0-based).
    pub track: usize,
}

/// Output of [`TimelineRenderer::calculate_layout`].
///
/// `positions` iterates in layout order: ascending start, ties in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutResult {
    /// Card geometry in layout order.
    pub positions: IndexMap<EntityId, EntityLayout>,
    /// Number of tracks the packing produced. Unbounded.
    pub track_count: usize,
}

impl LayoutResult {
    /// Geometry of `id`, if laid out.
    pub fn get(&self, id: &str) -> Option<&EntityLayout> {
        self.positions.get(id)
    }

    /// Number of laid-out entities.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether nothing was laid out.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Geometry in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &EntityLayout)> {
        self.positions.iter()
    }

    /// Tracks that fit under the display ceiling.
    pub fn displayed_track_count(&self, cap: usize) -> usize {
        self.track_count.min(cap)
    }

    /// Tracks beyond the display ceiling, for an overflow indicator.
    pub fn overflow_track_count(&self, cap: usize) -> usize {
        self.track_count.saturating_sub(cap)
    }
}

/// Layout engine bound to a pixel geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineRenderer {
    bounds: TimelineBounds,
    max_display_tracks: usize,
}

impl Default for TimelineRenderer {
    fn default() -> Self {
        Self::new(TimelineBounds::default())
    }
}

impl TimelineRenderer {
    /// Renderer for `bounds` with the default track cap.
    pub fn new(bounds: TimelineBounds) -> Self {
        Self {
            bounds,
            max_display_tracks: MAX_DISPLAY_TRACKS,
        }
    }

    /// Override the display ceiling used by [`Self::total_height`].
    pub fn with_max_display_tracks(mut self, max_display_tracks: usize) -> Self {
        self.max_display_tracks = max_display_tracks;
        self
    }

    /// Current pixel geometry.
    pub fn bounds(&self) -> TimelineBounds {
        self.bounds
    }

    /// Replaces the pixel geometry, e.g. after a resize.
    pub fn set_bounds(&mut self, bounds: TimelineBounds) {
        self.bounds = bounds;
    }

    /// Tracks counted in `total_height`.
    pub fn max_display_tracks(&self) -> usize {
        self.max_display_tracks
    }

    /// Scale mapping `range` onto `[padding.left, padding.left + effective_width]`.
    pub fn create_time_scale(&self, range: &TimeRange) -> TimeScale {
        let left = self.bounds.padding.left;
        TimeScale::new(*range, (left, left + self.bounds.effective_width()))
    }

    /// Greedy interval partitioning of `entities` into tracks.
    ///
    /// # Algorithm
    /// 1. Stable sort by `time_start` (ties keep input order).
    /// 2. `start_x = scale(time_start)`; `end_x = scale(time_end)`, or
    ///    `start_x + MIN_CARD_WIDTH` for point entities.
    /// 3. Assign the first track whose recorded end is strictly less than
    ///    `start_x`; append a new track if none is free.
    /// 4. Card: `x = start_x`, `y = padding.top + track * TRACK_HEIGHT`,
    ///    `width = max(end_x - start_x, MIN_CARD_WIDTH)`, `height = CARD_HEIGHT`.
    /// 5. The track's recorded end becomes `end_x`.
    ///
    /// Every entity carries a `time_start` by construction, so none is skipped.
    ///
    /// # Invariants
    /// - Within a track, each entity's `start_x` is strictly greater than the
    ///   previous occupant's `end_x`.
    /// - Deterministic: same inputs, same output.
    pub fn calculate_layout(&self, entities: &[&Entity], scale: &TimeScale) -> LayoutResult {
        let mut sorted = entities.to_vec();
        sorted.sort_by_key(|e| e.time_start());

        let mut track_ends: Vec<f64> = Vec::new();
        let mut positions = IndexMap::with_capacity(sorted.len());

        for entity in sorted {
            let start_x = scale.apply(entity.time_start());
            let end_x = match entity.time_end() {
                Some(end) => scale.apply(end),
                None => start_x + MIN_CARD_WIDTH,
            };

            let track = match track_ends.iter().position(|&end| end < start_x) {
                Some(free) => free,
                None => {
                    track_ends.push(f64::NEG_INFINITY);
                    track_ends.len() - 1
                }
            };
            track_ends[track] = end_x.max(start_x);

            positions.insert(
                entity.id().clone(),
                EntityLayout {
                    x: start_x,
                    y: self.bounds.padding.top + track as f64 * TRACK_HEIGHT,
                    width: (end_x - start_x).max(MIN_CARD_WIDTH),
                    height: CARD_HEIGHT,
                    track,
                },
            );
        }

        tracing::trace!(
            entities = positions.len(),
            tracks = track_ends.len(),
            "layout computed"
        );
        LayoutResult {
            positions,
            track_count: track_ends.len(),
        }
    }

    /// Card width for one entity under `scale`.
    pub fn calculate_entity_width(&self, entity: &Entity, scale: &TimeScale) -> f64 {
        match entity.time_end() {
            Some(end) => (scale.apply(end) - scale.apply(entity.time_start())).max(MIN_CARD_WIDTH),
            None => MIN_CARD_WIDTH,
        }
    }

    /// Up to about `count` calendar-aligned tick instants across the scale domain.
    pub fn generate_time_ticks(&self, scale: &TimeScale, count: usize) -> Vec<DateTime<Utc>> {
        scale.ticks(count)
    }

    /// Height budget for `track_count` tracks, capped at the display ceiling.
    pub fn total_height(&self, track_count: usize) -> f64 {
        let padding = self.bounds.padding;
        padding.top
            + track_count.min(self.max_display_tracks) as f64 * TRACK_HEIGHT
            + padding.bottom
    }

    /// Default range for `entities` relative to the current clock.
    pub fn calculate_time_range(&self, entities: &[&Entity]) -> TimeRange {
        calculate_time_range_at(entities, Utc::now())
    }
}

/// Default range for `entities` relative to `now`.
///
/// Empty input yields `[now - 12 months, now]`. Otherwise the bounding range
/// of all starts and effective ends, padded on both sides by 10% of its span
/// with a floor of one day.
pub fn calculate_time_range_at(entities: &[&Entity], now: DateTime<Utc>) -> TimeRange {
    let Some(min_start) = entities.iter().map(|e| e.time_start()).min() else {
        let year_ago = now
            .checked_sub_months(Months::new(12))
            .unwrap_or(now - TimeDelta::days(365));
        return TimeRange::new(year_ago, now);
    };
    let max_end = entities
        .iter()
        .map(|e| e.effective_end())
        .max()
        .unwrap_or(min_start);

    let span = (max_end - min_start).num_milliseconds();
    let padding = TimeDelta::milliseconds((span / 10).max(DAY_MS));
    TimeRange::new(
        min_start.checked_sub_signed(padding).unwrap_or(min_start),
        max_end.checked_add_signed(padding).unwrap_or(max_end),
    )
}

/// Tick and axis label.
///
/// Negative years read `"<abs> BCE"`, years below 1000 are bare, everything
/// else is `YYYY-MM`.
pub fn format_date(date: DateTime<Utc>) -> String {
    let year = date.year();
    if year < 0 {
        format!("{} BCE", year.unsigned_abs())
    } else if year < 1000 {
        year.to_string()
    } else {
        format!("{year}-{:02}", date.month())
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
