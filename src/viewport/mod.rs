//! Viewport range controller.
//!
//! Owns the live time range and the transient pointer-drag state. Every
//! range it produces has passed through [`clamp_time_range`] and lies inside
//! the safe window `[year 100-01-01, year 10000-12-31 23:59:59.999]`.
//!
//! # Pointer state machine
//!
//! ```text
//! Idle --down(primary, background)--> PointerDown
//! PointerDown --|dx| > threshold--> Dragging
//! PointerDown --up--> Idle   (GestureOutcome::Click)
//! Dragging    --up--> Idle   (GestureOutcome::DragEnd)
//! ```
//!
//! Panning uses the origin and span captured at pointer-down, never the
//! live range, so a drag does not feed back into its own basis.

use crate::model::TimeRange;
use chrono::{DateTime, Utc};

/// `0100-01-01T00:00:00.000Z` in epoch milliseconds.
pub const SAFE_MIN_MS: i64 = -59_011_459_200_000;
/// `10000-12-31T23:59:59.999Z` in epoch milliseconds.
pub const SAFE_MAX_MS: i64 = 253_433_923_199_999;

/// Pixels of horizontal travel before a press becomes a drag.
pub const DRAG_THRESHOLD_PX: f64 = 5.0;
/// Span multiplier for one zoom-in step.
pub const ZOOM_IN_FACTOR: f64 = 0.8;
/// Span multiplier for one zoom-out step.
pub const ZOOM_OUT_FACTOR: f64 = 1.25;
/// Wheel factor for a positive `delta_y` (scroll down, zoom out).
pub const WHEEL_ZOOM_OUT_FACTOR: f64 = 1.1;
/// Wheel factor for a zero or negative `delta_y`.
pub const WHEEL_ZOOM_IN_FACTOR: f64 = 0.9;
/// Smallest span reachable by the wheel: one day.
pub const MIN_WHEEL_SPAN_MS: i64 = 24 * 60 * 60 * 1000;
/// Largest span reachable by the wheel: 10000 years of 365 days.
pub const MAX_WHEEL_SPAN_MS: i64 = 10_000 * 365 * MIN_WHEEL_SPAN_MS;

const WINDOW_MS: i64 = SAFE_MAX_MS - SAFE_MIN_MS;

/// Pointer button of a press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Usually the left button.
    Primary,
    /// Usually the right button.
    Secondary,
    /// Wheel button.
    Middle,
}

/// What lies under the pointer at press time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitRegion {
    /// Empty timeline area; presses here may start a pan.
    Background,
    /// Cards, buttons, panels. Presses here are left to their owners.
    Interactive,
}

/// Range and pointer position captured when a press begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragOrigin {
    /// Pointer x at press time.
    pub pointer_x: f64,
    /// Range start at press time, in Unix milliseconds.
    pub start_ms: i64,
    /// Range span at press time, in milliseconds.
    pub span_ms: i64,
}

/// Pointer gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PointerPhase {
    /// No button held.
    #[default]
    Idle,
    /// Button held, movement still within the threshold.
    PointerDown(DragOrigin),
    /// Movement exceeded the threshold; panning is live.
    Dragging(DragOrigin),
}

/// Result of releasing the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// No gesture was in progress.
    None,
    /// Press and release without reaching the drag threshold.
    Click,
    /// A pan ended.
    DragEnd,
}

/// Zoom/pan controller over a single clamped time range.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportController {
    range: TimeRange,
    initial: TimeRange,
    phase: PointerPhase,
    container_width: f64,
    drag_threshold: f64,
}

impl ViewportController {
    /// Controller showing `initial` (clamped). [`Self::reset`] returns here.
    pub fn new(initial: TimeRange) -> Self {
        let initial = clamp_time_range(initial);
        Self {
            range: initial,
            initial,
            phase: PointerPhase::Idle,
            container_width: 0.0,
            drag_threshold: DRAG_THRESHOLD_PX,
        }
    }

    /// Sets the drag threshold in pixels; negative values become 0.
    pub fn with_drag_threshold(mut self, threshold_px: f64) -> Self {
        self.drag_threshold = threshold_px.max(0.0);
        self
    }

    /// Current visible range.
    pub fn range(&self) -> TimeRange {
        self.range
    }

    /// Range [`Self::reset`] returns to.
    pub fn initial_range(&self) -> TimeRange {
        self.initial
    }

    /// Current gesture phase.
    pub fn phase(&self) -> PointerPhase {
        self.phase
    }

    /// Whether a pan is live.
    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, PointerPhase::Dragging(_))
    }

    /// Pixel width used to convert drag distance into time.
    pub fn set_container_width(&mut self, width: f64) {
        self.container_width = width;
    }

    /// Pixel width set by [`Self::set_container_width`].
    pub fn container_width(&self) -> f64 {
        self.container_width
    }

    /// Replace the live range. The result is clamped.
    pub fn set_range(&mut self, range: TimeRange) -> TimeRange {
        self.range = clamp_time_range(range);
        self.range
    }

    /// Begin a potential pan.
    ///
    /// Only a primary press on the background starts a gesture. Returns
    /// whether one started.
    pub fn pointer_down(&mut self, x: f64, button: PointerButton, region: HitRegion) -> bool {
        if button != PointerButton::Primary || region != HitRegion::Background {
            return false;
        }
        self.phase = PointerPhase::PointerDown(DragOrigin {
            pointer_x: x,
            start_ms: self.range.start_millis(),
            span_ms: self.range.span_millis(),
        });
        true
    }

    /// Track pointer movement.
    ///
    /// Returns the new range when the move panned the view.
    pub fn pointer_move(&mut self, x: f64) -> Option<TimeRange> {
        let origin = match self.phase {
            PointerPhase::Idle => return None,
            PointerPhase::PointerDown(origin) => {
                if (x - origin.pointer_x).abs() <= self.drag_threshold {
                    return None;
                }
                self.phase = PointerPhase::Dragging(origin);
                origin
            }
            PointerPhase::Dragging(origin) => origin,
        };

        if self.container_width <= 0.0 || !self.container_width.is_finite() {
            return None;
        }
        let span = origin.span_ms as f64;
        let delta = (x - origin.pointer_x) / self.container_width * span;
        let start = origin.start_ms as f64 + delta;
        self.range = clamp_millis(start, start + span);
        Some(self.range)
    }

    /// End the gesture.
    pub fn pointer_up(&mut self) -> GestureOutcome {
        let outcome = match self.phase {
            PointerPhase::Idle => GestureOutcome::None,
            PointerPhase::PointerDown(_) => GestureOutcome::Click,
            PointerPhase::Dragging(_) => GestureOutcome::DragEnd,
        };
        self.phase = PointerPhase::Idle;
        outcome
    }

    /// Shrinks the span by [`ZOOM_IN_FACTOR`] around the centre.
    pub fn zoom_in(&mut self) -> TimeRange {
        self.zoom_by(ZOOM_IN_FACTOR, None)
    }

    /// Grows the span by [`ZOOM_OUT_FACTOR`] around the centre.
    pub fn zoom_out(&mut self) -> TimeRange {
        self.zoom_by(ZOOM_OUT_FACTOR, None)
    }

    /// Wheel zoom around the current center.
    ///
    /// Positive `delta_y` zooms out. The span is held within one day and
    /// 10000 years before the range is clamped.
    pub fn wheel(&mut self, delta_y: f64) -> TimeRange {
        let factor = if delta_y > 0.0 {
            WHEEL_ZOOM_OUT_FACTOR
        } else {
            WHEEL_ZOOM_IN_FACTOR
        };
        self.zoom_by(factor, Some((MIN_WHEEL_SPAN_MS, MAX_WHEEL_SPAN_MS)))
    }

    /// Back to the range captured at construction.
    pub fn reset(&mut self) -> TimeRange {
        self.range = self.initial;
        self.range
    }

    fn zoom_by(&mut self, factor: f64, span_limits: Option<(i64, i64)>) -> TimeRange {
        let center = (self.range.start_millis() as f64 + self.range.end_millis() as f64) / 2.0;
        let mut span = self.range.span_millis() as f64 * factor;
        if let Some((min, max)) = span_limits {
            span = span.clamp(min as f64, max as f64);
        }
        self.range = clamp_millis(center - span / 2.0, center + span / 2.0);
        self.range
    }
}

/// The full safe window as a range.
pub fn safe_window() -> TimeRange {
    TimeRange::new(from_millis(SAFE_MIN_MS), from_millis(SAFE_MAX_MS))
}

/// Clamp `range` into the safe window.
///
/// Keeps the span and center when both ends fit. Otherwise shifts the range
/// to touch the violated boundary, span unchanged. A span wider than the
/// window is truncated to the window, which yields exactly the window.
pub fn clamp_time_range(range: TimeRange) -> TimeRange {
    let start = range.start_millis();
    let end = range.end_millis();
    let span = (end - start).min(WINDOW_MS);
    let center = start + (end - start) / 2;
    shift_into_window(center - span / 2, span)
}

/// [`clamp_time_range`] over raw millisecond values.
///
/// Inverted input is swapped. A non-finite bound is replaced by the other
/// one; when neither is finite the safe window is returned.
pub fn clamp_millis(start: f64, end: f64) -> TimeRange {
    let (start, end) = match (start.is_finite(), end.is_finite()) {
        (true, true) => (start, end),
        (true, false) => (start, start),
        (false, true) => (end, end),
        (false, false) => return safe_window(),
    };
    let (low, high) = if end < start { (end, start) } else { (start, end) };

    let window = WINDOW_MS as f64;
    let span = (high - low).min(window);
    // Anything further out than one window lands on the same boundary.
    let center = (low + (high - low) / 2.0)
        .clamp(SAFE_MIN_MS as f64 - window, SAFE_MAX_MS as f64 + window);
    let span_ms = (span.round() as i64).min(WINDOW_MS);
    shift_into_window((center - span / 2.0).round() as i64, span_ms)
}

fn shift_into_window(start: i64, span: i64) -> TimeRange {
    let start = if start < SAFE_MIN_MS {
        SAFE_MIN_MS
    } else if start + span > SAFE_MAX_MS {
        SAFE_MAX_MS - span
    } else {
        start
    };
    TimeRange::new(from_millis(start), from_millis(start + span))
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
#[path = "viewport_tests.rs"]
mod tests;
