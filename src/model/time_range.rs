//! Normalized instant pairs.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

/// Pair of instants with `start <= end`.
///
/// Used both for the data-derived bounding range and for the live viewport.
/// Construction through [`TimeRange::new`] swaps inverted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a range, swapping the endpoints if `end < start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    /// Build from millisecond timestamps, `None` if either is out of chrono's range.
    pub fn from_millis(start_ms: i64, end_ms: i64) -> Option<Self> {
        let start = DateTime::from_timestamp_millis(start_ms)?;
        let end = DateTime::from_timestamp_millis(end_ms)?;
        Some(Self::new(start, end))
    }

    /// Inclusive start.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Inclusive end, never before the start.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Start as Unix milliseconds.
    pub fn start_millis(&self) -> i64 {
        self.start.timestamp_millis()
    }

    /// End as Unix milliseconds.
    pub fn end_millis(&self) -> i64 {
        self.end.timestamp_millis()
    }

    /// Span in milliseconds. Never negative.
    pub fn span_millis(&self) -> i64 {
        self.end_millis() - self.start_millis()
    }

    /// Length of the interval.
    pub fn span(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Midpoint in milliseconds.
    pub fn center_millis(&self) -> i64 {
        self.start_millis() + self.span_millis() / 2
    }

    /// Inclusive containment test.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Inclusive overlap with the interval `[start, end]`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start <= self.end && end >= self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn new_keeps_ordered_endpoints() {
        let range = TimeRange::new(at(1000), at(1100));
        assert_eq!(range.start(), at(1000));
        assert_eq!(range.end(), at(1100));
    }

    #[test]
    fn new_swaps_inverted_endpoints() {
        let range = TimeRange::new(at(1100), at(1000));
        assert_eq!(range.start(), at(1000));
        assert_eq!(range.end(), at(1100));
        assert!(range.span_millis() > 0);
    }

    #[test]
    fn zero_span_is_allowed() {
        let range = TimeRange::new(at(1500), at(1500));
        assert_eq!(range.span_millis(), 0);
        assert_eq!(range.center_millis(), at(1500).timestamp_millis());
    }

    #[test]
    fn contains_is_inclusive() {
        let range = TimeRange::new(at(1000), at(1100));
        assert!(range.contains(at(1000)));
        assert!(range.contains(at(1100)));
        assert!(!range.contains(at(1101)));
    }

    #[test]
    fn overlaps_touching_intervals() {
        let range = TimeRange::new(at(1000), at(1100));
        assert!(range.overlaps(at(1100), at(1200)));
        assert!(range.overlaps(at(900), at(1000)));
        assert!(!range.overlaps(at(1101), at(1200)));
    }

    #[test]
    fn from_millis_round_trips_endpoints() {
        let range = TimeRange::from_millis(0, 86_400_000).unwrap();
        assert_eq!(range.start_millis(), 0);
        assert_eq!(range.end_millis(), 86_400_000);
    }
}
