//! Deterministic cache keys for timeline artifacts.
//!
//! Identifying lists are sorted before a key is built, so reordering the
//! same inputs always produces the same key. Floating-point geometry is
//! keyed by bit pattern.

use crate::index::FilterCriteria;
use crate::layout::TimelineBounds;
use crate::model::{Entity, EntityId, TimeRange};

/// Key for a memoized layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutCacheKey {
    ids: Vec<EntityId>,
    start_ms: i64,
    end_ms: i64,
    bounds: [u64; 6],
    revision: u64,
}

impl LayoutCacheKey {
    /// `revision` is the store revision the entities were read at; it keys
    /// out in-place replacements that keep the same ids.
    pub fn new(
        entities: &[&Entity],
        range: &TimeRange,
        bounds: &TimelineBounds,
        revision: u64,
    ) -> Self {
        let mut ids: Vec<EntityId> = entities.iter().map(|e| e.id().clone()).collect();
        ids.sort();
        Self {
            ids,
            start_ms: range.start_millis(),
            end_ms: range.end_millis(),
            bounds: bounds.to_bits(),
            revision,
        }
    }
}

/// Key for a memoized filter result over one store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterCacheKey {
    criteria: FilterCriteria,
    revision: u64,
}

impl FilterCacheKey {
    /// Key over the canonical form of `criteria`.
    pub fn new(criteria: &FilterCriteria, revision: u64) -> Self {
        Self {
            criteria: criteria.canonical(),
            revision,
        }
    }
}

/// Key for a memoized time scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeScaleKey {
    start_ms: i64,
    end_ms: i64,
    pixels: [u64; 2],
}

impl TimeScaleKey {
    /// Key for `range` mapped onto the pixel interval `pixels`.
    pub fn new(range: &TimeRange, pixels: (f64, f64)) -> Self {
        Self {
            start_ms: range.start_millis(),
            end_ms: range.end_millis(),
            pixels: [pixels.0.to_bits(), pixels.1.to_bits()],
        }
    }
}
