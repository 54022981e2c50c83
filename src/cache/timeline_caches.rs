//! Cache bundle owned by a timeline session.

use super::keys::{FilterCacheKey, LayoutCacheKey, TimeScaleKey};
use super::RecencyCache;
use crate::layout::{LayoutResult, TimeScale};
use crate::model::EntityId;
use serde::Serialize;
use std::rc::Rc;

/// Capacity of each cache in a [`TimelineCaches`] bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheCapacities {
    /// Layout results.
    pub layout: usize,
    /// Filtered id lists.
    pub filter: usize,
    /// Time scales.
    pub time_scale: usize,
}

impl Default for CacheCapacities {
    fn default() -> Self {
        Self {
            layout: 50,
            filter: 50,
            time_scale: 20,
        }
    }
}

/// Number of entries held by each cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Layout cache entries.
    pub layouts: usize,
    /// Filter cache entries.
    pub filtered: usize,
    /// Time-scale cache entries.
    pub time_scales: usize,
}

/// Explicitly constructed caches for layout, filter and scale results.
#[derive(Debug)]
pub struct TimelineCaches {
    /// Layouts keyed by visible ids, range and geometry.
    pub layouts: RecencyCache<LayoutCacheKey, Rc<LayoutResult>>,
    /// Filter results keyed by criteria and store revision.
    pub filtered: RecencyCache<FilterCacheKey, Rc<[EntityId]>>,
    /// Time scales keyed by range and pixel span.
    pub time_scales: RecencyCache<TimeScaleKey, TimeScale>,
}

impl Default for TimelineCaches {
    fn default() -> Self {
        Self::new(CacheCapacities::default())
    }
}

impl TimelineCaches {
    /// Empty caches with the given capacities.
    pub fn new(capacities: CacheCapacities) -> Self {
        Self {
            layouts: RecencyCache::new(capacities.layout),
            filtered: RecencyCache::new(capacities.filter),
            time_scales: RecencyCache::new(capacities.time_scale),
        }
    }

    /// Empties all three caches.
    pub fn clear(&mut self) {
        self.layouts.clear();
        self.filtered.clear();
        self.time_scales.clear();
    }

    /// Current entry counts.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            layouts: self.layouts.size(),
            filtered: self.filtered.size(),
            time_scales: self.time_scales.size(),
        }
    }
}
