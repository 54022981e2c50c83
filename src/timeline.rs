//! Timeline session state.
//!
//! [`TimelineSession`] is the consumer that ties the pure pieces together:
//! it filters the store, lays the visible entities out against the viewport
//! range, and memoises each step in its own [`TimelineCaches`]. The store is
//! borrowed per call and never owned, so a sync layer can mutate it between
//! frames; cache keys carry the store revision.

use crate::cache::{
    CacheCapacities, CacheStats, FilterCacheKey, LayoutCacheKey, TimeScaleKey, TimelineCaches,
};
use crate::index::{EntityStore, FilterCriteria};
use crate::layout::{
    format_date, LayoutResult, TimeScale, TimelineBounds, TimelineRenderer, DEFAULT_TICK_COUNT,
};
use crate::model::{Entity, EntityId, TimeRange};
use crate::viewport::{
    GestureOutcome, HitRegion, PointerButton, ViewportController, DRAG_THRESHOLD_PX,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::rc::Rc;

/// One axis tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickMark {
    /// Tick time.
    pub instant: DateTime<Utc>,
    /// Horizontal pixel position.
    pub x: f64,
    /// Date label.
    pub label: String,
}

// ===== TimelineSession =====

/// Per-view state: filter, selection, hover, viewport and caches.
///
/// # Viewport
///
/// The viewport is created the first time a non-empty store is rendered,
/// from the default range of the visible entities. Until then the derived
/// range is recomputed on every call and pointer input is ignored. `reset`
/// returns to that first range.
#[derive(Debug)]
pub struct TimelineSession {
    renderer: TimelineRenderer,
    viewport: Option<ViewportController>,
    caches: TimelineCaches,
    criteria: FilterCriteria,
    selected: Option<EntityId>,
    hovered: Option<EntityId>,
    drag_threshold: f64,
    tick_count: usize,
}

impl Default for TimelineSession {
    fn default() -> Self {
        Self::new(TimelineRenderer::default(), CacheCapacities::default())
    }
}

impl TimelineSession {
    /// Session drawing with `renderer` and caches sized by `capacities`.
    pub fn new(renderer: TimelineRenderer, capacities: CacheCapacities) -> Self {
        Self {
            renderer,
            viewport: None,
            caches: TimelineCaches::new(capacities),
            criteria: FilterCriteria::default(),
            selected: None,
            hovered: None,
            drag_threshold: DRAG_THRESHOLD_PX,
            tick_count: DEFAULT_TICK_COUNT,
        }
    }

    /// Pixel distance a press must travel before it becomes a pan.
    pub fn with_drag_threshold(mut self, threshold_px: f64) -> Self {
        self.drag_threshold = threshold_px;
        if let Some(viewport) = self.viewport.take() {
            self.viewport = Some(viewport.with_drag_threshold(threshold_px));
        }
        self
    }

    /// Sets the target number of axis ticks.
    pub fn with_tick_count(mut self, tick_count: usize) -> Self {
        self.tick_count = tick_count;
        self
    }

    /// Renderer used for layouts.
    pub fn renderer(&self) -> &TimelineRenderer {
        &self.renderer
    }

    /// Change the drawing geometry. Cached layouts keyed on the old bounds
    /// simply stop being hit.
    pub fn set_bounds(&mut self, bounds: TimelineBounds) {
        self.renderer.set_bounds(bounds);
        if let Some(viewport) = self.viewport.as_mut() {
            viewport.set_container_width(bounds.effective_width());
        }
    }

    /// Viewport, once the first non-empty layout has created it.
    pub fn viewport(&self) -> Option<&ViewportController> {
        self.viewport.as_ref()
    }

    // ===== Filter and selection =====

    /// Active filter.
    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Replaces the filter.
    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    /// Selected entity.
    pub fn selected(&self) -> Option<&EntityId> {
        self.selected.as_ref()
    }

    /// Selects `id`, or clears the selection.
    pub fn select(&mut self, id: Option<EntityId>) {
        self.selected = id;
    }

    /// Entity under the pointer.
    pub fn hovered(&self) -> Option<&EntityId> {
        self.hovered.as_ref()
    }

    /// Sets or clears the hovered entity.
    pub fn hover(&mut self, id: Option<EntityId>) {
        self.hovered = id;
    }

    // ===== Derived views =====

    /// Entities passing the current filter, in store order.
    pub fn visible_entities<'s>(&mut self, store: &'s EntityStore) -> Vec<&'s Entity> {
        let key = FilterCacheKey::new(&self.criteria, store.revision());
        if let Some(ids) = self.caches.filtered.get(&key) {
            return ids.iter().filter_map(|id| store.get(id.as_str())).collect();
        }

        let entities = store.filter(&self.criteria);
        let ids: Rc<[EntityId]> = entities.iter().map(|e| e.id().clone()).collect();
        self.caches.filtered.set(key, ids);
        entities
    }

    /// Current visible range.
    ///
    /// Initialises the viewport from the visible entities the first time the
    /// store is non-empty.
    pub fn range(&mut self, store: &EntityStore) -> TimeRange {
        if let Some(viewport) = &self.viewport {
            return viewport.range();
        }
        let visible = self.visible_entities(store);
        let derived = self.renderer.calculate_time_range(&visible);
        if store.is_empty() {
            return derived;
        }

        let mut viewport =
            ViewportController::new(derived).with_drag_threshold(self.drag_threshold);
        viewport.set_container_width(self.renderer.bounds().effective_width());
        let range = viewport.range();
        tracing::debug!(
            start = %range.start(),
            end = %range.end(),
            "viewport initialised"
        );
        self.viewport = Some(viewport);
        range
    }

    /// Scale for the current range and geometry.
    pub fn time_scale(&mut self, store: &EntityStore) -> TimeScale {
        let range = self.range(store);
        self.scale_for(&range)
    }

    fn scale_for(&mut self, range: &TimeRange) -> TimeScale {
        let scale = self.renderer.create_time_scale(range);
        let key = TimeScaleKey::new(range, scale.range());
        if let Some(cached) = self.caches.time_scales.get(&key) {
            return *cached;
        }
        self.caches.time_scales.set(key, scale);
        scale
    }

    /// Track layout of the visible entities against the current range.
    pub fn layout(&mut self, store: &EntityStore) -> Rc<LayoutResult> {
        let range = self.range(store);
        let entities = self.visible_entities(store);
        let key = LayoutCacheKey::new(&entities, &range, &self.renderer.bounds(), store.revision());
        if let Some(cached) = self.caches.layouts.get(&key) {
            return Rc::clone(cached);
        }

        let scale = self.scale_for(&range);
        let layout = Rc::new(self.renderer.calculate_layout(&entities, &scale));
        self.caches.layouts.set(key, Rc::clone(&layout));
        layout
    }

    /// Axis ticks inside the drawable width, labelled with [`format_date`].
    pub fn ticks(&mut self, store: &EntityStore) -> Vec<TickMark> {
        let scale = self.time_scale(store);
        let (_, right) = scale.range();
        let mut instants = self.renderer.generate_time_ticks(&scale, self.tick_count);
        instants.dedup();
        instants
            .into_iter()
            .map(|instant| TickMark {
                instant,
                x: scale.apply(instant),
                label: format_date(instant),
            })
            .filter(|tick| tick.x >= 0.0 && tick.x <= right)
            .collect()
    }

    /// Entities related to the selection, or to the hovered entity when
    /// nothing is selected.
    pub fn related<'s>(&self, store: &'s EntityStore) -> Vec<&'s Entity> {
        match self.selected.as_ref().or(self.hovered.as_ref()) {
            Some(id) => store.get_related(id.as_str()),
            None => Vec::new(),
        }
    }

    /// Every tag in `store`, sorted.
    pub fn available_tags<'s>(&self, store: &'s EntityStore) -> Vec<&'s str> {
        store.all_tags()
    }

    // ===== Viewport input =====

    /// Returns whether a pan gesture started.
    pub fn pointer_down(&mut self, x: f64, button: PointerButton, region: HitRegion) -> bool {
        self.viewport
            .as_mut()
            .is_some_and(|viewport| viewport.pointer_down(x, button, region))
    }

    /// Forwards pointer movement; returns the panned range while dragging.
    pub fn pointer_move(&mut self, x: f64) -> Option<TimeRange> {
        self.viewport.as_mut()?.pointer_move(x)
    }

    /// End a gesture. A background click that never became a drag clears
    /// the selection.
    pub fn pointer_up(&mut self) -> GestureOutcome {
        let outcome = self
            .viewport
            .as_mut()
            .map_or(GestureOutcome::None, ViewportController::pointer_up);
        if outcome == GestureOutcome::Click {
            self.selected = None;
        }
        outcome
    }

    /// Zooms in around the centre.
    pub fn zoom_in(&mut self) -> Option<TimeRange> {
        self.viewport.as_mut().map(ViewportController::zoom_in)
    }

    /// Zooms out around the centre.
    pub fn zoom_out(&mut self) -> Option<TimeRange> {
        self.viewport.as_mut().map(ViewportController::zoom_out)
    }

    /// Wheel zoom; negative `delta_y` zooms in.
    pub fn wheel(&mut self, delta_y: f64) -> Option<TimeRange> {
        self.viewport.as_mut().map(|viewport| viewport.wheel(delta_y))
    }

    /// Returns to the initial range.
    pub fn reset(&mut self) -> Option<TimeRange> {
        self.viewport.as_mut().map(ViewportController::reset)
    }

    // ===== Caches =====

    /// Drop every memoised result.
    pub fn invalidate(&mut self) {
        self.caches.clear();
    }

    /// Entry counts of the session caches.
    pub fn cache_stats(&self) -> CacheStats {
        self.caches.stats()
    }
}

#[cfg(test)]
#[path = "timeline_tests.rs"]
mod tests;
