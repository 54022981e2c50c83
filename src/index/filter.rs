//! Composable filter criteria for the entity store.

use crate::model::{Entity, EntityType};
use serde::Serialize;

/// Independently optional predicates combined with AND.
///
/// Empty lists and `None` mean "no constraint". The result set does not
/// depend on the order predicates are applied in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct FilterCriteria {
    /// Entity must be one of these types.
    pub types: Vec<EntityType>,
    /// Entity must carry at least one of these tags (case-sensitive).
    pub tags: Vec<String>,
    /// Entity importance must be present and within `[min, max]`.
    pub importance: Option<(u8, u8)>,
    /// Case-insensitive substring over name and participants.
    pub search: Option<String>,
}

impl FilterCriteria {
    /// Criteria that match every entity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only these types.
    pub fn with_types(mut self, types: impl IntoIterator<Item = EntityType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    /// Keep entities carrying at least one of these tags.
    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Keep importance within `min..=max`. Entities without importance never match.
    pub fn with_importance(mut self, min: u8, max: u8) -> Self {
        self.importance = Some((min, max));
        self
    }

    /// Keep entities whose name contains `query`, ignoring case.
    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    /// True when no predicate is active.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.tags.is_empty()
            && self.importance.is_none()
            && self.search.as_deref().is_none_or(str::is_empty)
    }

    /// Same predicates with order-insensitive lists sorted and deduplicated.
    ///
    /// Two criteria that select the same entities for every store produce
    /// equal canonical forms, which makes them usable as cache keys.
    pub fn canonical(&self) -> Self {
        let mut types = self.types.clone();
        types.sort();
        types.dedup();
        let mut tags = self.tags.clone();
        tags.sort();
        tags.dedup();
        let search = self
            .search
            .as_ref()
            .map(|q| q.to_lowercase())
            .filter(|q| !q.is_empty());
        Self {
            types,
            tags,
            importance: self.importance,
            search,
        }
    }

    pub(crate) fn matches_type(&self, entity: &Entity) -> bool {
        self.types.is_empty() || self.types.contains(&entity.entity_type())
    }

    pub(crate) fn matches_tags(&self, entity: &Entity) -> bool {
        self.tags.is_empty() || self.tags.iter().any(|tag| entity.tags().contains(tag))
    }

    pub(crate) fn matches_importance(&self, entity: &Entity) -> bool {
        match self.importance {
            None => true,
            Some((min, max)) => entity
                .importance()
                .is_some_and(|i| i.get() >= min && i.get() <= max),
        }
    }

    pub(crate) fn matches_search(&self, entity: &Entity) -> bool {
        match self.search.as_deref() {
            None | Some("") => true,
            Some(query) => entity.matches_query(&query.to_lowercase()),
        }
    }
}
