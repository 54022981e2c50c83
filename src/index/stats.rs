//! Index statistics.

use crate::model::EntityType;
use serde::Serialize;
use std::collections::BTreeMap;

/// Entity counts, recomputed from index state on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Number of entities in the primary map.
    pub total: usize,
    /// Number of entities per type. Types with no members are absent.
    pub by_type: BTreeMap<EntityType, usize>,
}

impl IndexStats {
    /// Count for one type, zero when absent.
    pub fn count(&self, entity_type: EntityType) -> usize {
        self.by_type.get(&entity_type).copied().unwrap_or(0)
    }

    /// `type: count` pairs joined for display, or "No entities".
    pub fn summary(&self) -> String {
        if self.by_type.is_empty() {
            return "No entities".to_string();
        }
        self.by_type
            .iter()
            .map(|(t, n)| format!("{t}: {n}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
