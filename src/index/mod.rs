//! Entity store with secondary indexes.
//!
//! [`EntityStore`] exclusively owns the entity set plus three derived
//! indexes (by type, by tag, by participant reference). Index buckets hold
//! ids, never entities; entities are dereferenced through the primary map at
//! read time.
//!
//! # Invariants
//!
//! - Every id in any bucket is present in the primary map.
//! - No index keeps an empty bucket.
//! - `upsert` of an existing id fully retracts the old memberships before
//!   adding the new ones.
//!
//! # Ordering
//!
//! Store order is the order in which ids were first inserted. Replacing an
//! existing id keeps its position; removing an id closes the gap. Every read
//! that returns several entities returns them in store order, except the
//! bucket reads (`get_by_type`, `get_by_tag`, `get_by_participant`) which
//! return bucket membership order.
//!
//! # Failure semantics
//!
//! No operation fails. Unknown ids and keys yield empty results.

pub mod filter;
pub mod stats;

pub use filter::FilterCriteria;
pub use stats::IndexStats;

use crate::model::{Entity, EntityId, EntityType};
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::Hash;

type Bucket = IndexSet<EntityId>;

/// Secondary indexes derived from the primary map.
#[derive(Debug, Clone, Default)]
struct SecondaryIndexes {
    by_type: HashMap<EntityType, Bucket>,
    by_tag: HashMap<String, Bucket>,
    by_participant: HashMap<String, Bucket>,
}

impl SecondaryIndexes {
    fn add(&mut self, entity: &Entity) {
        let id = entity.id();
        insert_member(&mut self.by_type, entity.entity_type(), id);
        for tag in entity.tags() {
            insert_member(&mut self.by_tag, tag.clone(), id);
        }
        for participant in entity.participants() {
            insert_member(&mut self.by_participant, participant.clone(), id);
        }
    }

    fn retract(&mut self, entity: &Entity) {
        let id = entity.id();
        remove_member(&mut self.by_type, &entity.entity_type(), id);
        for tag in entity.tags() {
            remove_member(&mut self.by_tag, tag.as_str(), id);
        }
        for participant in entity.participants() {
            remove_member(&mut self.by_participant, participant.as_str(), id);
        }
    }

    fn clear(&mut self) {
        self.by_type.clear();
        self.by_tag.clear();
        self.by_participant.clear();
    }
}

fn insert_member<K: Hash + Eq>(index: &mut HashMap<K, Bucket>, key: K, id: &EntityId) {
    index.entry(key).or_default().insert(id.clone());
}

fn remove_member<K, Q>(index: &mut HashMap<K, Bucket>, key: &Q, id: &EntityId)
where
    K: Hash + Eq + Borrow<Q>,
    Q: Hash + Eq + ?Sized,
{
    if let Some(bucket) = index.get_mut(key) {
        bucket.shift_remove(id);
        if bucket.is_empty() {
            index.remove(key);
        }
    }
}

/// Canonical entity set with type, tag and participant indexes.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: IndexMap<EntityId, Entity>,
    indexes: SecondaryIndexes,
    revision: u64,
}

impl EntityStore {
    /// Empty store at revision 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entity.
    ///
    /// Replacing retracts every membership of the previous version first, so
    /// no stale tag/type/participant membership survives.
    pub fn upsert(&mut self, entity: Entity) {
        if let Some(previous) = self.entities.get(entity.id()) {
            self.indexes.retract(previous);
        }
        self.indexes.add(&entity);
        self.entities.insert(entity.id().clone(), entity);
        self.revision += 1;
    }

    /// Remove an entity and all its memberships. No-op if absent.
    ///
    /// Returns the removed entity.
    pub fn remove(&mut self, id: &str) -> Option<Entity> {
        let previous = self.entities.shift_remove(id)?;
        self.indexes.retract(&previous);
        self.revision += 1;
        Some(previous)
    }

    /// Drop everything, ahead of a full rebuild.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.indexes.clear();
        self.revision += 1;
    }

    /// Counter bumped by every mutation. Equal revisions of the same store
    /// hold identical contents.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Entity stored under `id`.
    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Whether `id` is stored.
    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Number of stored entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in store order.
    pub fn get_all(&self) -> Vec<&Entity> {
        self.entities.values().collect()
    }

    /// Iterator over entities in store order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Entities of one type, in store order.
    pub fn get_by_type(&self, entity_type: EntityType) -> Vec<&Entity> {
        self.resolve(self.indexes.by_type.get(&entity_type))
    }

    /// Entities carrying `tag`, in store order.
    pub fn get_by_tag(&self, tag: &str) -> Vec<&Entity> {
        self.resolve(self.indexes.by_tag.get(tag))
    }

    /// Entities listing `reference` among their participants.
    pub fn get_by_participant(&self, reference: &str) -> Vec<&Entity> {
        self.resolve(self.indexes.by_participant.get(reference))
    }

    fn resolve(&self, bucket: Option<&Bucket>) -> Vec<&Entity> {
        bucket
            .map(|ids| ids.iter().filter_map(|id| self.entities.get(id)).collect())
            .unwrap_or_default()
    }

    /// Case-insensitive substring match against name and participants.
    pub fn search(&self, query: &str) -> Vec<&Entity> {
        let lowered = query.to_lowercase();
        self.entities
            .values()
            .filter(|e| e.matches_query(&lowered))
            .collect()
    }

    /// Entities related to `id`, excluding `id` itself.
    ///
    /// Related means sharing at least one tag, or being connected by a
    /// participant reference in either direction: they list `id` among their
    /// participants, or `id` lists them. A reference names an entity by full
    /// id, by id without `.md`, or by file stem (see
    /// [`EntityId::reference_forms`]).
    pub fn get_related(&self, id: &str) -> Vec<&Entity> {
        let Some(entity) = self.entities.get(id) else {
            return Vec::new();
        };

        let mut related: HashSet<&str> = HashSet::new();
        for tag in entity.tags() {
            if let Some(bucket) = self.indexes.by_tag.get(tag.as_str()) {
                related.extend(bucket.iter().map(EntityId::as_str));
            }
        }
        for form in entity.id().reference_forms() {
            if let Some(bucket) = self.indexes.by_participant.get(form) {
                related.extend(bucket.iter().map(EntityId::as_str));
            }
        }
        related.remove(id);

        self.entities
            .values()
            .filter(|other| {
                related.contains(other.id().as_str())
                    || (other.id().as_str() != id
                        && entity
                            .participants()
                            .iter()
                            .any(|p| other.id().is_named_by(p)))
            })
            .collect()
    }

    /// Entities whose interval overlaps `[start, end]`.
    ///
    /// Matches when `time_start <= end` and either there is no `time_end`
    /// or `time_end >= start`.
    pub fn get_by_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<&Entity> {
        self.entities
            .values()
            .filter(|e| e.time_start() <= end && e.time_end().is_none_or(|t| t >= start))
            .collect()
    }

    /// AND of the active predicates in `criteria`, in store order.
    pub fn filter(&self, criteria: &FilterCriteria) -> Vec<&Entity> {
        let mut results: Vec<&Entity> = self.entities.values().collect();
        if !criteria.types.is_empty() {
            results.retain(|e| criteria.matches_type(e));
        }
        if !criteria.tags.is_empty() {
            results.retain(|e| criteria.matches_tags(e));
        }
        if criteria.importance.is_some() {
            results.retain(|e| criteria.matches_importance(e));
        }
        if criteria.search.as_deref().is_some_and(|q| !q.is_empty()) {
            results.retain(|e| criteria.matches_search(e));
        }
        results
    }

    /// Total and per-type counts, recomputed from the type index.
    pub fn get_stats(&self) -> IndexStats {
        IndexStats {
            total: self.entities.len(),
            by_type: self
                .indexes
                .by_type
                .iter()
                .map(|(t, ids)| (*t, ids.len()))
                .collect(),
        }
    }

    /// Sorted unique tags across all entities.
    pub fn all_tags(&self) -> Vec<&str> {
        self.indexes
            .by_tag
            .keys()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Check that every bucket member is a stored entity that still carries
    /// the bucket's key, every entity is in the buckets its fields name, and
    /// no bucket is empty.
    ///
    /// Intended for tests and debug assertions.
    pub fn check_invariants(&self) -> Result<(), String> {
        check_buckets("type", &self.indexes.by_type, |key, id| {
            self.entities.get(id).is_some_and(|e| e.entity_type() == *key)
        })?;
        check_buckets("tag", &self.indexes.by_tag, |key, id| {
            self.entities.get(id).is_some_and(|e| e.tags().contains(key))
        })?;
        check_buckets("participant", &self.indexes.by_participant, |key, id| {
            self.entities
                .get(id)
                .is_some_and(|e| e.participants().contains(key))
        })?;

        for entity in self.entities.values() {
            let id = entity.id();
            let in_type = self
                .indexes
                .by_type
                .get(&entity.entity_type())
                .is_some_and(|b| b.contains(id));
            if !in_type {
                return Err(format!("'{id}' missing from its type bucket"));
            }
            for tag in entity.tags() {
                if !self.indexes.by_tag.get(tag).is_some_and(|b| b.contains(id)) {
                    return Err(format!("'{id}' missing from tag bucket '{tag}'"));
                }
            }
            for participant in entity.participants() {
                let present = self
                    .indexes
                    .by_participant
                    .get(participant)
                    .is_some_and(|b| b.contains(id));
                if !present {
                    return Err(format!(
                        "'{id}' missing from participant bucket '{participant}'"
                    ));
                }
            }
        }
        Ok(())
    }
}

fn check_buckets<K, F>(name: &str, index: &HashMap<K, Bucket>, holds: F) -> Result<(), String>
where
    K: std::fmt::Display,
    F: Fn(&K, &EntityId) -> bool,
{
    for (key, bucket) in index {
        if bucket.is_empty() {
            return Err(format!("empty {name} bucket '{key}'"));
        }
        if let Some(stray) = bucket.iter().find(|id| !holds(key, id)) {
            return Err(format!("{name} bucket '{key}' holds stale id '{stray}'"));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
