//! Property-based tests for the pure core.
//!
//! Tests validate:
//! 1. Store indexes stay consistent under any upsert/remove sequence
//! 2. Track packing never lets a card start before its track is free
//! 3. Viewport clamping always lands inside the safe window
//! 4. The recency cache never exceeds its capacity

use chronotrack::cache::RecencyCache;
use chronotrack::index::EntityStore;
use chronotrack::layout::{TimeScale, TimelineRenderer, MIN_CARD_WIDTH};
use chronotrack::model::{Entity, EntityId, EntityType, TimeRange};
use chronotrack::viewport::{clamp_millis, clamp_time_range, SAFE_MAX_MS, SAFE_MIN_MS};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

const TAG_POOL: [&str; 4] = ["song", "tang", "poet", "exam"];

fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1000, 1, 1, 0, 0, 0).unwrap() + TimeDelta::days(n)
}

fn entity(slot: u8, type_idx: usize, tag_mask: u8, participant: Option<u8>) -> Entity {
    let tags = TAG_POOL
        .iter()
        .enumerate()
        .filter(|(i, _)| tag_mask & (1 << i) != 0)
        .map(|(_, t)| t.to_string())
        .collect();
    let participants = participant
        .map(|p| vec![format!("doc-{p}")])
        .unwrap_or_default();
    Entity::new(
        EntityId::new(format!("doc-{slot}")).unwrap(),
        EntityType::ALL[type_idx],
        format!("Doc {slot}"),
        day(i64::from(slot)),
    )
    .with_tags(tags)
    .with_participants(participants)
}

#[derive(Debug, Clone)]
enum StoreOp {
    Upsert {
        slot: u8,
        type_idx: usize,
        tag_mask: u8,
        participant: Option<u8>,
    },
    Remove(u8),
    Clear,
}

fn store_op() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        6 => (0u8..12, 0usize..4, 0u8..16, proptest::option::of(0u8..12)).prop_map(
            |(slot, type_idx, tag_mask, participant)| StoreOp::Upsert {
                slot,
                type_idx,
                tag_mask,
                participant,
            }
        ),
        3 => (0u8..12).prop_map(StoreOp::Remove),
        1 => Just(StoreOp::Clear),
    ]
}

// ===== Property 1: Store invariants =====

proptest! {
    #[test]
    fn store_indexes_match_entities(ops in proptest::collection::vec(store_op(), 0..60)) {
        let mut store = EntityStore::new();
        let mut expected: BTreeSet<u8> = BTreeSet::new();

        for op in ops {
            match op {
                StoreOp::Upsert { slot, type_idx, tag_mask, participant } => {
                    store.upsert(entity(slot, type_idx, tag_mask, participant));
                    expected.insert(slot);
                }
                StoreOp::Remove(slot) => {
                    let removed = store.remove(&format!("doc-{slot}"));
                    prop_assert_eq!(removed.is_some(), expected.remove(&slot));
                }
                StoreOp::Clear => {
                    store.clear();
                    expected.clear();
                }
            }
            prop_assert_eq!(store.check_invariants(), Ok(()));
            prop_assert_eq!(store.len(), expected.len());
        }

        let stats = store.get_stats();
        prop_assert_eq!(stats.by_type.values().sum::<usize>(), stats.total);
    }

    #[test]
    fn related_is_symmetric(ops in proptest::collection::vec(store_op(), 0..40)) {
        let mut store = EntityStore::new();
        for op in ops {
            match op {
                StoreOp::Upsert { slot, type_idx, tag_mask, participant } => {
                    store.upsert(entity(slot, type_idx, tag_mask, participant));
                }
                StoreOp::Remove(slot) => {
                    store.remove(&format!("doc-{slot}"));
                }
                StoreOp::Clear => store.clear(),
            }
        }

        for a in store.iter() {
            for b in store.get_related(a.id().as_str()) {
                prop_assert_ne!(a.id(), b.id());
                let back: Vec<&str> = store
                    .get_related(b.id().as_str())
                    .iter()
                    .map(|e| e.id().as_str())
                    .collect();
                prop_assert!(back.contains(&a.id().as_str()));
            }
        }
    }
}

// ===== Property 2: Track packing =====

fn interval() -> impl Strategy<Value = (i64, Option<i64>)> {
    (0i64..1000, proptest::option::of(0i64..120))
}

proptest! {
    #[test]
    fn tracks_never_overlap(intervals in proptest::collection::vec(interval(), 0..40)) {
        let entities: Vec<Entity> = intervals
            .iter()
            .enumerate()
            .map(|(i, (start, len))| {
                Entity::new(
                    EntityId::new(format!("e{i}")).unwrap(),
                    EntityType::Event,
                    format!("e{i}"),
                    day(*start),
                )
                .with_time_end(len.map(|l| day(start + l)))
            })
            .collect();
        let refs: Vec<&Entity> = entities.iter().collect();
        let scale = TimeScale::new(TimeRange::new(day(0), day(1200)), (0.0, 12_000.0));

        let layout = TimelineRenderer::default().calculate_layout(&refs, &scale);

        prop_assert_eq!(layout.len(), entities.len());
        let mut last_end: HashMap<usize, f64> = HashMap::new();
        for (id, card) in layout.iter() {
            let entity = entities.iter().find(|e| e.id() == id).unwrap();
            let start_x = scale.apply(entity.time_start());
            let end_x = match entity.time_end() {
                Some(end) => scale.apply(end).max(start_x),
                None => start_x + MIN_CARD_WIDTH,
            };
            prop_assert!(card.track < layout.track_count);
            prop_assert!(card.width >= MIN_CARD_WIDTH);
            if let Some(previous_end) = last_end.get(&card.track) {
                prop_assert!(
                    start_x > *previous_end,
                    "{} starts at {} before {}",
                    id,
                    start_x,
                    previous_end
                );
            }
            last_end.insert(card.track, end_x);
        }
    }
}

// ===== Property 3: Viewport clamping =====

fn any_millis() -> impl Strategy<Value = f64> {
    prop_oneof![
        8 => -1.0e15f64..1.0e15,
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
        1 => Just(f64::NEG_INFINITY),
    ]
}

proptest! {
    #[test]
    fn clamp_millis_stays_in_window(start in any_millis(), end in any_millis()) {
        let range = clamp_millis(start, end);
        prop_assert!(range.start_millis() >= SAFE_MIN_MS);
        prop_assert!(range.end_millis() <= SAFE_MAX_MS);
        prop_assert!(range.start_millis() <= range.end_millis());
    }

    #[test]
    fn clamp_time_range_keeps_fitting_span(
        start in -7_000_000_000_000_000i64..7_000_000_000_000_000,
        span in 0i64..400_000_000_000_000,
    ) {
        let range = TimeRange::from_millis(start, start.saturating_add(span)).unwrap();
        let clamped = clamp_time_range(range);
        prop_assert!(clamped.start_millis() >= SAFE_MIN_MS);
        prop_assert!(clamped.end_millis() <= SAFE_MAX_MS);
        if span <= SAFE_MAX_MS - SAFE_MIN_MS {
            prop_assert_eq!(clamped.span_millis(), span);
        }
    }
}

// ===== Property 4: Recency cache capacity =====

proptest! {
    #[test]
    fn cache_never_exceeds_capacity(
        capacity in 1usize..8,
        ops in proptest::collection::vec((any::<bool>(), 0u8..16), 0..100),
    ) {
        let mut cache: RecencyCache<u8, u8> = RecencyCache::new(capacity);
        for (is_set, key) in ops {
            if is_set {
                let evicted = cache.set(key, key);
                prop_assert!(cache.has(&key));
                if let Some((old, _)) = evicted {
                    prop_assert_ne!(old, key);
                    prop_assert!(!cache.has(&old));
                }
            } else if let Some(value) = cache.get(&key) {
                prop_assert_eq!(*value, key);
            }
            prop_assert!(cache.size() <= capacity);
        }
    }
}
