//! Layout and filtering benchmarks for large vaults.
//!
//! These benchmarks cover track packing, store filtering, and the cached
//! session path with entity counts up to 20k.
//!
//! Run with: cargo bench --bench layout_benchmark

#![allow(missing_docs)] // criterion macros generate undocumented items

use chrono::{TimeDelta, TimeZone, Utc};
use chronotrack::index::{EntityStore, FilterCriteria};
use chronotrack::layout::TimelineRenderer;
use chronotrack::model::{Entity, EntityId, EntityType, Importance};
use chronotrack::timeline::TimelineSession;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

const TAGS: [&str; 5] = ["song", "tang", "ming", "poet", "official"];

/// Generate a store of overlapping entities spread over a millennium.
fn generate_store(num_entities: usize) -> EntityStore {
    let epoch = Utc.with_ymd_and_hms(1000, 1, 1, 0, 0, 0).unwrap();
    let mut store = EntityStore::new();
    for i in 0..num_entities {
        let start = epoch + TimeDelta::days((i as i64 * 7919) % 365_000);
        let end = (i % 3 != 0).then(|| start + TimeDelta::days(((i % 50) as i64 + 1) * 365));
        let entity = Entity::new(
            EntityId::new(format!("notes/entity-{i}.md")).expect("valid id"),
            EntityType::ALL[i % EntityType::ALL.len()],
            format!("Entity {i}"),
            start,
        )
        .with_time_end(end)
        .with_tags(vec![TAGS[i % TAGS.len()].to_string()])
        .with_participants(vec![format!("notes/entity-{}.md", i / 2)])
        .with_importance(Importance::new((i % 5) as i64 + 1).ok());
        store.upsert(entity);
    }
    store
}

fn benchmark_calculate_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculate_layout");
    let renderer = TimelineRenderer::default();

    for num_entities in [1_000, 5_000, 20_000] {
        let store = generate_store(num_entities);
        let entities = store.get_all();
        let scale = renderer.create_time_scale(&renderer.calculate_time_range(&entities));

        group.bench_with_input(
            BenchmarkId::new("entities", num_entities),
            &entities,
            |b, entities| b.iter(|| renderer.calculate_layout(black_box(entities), &scale)),
        );
    }

    group.finish();
}

fn benchmark_filter(c: &mut Criterion) {
    let store = generate_store(20_000);
    let mut group = c.benchmark_group("filter_20k");

    let cases = [
        ("types", FilterCriteria::new().with_types([EntityType::Person])),
        ("tags", FilterCriteria::new().with_tags(["song", "poet"])),
        ("importance", FilterCriteria::new().with_importance(4, 5)),
        ("search", FilterCriteria::new().with_search("entity 19")),
        (
            "combined",
            FilterCriteria::new()
                .with_types([EntityType::Event, EntityType::Person])
                .with_tags(["song"])
                .with_importance(2, 5),
        ),
    ];

    for (name, criteria) in cases {
        group.bench_with_input(BenchmarkId::new("criteria", name), &criteria, |b, criteria| {
            b.iter(|| store.filter(black_box(criteria)))
        });
    }

    group.bench_function("get_related", |b| {
        b.iter(|| store.get_related(black_box("notes/entity-500.md")))
    });

    group.finish();
}

fn benchmark_session_layout(c: &mut Criterion) {
    let store = generate_store(5_000);
    let mut group = c.benchmark_group("session_layout_5k");

    group.bench_function("cold", |b| {
        b.iter_batched(
            TimelineSession::default,
            |mut session| session.layout(black_box(&store)),
            BatchSize::SmallInput,
        )
    });

    let mut warm = TimelineSession::default();
    warm.layout(&store);
    group.bench_function("cached", |b| b.iter(|| warm.layout(black_box(&store))));

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(std::time::Duration::from_secs(5));
    targets = benchmark_calculate_layout, benchmark_filter, benchmark_session_layout
}
criterion_main!(benches);
