use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use lotsawa::config::{DetectionOptions, ScanConfig};
use lotsawa::{
    CancellationToken, DateInfo, DuplicateDetector, Entity, EntityKind, FuzzyMatcher, Script,
};

const NAMES: &[&str] = &[
    "Marpa Lotsawa", "Mar-pa", "Milarepa", "Mila Repa", "Gampopa", "Dakpo Lhaje", "Rechungpa",
    "Naropa", "Tilopa", "Tsongkhapa", "Longchenpa", "Taranatha", "Buton Rinchen Drub", "Atisha",
    "Padmasambhava", "Sakya Pandita",
];

fn corpus(size: usize) -> Vec<Entity> {
    (0..size)
        .map(|i| {
            let name = NAMES[i % NAMES.len()];
            let year = 1000 + i32::try_from(i % 300).unwrap();
            Entity::new(name, EntityKind::person())
                .with_variant(Script::English, format!("{name} {}", i / NAMES.len()))
                .with_date("birth", DateInfo::circa(year))
        })
        .collect()
}

fn bench_calculate_similarity(c: &mut Criterion) {
    let matcher = FuzzyMatcher::new();
    c.bench_function("pairwise/calculate_similarity", |b| {
        b.iter(|| {
            matcher.calculate_similarity(
                black_box("Marpa Chökyi Lodrö"),
                black_box("mar pa chos kyi blo gros"),
            )
        });
    });
}

fn bench_duplicate_probability(c: &mut Criterion) {
    let detector = DuplicateDetector::default();
    let entities = corpus(2);
    let options = DetectionOptions::default();
    c.bench_function("pairwise/duplicate_probability", |b| {
        b.iter(|| {
            detector.calculate_duplicate_probability(
                black_box(&entities[0]),
                black_box(&entities[1]),
                &options,
            )
        });
    });
}

fn bench_scan(c: &mut Criterion) {
    let detector = DuplicateDetector::default();
    let options = DetectionOptions::default();
    let mut group = c.benchmark_group("pairwise/scan");
    for size in [64usize, 256] {
        let entities = corpus(size);
        group.throughput(Throughput::Elements((size * (size - 1) / 2) as u64));
        for workers in [1usize, 4] {
            let config = ScanConfig {
                workers,
                queue_capacity: 1024,
            };
            let id = BenchmarkId::new(format!("workers_{workers}"), size);
            group.bench_with_input(id, &entities, |b, entities| {
                b.iter(|| {
                    let token = CancellationToken::new();
                    detector.detect_all_duplicates_with_cancel(entities, &options, &config, &token)
                });
            });
        }
    }
    group.finish();
}

criterion_group!(pairwise, bench_calculate_similarity, bench_duplicate_probability, bench_scan);
criterion_main!(pairwise);
