//! Scoring and workflow performance benchmarks.
//!
//! Measures quality scoring across table sizes, and the cost of the
//! cross-reference join.

use assay::workflow::{MergeType, merge_tables};
use assay::{DataTable, MemoryStore, ProjectInfo, QualityScorer, ScoreRequest, ValidationRule};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

/// Generate a synthetic table with a key, numeric readings and string codes.
fn generate_table(rows: usize) -> DataTable {
    let headers = ["id", "temperature", "pressure", "site", "code"]
        .iter()
        .map(|h| h.to_string())
        .collect();

    let data = (0..rows)
        .map(|row| {
            vec![
                row.to_string(),
                // Every 50th reading is missing, every 97th is extreme.
                match row {
                    r if r % 50 == 0 => "NA".to_string(),
                    r if r % 97 == 0 => "400".to_string(),
                    r => format!("{:.1}", 15.0 + (r % 20) as f64 * 0.5),
                },
                format!("{:.2}", 1000.0 + (row % 30) as f64),
                format!("Site_{}", row % 8),
                format!("S-{:03}", row % 1000),
            ]
        })
        .collect();

    DataTable::new(headers, data)
}

fn store_with(table: DataTable) -> MemoryStore {
    let store = MemoryStore::new();
    store
        .add_project(ProjectInfo::new("bench", "Benchmarks"))
        .unwrap();
    store.add_table("bench", "ds", "ds", table).unwrap();
    store
}

/// Benchmark scoring without custom rules.
fn bench_score_default(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_default");

    for rows in [100, 1_000, 10_000].iter() {
        let store = store_with(generate_table(*rows));
        let scorer = QualityScorer::new();
        let request = ScoreRequest::new();

        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &store, |b, store| {
            b.iter(|| black_box(scorer.score(store, "ds", &request).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark scoring with range and pattern rules.
fn bench_score_with_rules(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_with_rules");
    let rules = [
        ValidationRule::range("temperature", -50.0, 50.0),
        ValidationRule::range("pressure", 900.0, 1100.0),
        ValidationRule::pattern("code", "S-\\d{3}"),
    ];

    for rows in [1_000, 10_000].iter() {
        let store = store_with(generate_table(*rows));
        let scorer = QualityScorer::new();
        let request = ScoreRequest::new().with_rules(&rules);

        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &store, |b, store| {
            b.iter(|| black_box(scorer.score(store, "ds", &request).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark the hash join used by cross-reference steps.
fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_inner");

    for rows in [1_000, 10_000].iter() {
        let source = generate_table(*rows);
        let target = generate_table(*rows / 2);

        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(
            BenchmarkId::new("rows", rows),
            &(source, target),
            |b, (source, target)| {
                b.iter(|| {
                    black_box(
                        merge_tables(source, "s", target, "t", "id", MergeType::Inner).unwrap(),
                    )
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_score_default,
    bench_score_with_rules,
    bench_merge,
);
criterion_main!(benches);
