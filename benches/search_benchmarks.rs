//! Performance Benchmarks for the Similarity Engine
//!
//! Measures distance kernels, per-reference ranking in every mode and full
//! partitioning runs over synthetic feature tables.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use soundsift_lib::standardizer::Standardizer;
use soundsift_lib::{
    BatchPartitioner, DistanceOptions, FeatureTable, ItemRecord, Namespace, PartitionSettings,
    RecordingSink, SearchMode, SimilaritySearch,
};
use std::time::Duration;

/// Generate deterministic feature values for benchmarking
fn generate_benchmark_values(seed: u32, dim: usize) -> Vec<f64> {
    let mut values = Vec::with_capacity(dim);
    let mut x = seed as f64;

    for _i in 0..dim {
        x = ((x * 9301.0 + 49297.0) % 233280.0) / 233280.0; // Simple LCG
        values.push(x * 100.0 - 50.0);
    }

    values
}

/// Table with `size` items, `dim` stats columns and `dim` classification columns
fn generate_benchmark_table(size: usize, dim: usize) -> FeatureTable {
    let records = (0..size)
        .map(|i| {
            let mut record = ItemRecord::new(format!("sound_{:06}.wav", i));
            for (d, value) in generate_benchmark_values((i + 1) as u32, dim).into_iter().enumerate() {
                record = record.with_feature(format!("stats_f{}", d), value);
            }
            for (d, value) in generate_benchmark_values((i + 7919) as u32, dim).into_iter().enumerate() {
                record = record.with_feature(format!("classifications_c{}", d), value.abs() / 50.0);
            }
            record
        })
        .collect();
    FeatureTable::from_records(records)
}

fn weighted_options(dim: usize, n: usize) -> DistanceOptions {
    let weights: String = (0..dim)
        .step_by(2)
        .map(|d| format!("  f{}: {}\n", d, 1.0 + d as f64 / 10.0))
        .collect();
    DistanceOptions::from_yaml_str(&format!("class: stats\nn: {}\nweights:\n{}", n, weights)).unwrap()
}

/// Benchmark the distance kernels
fn bench_distance_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("distance_kernels");

    for dim in [8, 32, 128, 512] {
        let vec_a = generate_benchmark_values(1, dim);
        let vec_b = generate_benchmark_values(2, dim);
        let weights = generate_benchmark_values(3, dim);

        group.throughput(Throughput::Elements(dim as u64));
        group.bench_with_input(BenchmarkId::new("euclidean", dim), &dim, |b, _| {
            b.iter(|| SimilaritySearch::euclidean_distance(black_box(&vec_a), black_box(&vec_b)))
        });
        group.bench_with_input(BenchmarkId::new("weighted_euclidean", dim), &dim, |b, _| {
            b.iter(|| {
                SimilaritySearch::weighted_euclidean_distance(
                    black_box(&vec_a),
                    black_box(&vec_b),
                    black_box(&weights),
                )
            })
        });
    }

    group.finish();
}

/// Benchmark z-scoring a whole namespace over the candidate pool
fn bench_standardization(c: &mut Criterion) {
    let mut group = c.benchmark_group("standardization");
    let dim = 32;

    for size in [100, 1_000, 5_000] {
        let table = generate_benchmark_table(size, dim);
        let rows: Vec<usize> = (0..table.len()).collect();
        let columns = table.columns_matching(&Namespace::Stats).to_vec();

        group.throughput(Throughput::Elements((size * dim) as u64));
        group.bench_with_input(BenchmarkId::new("stats_namespace", size), &size, |b, _| {
            b.iter(|| Standardizer::standardize(black_box(&table), black_box(&rows), black_box(&columns)))
        });
    }

    group.finish();
}

/// Benchmark ranking one reference against growing corpora in every mode
fn bench_ranking_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking_modes");
    let dim = 24;
    let n = 5;

    for size in [100, 1_000, 5_000] {
        let table = generate_benchmark_table(size, dim);
        let rows: Vec<usize> = (0..table.len()).collect();
        let reference = table.id_at(size / 2).to_string();

        let modes = [
            SearchMode::Standardized { namespace: Namespace::Stats, metric: Some("f3".to_string()), n },
            SearchMode::Standardized { namespace: Namespace::Stats, metric: None, n },
            SearchMode::Weighted(weighted_options(dim, n)),
            SearchMode::Classification { category: None, n },
        ];

        group.throughput(Throughput::Elements(size as u64));
        for mode in &modes {
            group.bench_with_input(BenchmarkId::new(mode.label(), size), &size, |b, _| {
                b.iter(|| SimilaritySearch::rank(black_box(&table), black_box(&rows), black_box(&reference), mode))
            });
        }
    }

    group.finish();
}

/// Benchmark complete partitioning runs, where the pool shrinks every batch
fn bench_partitioning(c: &mut Criterion) {
    let mut group = c.benchmark_group("partitioning");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(20));

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let dim = 16;

    for size in [100, 500, 1_000] {
        let table = generate_benchmark_table(size, dim);
        let settings = PartitionSettings {
            mode: SearchMode::Standardized { namespace: Namespace::Stats, metric: None, n: 10 },
            identifier: None,
            n_max: None,
        };

        let table = &table;
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("full_run", size), &size, |b, _| {
            b.to_async(&runtime).iter(|| {
                let settings = settings.clone();
                async move {
                    let mut partitioner = BatchPartitioner::new(table, settings);
                    let mut sink = RecordingSink::default();
                    black_box(partitioner.run(&mut sink).await)
                }
            })
        });
    }

    group.finish();
}

criterion_group!(kernel_benches, bench_distance_kernels, bench_standardization);

criterion_group!(ranking_benches, bench_ranking_modes, bench_partitioning);

criterion_main!(kernel_benches, ranking_benches);
