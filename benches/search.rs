//! Search benchmarks across the three store kinds
//!
//! Run with: cargo bench --bench search

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::time::Duration;
use vesper_db::simd::l2_normalized;
use vesper_db::{DistanceMetric, FlatStore, HnswIndex, MappedStore, MappedStoreBuilder, VectorSearch};

fn random_vector(dim: usize, rng: &mut StdRng) -> Vec<f32> {
    let v: Vec<f32> = (0..dim).map(|_| rng.gen::<f32>() - 0.5).collect();
    l2_normalized(&v)
}

fn bench_flat_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_search");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(3));

    for num_vectors in [1000, 10_000] {
        let mut rng = StdRng::seed_from_u64(1000 + num_vectors as u64);
        let mut store = FlatStore::new(128, DistanceMetric::L2).unwrap();
        for id in 0..num_vectors {
            store.add(id, random_vector(128, &mut rng)).unwrap();
        }
        let query = random_vector(128, &mut rng);

        group.bench_with_input(
            BenchmarkId::from_parameter(num_vectors),
            &num_vectors,
            |b, _| b.iter(|| black_box(store.search(&query, 10).unwrap())),
        );
    }

    group.finish();
}

fn bench_hnsw_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_insert");

    // Insert rebuilds the whole index each iteration, so keep it small.
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    for num_vectors in [100, 500, 1000] {
        let mut rng = StdRng::seed_from_u64(2000 + num_vectors as u64);
        let vectors: Vec<_> = (0..num_vectors)
            .map(|_| random_vector(128, &mut rng))
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(num_vectors),
            &num_vectors,
            |b, &n| {
                b.iter(|| {
                    let mut index =
                        HnswIndex::with_params(128, DistanceMetric::L2, n, 16, 100, 42).unwrap();
                    for (id, v) in vectors.iter().enumerate() {
                        index.add(id as u64, v.clone()).unwrap();
                    }
                    black_box(index.size())
                })
            },
        );
    }

    group.finish();
}

fn bench_hnsw_search(c: &mut Criterion) {
    let num_vectors = 5000;
    let mut rng = StdRng::seed_from_u64(4242);
    let mut index =
        HnswIndex::with_params(128, DistanceMetric::L2, num_vectors, 16, 100, 42).unwrap();
    for id in 0..num_vectors {
        index.add(id as u64, random_vector(128, &mut rng)).unwrap();
    }

    let mut group = c.benchmark_group("hnsw_search");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(3));

    for ef in [20, 50, 100] {
        let mut query_rng = StdRng::seed_from_u64(ef as u64 + 5000);
        let query = random_vector(128, &mut query_rng);
        index.set_ef_search(ef).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(ef), &ef, |b, _| {
            b.iter(|| black_box(index.search(&query, 10).unwrap()))
        });
    }

    group.finish();
}

fn bench_mapped_search(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.vsp");

    let num_vectors = 10_000u64;
    let mut rng = StdRng::seed_from_u64(7777);
    let mut builder = MappedStoreBuilder::new(128, DistanceMetric::L2).unwrap();
    for id in 0..num_vectors {
        builder.add(id, random_vector(128, &mut rng)).unwrap();
    }
    builder.save(&path).unwrap();

    let store = MappedStore::open(&path).unwrap();
    let query = random_vector(128, &mut rng);

    let mut group = c.benchmark_group("mapped_search");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(3));

    group.bench_function("10000x128", |b| {
        b.iter(|| black_box(store.search(&query, 10).unwrap()))
    });
    group.bench_function("open", |b| {
        b.iter(|| black_box(MappedStore::open(&path).unwrap().size()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_flat_search,
    bench_hnsw_insert,
    bench_hnsw_search,
    bench_mapped_search
);
criterion_main!(benches);
