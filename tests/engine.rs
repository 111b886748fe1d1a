//! End-to-end tests across the three store kinds: flat vs mapped result
//! equality, HNSW persistence parity, and HNSW recall against exact search.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;
use vesper_db::{
    DistanceMetric, FlatStore, HnswIndex, MappedStore, MappedStoreBuilder, SearchResult,
    VectorSearch,
};

fn random_vectors(n: usize, dim: usize, seed: u64) -> Vec<(u64, Vec<f32>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let v: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
            (i as u64, v)
        })
        .collect()
}

#[test]
fn test_builder_roundtrip_preserves_every_vector() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("vectors.vsp");
    let data = random_vectors(1000, 32, 7);

    let mut builder = MappedStoreBuilder::new(32, DistanceMetric::L2).unwrap();
    builder.reserve(data.len()).unwrap();
    for (id, v) in &data {
        builder.add(*id, v.clone()).unwrap();
    }
    builder.save(&path).unwrap();

    let store = MappedStore::open(&path).unwrap();
    assert_eq!(store.size(), 1000);
    for (id, v) in &data {
        assert_eq!(store.get(*id), Some(v.as_slice()));
    }
}

#[test]
fn test_mapped_store_with_sparse_ids() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sparse.vsp");

    // Widely scattered ids, inserted out of order.
    let ids = [u64::MAX - 1, 7, 1_000_000, 0, 42];
    let mut builder = MappedStoreBuilder::new(3, DistanceMetric::L2).unwrap();
    for &id in &ids {
        builder.add(id, vec![id as f32, 0.0, 0.0]).unwrap();
    }
    builder.save(&path).unwrap();

    let store = MappedStore::open(&path).unwrap();
    for &id in &ids {
        assert_eq!(store.get(id), Some(&[id as f32, 0.0, 0.0][..]));
    }
    assert!(store.get(43).is_none());
    assert!(!store.contains(u64::MAX));
}

#[test]
fn test_flat_and_mapped_agree_on_exact_search() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("vectors.vsp");
    let data = random_vectors(500, 16, 11);

    let mut flat = FlatStore::new(16, DistanceMetric::Cosine).unwrap();
    let mut builder = MappedStoreBuilder::new(16, DistanceMetric::Cosine).unwrap();
    for (id, v) in &data {
        flat.add(*id, v.clone()).unwrap();
        builder.add(*id, v.clone()).unwrap();
    }
    builder.save(&path).unwrap();
    let mapped = MappedStore::open(&path).unwrap();

    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..20 {
        let query: Vec<f32> = (0..16).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let a = flat.search(&query, 10).unwrap();
        let b = mapped.search(&query, 10).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn test_hnsw_save_load_search_parity() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("graph.hnsw");
    let data = random_vectors(400, 24, 3);

    let mut index = HnswIndex::with_params(24, DistanceMetric::L2, 400, 12, 80, 42).unwrap();
    for (id, v) in &data {
        index.add(*id, v.clone()).unwrap();
    }
    index.save(&path).unwrap();
    let loaded = HnswIndex::load(&path).unwrap();

    assert_eq!(loaded.size(), index.size());
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..10 {
        let query: Vec<f32> = (0..24).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let before = index.search(&query, 5).unwrap();
        let after = loaded.search(&query, 5).unwrap();
        assert_eq!(before, after);
    }
}

#[test]
fn test_hnsw_recall_against_flat() {
    let data = random_vectors(1500, 48, 21);

    let mut flat = FlatStore::new(48, DistanceMetric::L2).unwrap();
    let mut index = HnswIndex::with_params(48, DistanceMetric::L2, 1500, 16, 200, 17).unwrap();
    for (id, v) in &data {
        flat.add(*id, v.clone()).unwrap();
        index.add(*id, v.clone()).unwrap();
    }
    index.set_ef_search(120).unwrap();

    let mut rng = StdRng::seed_from_u64(8);
    let mut found = 0usize;
    let mut total = 0usize;
    for _ in 0..25 {
        let query: Vec<f32> = (0..48).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let exact = flat.search(&query, 10).unwrap();
        let approx = index.search(&query, 10).unwrap();
        let approx_ids: Vec<u64> = approx.iter().map(|h| h.id).collect();
        total += exact.len();
        found += exact.iter().filter(|h| approx_ids.contains(&h.id)).count();
    }
    let recall = found as f64 / total as f64;
    assert!(recall > 0.8, "recall {recall} too low");
}

#[test]
fn test_search_results_are_ascending_with_id_tiebreak() {
    // Duplicated coordinates force score ties in all three stores.
    let mut flat = FlatStore::new(2, DistanceMetric::L2).unwrap();
    for id in 0..8u64 {
        flat.add(id, vec![(id % 2) as f32, 0.0]).unwrap();
    }
    let hits = flat.search(&[0.0, 0.0], 8).unwrap();
    assert_eq!(
        hits,
        vec![
            SearchResult { id: 0, score: 0.0 },
            SearchResult { id: 2, score: 0.0 },
            SearchResult { id: 4, score: 0.0 },
            SearchResult { id: 6, score: 0.0 },
            SearchResult { id: 1, score: 1.0 },
            SearchResult { id: 3, score: 1.0 },
            SearchResult { id: 5, score: 1.0 },
            SearchResult { id: 7, score: 1.0 },
        ]
    );
}

#[test]
fn test_metrics_agree_across_store_kinds() {
    let dir = tempdir().unwrap();
    for metric in [DistanceMetric::L2, DistanceMetric::Cosine, DistanceMetric::Dot] {
        let path = dir.path().join(format!("store-{}.vsp", metric.as_u32()));
        let data = random_vectors(100, 8, 2 + metric.as_u32() as u64);

        let mut flat = FlatStore::new(8, metric).unwrap();
        let mut builder = MappedStoreBuilder::new(8, metric).unwrap();
        for (id, v) in &data {
            flat.add(*id, v.clone()).unwrap();
            builder.add(*id, v.clone()).unwrap();
        }
        builder.save(&path).unwrap();
        let mapped = MappedStore::open(&path).unwrap();
        assert_eq!(mapped.metric(), metric);

        let query = vec![0.25f32; 8];
        assert_eq!(
            flat.search(&query, 5).unwrap(),
            mapped.search(&query, 5).unwrap()
        );
    }
}
