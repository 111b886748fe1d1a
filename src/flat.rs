//! Flat vector store
//!
//! A mutable id → vector mapping with exact brute-force search: O(n·d) per
//! query, which is fine for small and medium collections and doubles as the
//! correctness baseline the HNSW index is measured against.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::knn::{self, SearchResult, VectorSearch};
use crate::metric::DistanceMetric;

/// Mutable exact-search vector store.
///
/// Dimension and metric are fixed at creation; every stored vector has
/// exactly `dimension` components and ids are unique.
pub struct FlatStore {
    dimension: usize,
    metric: DistanceMetric,
    vectors: HashMap<u64, Vec<f32>>,
}

impl FlatStore {
    /// Create an empty store with the given dimension and metric.
    pub fn new(dimension: usize, metric: DistanceMetric) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::invalid_argument("dimension must be non-zero"));
        }
        Ok(Self {
            dimension,
            metric,
            vectors: HashMap::new(),
        })
    }

    /// Insert a new vector. Fails with `DuplicateId` if the id is present
    /// and `InvalidArgument` on dimension mismatch; on failure the store is
    /// unchanged.
    pub fn add(&mut self, id: u64, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::dimension_mismatch(self.dimension, vector.len()));
        }
        if self.vectors.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }
        self.vectors.insert(id, vector);
        Ok(())
    }

    /// Remove a vector. Removing an absent id is not an error: it returns
    /// `false` and leaves the store unchanged.
    pub fn remove(&mut self, id: u64) -> bool {
        self.vectors.remove(&id).is_some()
    }

    /// Look up a vector by id.
    pub fn get(&self, id: u64) -> Option<&[f32]> {
        self.vectors.get(&id).map(|v| v.as_slice())
    }

    /// Replace the vector stored under an existing id.
    pub fn update(&mut self, id: u64, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::dimension_mismatch(self.dimension, vector.len()));
        }
        match self.vectors.get_mut(&id) {
            Some(slot) => {
                *slot = vector;
                Ok(())
            }
            None => Err(Error::IdNotFound(id)),
        }
    }

    /// Pre-allocate room for at least `capacity` entries. Never shrinks and
    /// never changes `size()`.
    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        let additional = capacity.saturating_sub(self.vectors.len());
        self.vectors
            .try_reserve(additional)
            .map_err(|_| Error::OutOfMemory)
    }

    /// Drop every record; dimension and metric are unchanged.
    pub fn clear(&mut self) {
        self.vectors.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Iterate over stored `(id, vector)` records in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[f32])> {
        self.vectors.iter().map(|(id, v)| (*id, v.as_slice()))
    }
}

impl VectorSearch for FlatStore {
    fn size(&self) -> usize {
        self.vectors.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn contains(&self, id: u64) -> bool {
        self.vectors.contains_key(&id)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.dimension {
            return Err(Error::dimension_mismatch(self.dimension, query.len()));
        }
        Ok(knn::top_k(self.metric, query, self.iter(), k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_123() -> FlatStore {
        let mut store = FlatStore::new(4, DistanceMetric::L2).unwrap();
        store.add(1, vec![0.0, 0.0, 0.0, 0.0]).unwrap();
        store.add(2, vec![1.0, 0.0, 0.0, 0.0]).unwrap();
        store.add(3, vec![2.0, 0.0, 0.0, 0.0]).unwrap();
        store
    }

    #[test]
    fn test_search_nearest_two() {
        let store = store_123();
        let hits = store.search(&[0.0, 0.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 1);
        assert!(hits[0].score.abs() < 1e-6);
        assert_eq!(hits[1].id, 2);
        assert!((hits[1].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_add_duplicate_id_leaves_size_unchanged() {
        let mut store = FlatStore::new(2, DistanceMetric::L2).unwrap();
        store.add(1, vec![1.0, 2.0]).unwrap();
        let err = store.add(1, vec![3.0, 4.0]).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(1)));
        assert_eq!(store.size(), 1);
        assert_eq!(store.get(1).unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn test_add_dimension_mismatch() {
        let mut store = FlatStore::new(4, DistanceMetric::L2).unwrap();
        assert!(matches!(
            store.add(1, vec![1.0, 2.0]),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn test_remove_semantics() {
        let mut store = store_123();
        assert!(store.remove(2));
        assert_eq!(store.size(), 2);
        assert!(!store.contains(2));

        // Absent id: false, no error, nothing changes.
        assert!(!store.remove(99));
        assert_eq!(store.size(), 2);
    }

    #[test]
    fn test_get_roundtrip_bit_identical() {
        let mut store = FlatStore::new(3, DistanceMetric::Cosine).unwrap();
        let v = vec![0.1f32, -2.5, 1e-20];
        store.add(7, v.clone()).unwrap();
        assert_eq!(store.get(7).unwrap(), v.as_slice());
        assert!(store.get(8).is_none());
    }

    #[test]
    fn test_update_semantics() {
        let mut store = store_123();
        store.update(2, vec![9.0, 9.0, 9.0, 9.0]).unwrap();
        assert_eq!(store.get(2).unwrap(), &[9.0, 9.0, 9.0, 9.0]);

        assert!(matches!(
            store.update(42, vec![0.0; 4]),
            Err(Error::IdNotFound(42))
        ));
        assert!(matches!(
            store.update(2, vec![0.0; 3]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_search_k_exceeds_size() {
        let store = store_123();
        let hits = store.search(&[0.0; 4], 10).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_search_query_dimension_mismatch() {
        let store = store_123();
        assert!(matches!(
            store.search(&[0.0; 3], 1),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_search_empty_store() {
        let store = FlatStore::new(4, DistanceMetric::L2).unwrap();
        assert!(store.search(&[0.0; 4], 5).unwrap().is_empty());
    }

    #[test]
    fn test_clear_keeps_dimension_and_metric() {
        let mut store = store_123();
        store.clear();
        assert_eq!(store.size(), 0);
        assert!(store.is_empty());
        assert_eq!(store.dimension(), 4);
        assert_eq!(store.metric(), DistanceMetric::L2);
        // Usable after clear.
        store.add(1, vec![1.0; 4]).unwrap();
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_reserve_is_a_hint() {
        let mut store = store_123();
        store.reserve(1000).unwrap();
        assert_eq!(store.size(), 3);
    }

    #[test]
    fn test_dot_metric_ranking() {
        let mut store = FlatStore::new(2, DistanceMetric::Dot).unwrap();
        store.add(1, vec![1.0, 0.0]).unwrap();
        store.add(2, vec![5.0, 0.0]).unwrap();
        store.add(3, vec![-1.0, 0.0]).unwrap();

        let hits = store.search(&[1.0, 0.0], 3).unwrap();
        // Largest raw dot product ranks first.
        let ids: Vec<u64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}
