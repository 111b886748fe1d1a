//! Exact top-k selection
//!
//! The flat store and the memory-mapped store both answer queries by brute
//! force; this module holds the one selection routine they share so the two
//! cannot drift apart. Results are ordered ascending by score with ties
//! broken by ascending id, which makes exact search fully deterministic.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metric::DistanceMetric;

/// One search hit: the stored id and its score under the active metric
/// (smaller score = more similar).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: u64,
    pub score: f32,
}

/// The capability set shared by every store kind in the engine: lookup
/// metadata and k-nearest-neighbor search. The three implementations differ
/// in mutability and storage medium, not in query semantics.
pub trait VectorSearch {
    /// Number of stored vectors.
    fn size(&self) -> usize;

    /// Fixed per-instance vector dimension.
    fn dimension(&self) -> usize;

    /// Fixed per-instance distance metric.
    fn metric(&self) -> DistanceMetric;

    /// Whether the id is present.
    fn contains(&self, id: u64) -> bool;

    /// The `k` most similar stored vectors to `query`, ascending by score,
    /// ties by ascending id. Returns fewer than `k` when the store holds
    /// fewer vectors.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;
}

/// Total order on (score, id); NaN scores compare equal to everything so a
/// poisoned vector cannot panic a query.
#[inline]
fn rank(a: &SearchResult, b: &SearchResult) -> Ordering {
    a.score
        .partial_cmp(&b.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.id.cmp(&b.id))
}

/// Max-heap wrapper: the worst-ranked hit sits on top so it can be evicted
/// in O(log k) when a better candidate arrives.
#[derive(PartialEq)]
struct Worst(SearchResult);

impl Eq for Worst {}

impl Ord for Worst {
    fn cmp(&self, other: &Self) -> Ordering {
        rank(&self.0, &other.0)
    }
}

impl PartialOrd for Worst {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Scan `candidates`, scoring each against `query`, and keep the best `k`.
pub(crate) fn top_k<'a, I>(
    metric: DistanceMetric,
    query: &[f32],
    candidates: I,
    k: usize,
) -> Vec<SearchResult>
where
    I: Iterator<Item = (u64, &'a [f32])>,
{
    if k == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Worst> = BinaryHeap::with_capacity(k + 1);
    for (id, vector) in candidates {
        let hit = SearchResult {
            id,
            score: metric.score(query, vector),
        };
        if heap.len() < k {
            heap.push(Worst(hit));
        } else if rank(&hit, &heap.peek().map(|w| w.0).unwrap()) == Ordering::Less {
            heap.pop();
            heap.push(Worst(hit));
        }
    }

    let mut hits: Vec<SearchResult> = heap.into_iter().map(|w| w.0).collect();
    hits.sort_by(rank);
    hits
}
