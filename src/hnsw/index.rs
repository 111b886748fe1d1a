//! HNSW index
//!
//! A multi-layer navigable proximity graph over id-keyed vectors. Insertion
//! draws a geometric random level, descends greedily from the entry point,
//! then wires bidirectional edges on every layer from that level down to the
//! base, using a diversity-aware neighbor selection so the graph stays
//! navigable instead of clustering. Search is the same descent followed by a
//! beam search on the base layer with a caller-tunable width (`ef_search`).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::node::Node;
use super::visited::VisitedGuard;
use crate::error::{Error, Result};
use crate::knn::{SearchResult, VectorSearch};
use crate::metric::DistanceMetric;

/// Default max neighbors per node per upper layer.
pub const DEFAULT_M: usize = 16;

/// Default candidate-list width while inserting.
pub const DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Hard cap on the drawn level; keeps a pathological RNG draw from
/// allocating an absurd layer stack. The loader enforces the same cap on
/// persisted files.
pub(crate) const MAX_LEVEL: usize = 31;

/// Min-heap entry: the closest unexpanded candidate pops first.
#[derive(Clone, Copy)]
struct Closest {
    slot: usize,
    dist: f32,
}

impl PartialEq for Closest {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist
    }
}

impl Eq for Closest {}

impl Ord for Closest {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .partial_cmp(&self.dist)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Closest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Max-heap entry: the worst kept result sits on top for O(log ef) eviction.
#[derive(Clone, Copy)]
struct Farthest {
    slot: usize,
    dist: f32,
}

impl PartialEq for Farthest {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist
    }
}

impl Eq for Farthest {}

impl Ord for Farthest {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .partial_cmp(&other.dist)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Farthest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Approximate nearest-neighbor index with tunable recall/latency trade-off
/// and binary save/restore.
///
/// Nodes live in dense parallel arrays (`ids`, `vectors`, `nodes`) addressed
/// by slot; adjacency lists hold slots. External ids map to slots through a
/// hash map, so callers never see slot numbers.
#[derive(Debug)]
pub struct HnswIndex {
    pub(crate) dimension: usize,
    pub(crate) metric: DistanceMetric,
    pub(crate) max_elements: usize,
    pub(crate) m: usize,
    pub(crate) m0: usize,
    pub(crate) ml: f64,
    pub(crate) ef_construction: usize,
    pub(crate) ef_search: usize,
    pub(crate) seed: u64,
    rng: StdRng,
    pub(crate) ids: Vec<u64>,
    pub(crate) vectors: Vec<Vec<f32>>,
    pub(crate) nodes: Vec<Node>,
    id_to_slot: HashMap<u64, usize>,
    pub(crate) entry_point: Option<usize>,
    pub(crate) max_layer: usize,
}

impl HnswIndex {
    /// Create an index with default parameters (M = 16, ef_construction =
    /// 200) and a time-derived seed.
    pub fn new(dimension: usize, metric: DistanceMetric, max_elements: usize) -> Result<Self> {
        Self::with_params(
            dimension,
            metric,
            max_elements,
            DEFAULT_M,
            DEFAULT_EF_CONSTRUCTION,
            rand::random(),
        )
    }

    /// Create an index with explicit construction parameters. A fixed seed
    /// plus a fixed insertion order reproduces the graph topology exactly.
    pub fn with_params(
        dimension: usize,
        metric: DistanceMetric,
        max_elements: usize,
        m: usize,
        ef_construction: usize,
        seed: u64,
    ) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::invalid_argument("dimension must be non-zero"));
        }
        if max_elements == 0 {
            return Err(Error::invalid_argument("max_elements must be non-zero"));
        }
        if m < 2 {
            return Err(Error::invalid_argument("M must be at least 2"));
        }
        if ef_construction == 0 {
            return Err(Error::invalid_argument("ef_construction must be non-zero"));
        }

        Ok(Self {
            dimension,
            metric,
            max_elements,
            m,
            m0: m * 2,
            ml: 1.0 / (m as f64).ln(),
            ef_construction,
            ef_search: ef_construction,
            seed,
            rng: StdRng::seed_from_u64(seed),
            ids: Vec::new(),
            vectors: Vec::new(),
            nodes: Vec::new(),
            id_to_slot: HashMap::new(),
            entry_point: None,
            max_layer: 0,
        })
    }

    /// Reassemble an index from deserialized parts. The caller (the loader)
    /// has already validated slot bounds and id uniqueness.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        dimension: usize,
        metric: DistanceMetric,
        max_elements: usize,
        m: usize,
        ef_construction: usize,
        ef_search: usize,
        seed: u64,
        ids: Vec<u64>,
        vectors: Vec<Vec<f32>>,
        nodes: Vec<Node>,
        entry_point: Option<usize>,
        max_layer: usize,
    ) -> Self {
        let id_to_slot = ids.iter().enumerate().map(|(slot, &id)| (id, slot)).collect();
        Self {
            dimension,
            metric,
            max_elements,
            m,
            m0: m * 2,
            ml: 1.0 / (m as f64).ln(),
            ef_construction,
            ef_search,
            seed,
            rng: StdRng::seed_from_u64(seed),
            ids,
            vectors,
            nodes,
            id_to_slot,
            entry_point,
            max_layer,
        }
    }

    /// Hard capacity fixed at creation.
    pub fn capacity(&self) -> usize {
        self.max_elements
    }

    /// Current query-time beam width.
    pub fn ef_search(&self) -> usize {
        self.ef_search
    }

    /// Tune the query-time beam width. Larger values raise recall at the
    /// cost of latency; takes effect on the next search, no rebuild needed.
    pub fn set_ef_search(&mut self, ef_search: usize) -> Result<()> {
        if ef_search == 0 {
            return Err(Error::invalid_argument("ef_search must be non-zero"));
        }
        self.ef_search = ef_search;
        Ok(())
    }

    /// Look up the stored vector for an id.
    pub fn get_vector(&self, id: u64) -> Result<&[f32]> {
        let slot = *self.id_to_slot.get(&id).ok_or(Error::IdNotFound(id))?;
        Ok(&self.vectors[slot])
    }

    /// Insert a vector. Fails with `IndexFull` at capacity, `DuplicateId`
    /// for a present id, and `InvalidArgument` on dimension mismatch; a
    /// failed insert leaves the graph untouched.
    pub fn add(&mut self, id: u64, vector: Vec<f32>) -> Result<()> {
        if self.ids.len() == self.max_elements {
            return Err(Error::IndexFull(self.max_elements));
        }
        if self.id_to_slot.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }
        if vector.len() != self.dimension {
            return Err(Error::dimension_mismatch(self.dimension, vector.len()));
        }

        let slot = self.nodes.len();
        let level = self.random_level();
        let mut node = Node::new(level);

        if let Some(entry) = self.entry_point {
            let mut current = entry;

            // Zoom in: single-nearest greedy walk on every layer above the
            // new node's level.
            for layer in (level + 1..=self.max_layer).rev() {
                if let Some(&(best, _)) = self.search_layer(&vector, current, 1, layer).first() {
                    current = best;
                }
            }

            // Wire in: beam search per layer, then link a diverse subset
            // bidirectionally. Mutations of existing nodes are deferred so a
            // re-selection sees each neighbor's pre-insert adjacency.
            let mut backlinks: Vec<(usize, usize)> = Vec::new();
            let mut reselects: Vec<(usize, usize, Vec<usize>)> = Vec::new();

            for layer in (0..=level.min(self.max_layer)).rev() {
                let cap = if layer == 0 { self.m0 } else { self.m };
                let candidates =
                    self.search_layer(&vector, current, self.ef_construction, layer);
                let selected = self.select_neighbors(&candidates, cap, None);

                for &(neighbor, _) in &selected {
                    node.add_neighbor(layer, neighbor);

                    if self.nodes[neighbor].neighbors(layer).len() >= cap {
                        // The reverse edge would overflow this neighbor:
                        // re-select its adjacency with the new node included,
                        // dropping its weakest edge.
                        let neighbor_vec = &self.vectors[neighbor];
                        let mut pool: Vec<(usize, f32)> = self.nodes[neighbor]
                            .neighbors(layer)
                            .iter()
                            .map(|&n| (n, self.metric.score(neighbor_vec, &self.vectors[n])))
                            .collect();
                        pool.push((slot, self.metric.score(neighbor_vec, &vector)));

                        let kept =
                            self.select_neighbors(&pool, cap, Some((slot, &vector)));
                        reselects.push((
                            neighbor,
                            layer,
                            kept.into_iter().map(|(s, _)| s).collect(),
                        ));
                    } else {
                        backlinks.push((neighbor, layer));
                    }
                }

                if let Some(&(best, _)) = candidates.first() {
                    current = best;
                }
            }

            for (neighbor, layer) in backlinks {
                self.nodes[neighbor].add_neighbor(layer, slot);
            }
            for (neighbor, layer, kept) in reselects {
                self.nodes[neighbor].set_neighbors(layer, kept);
            }

            if level > self.max_layer {
                self.max_layer = level;
                self.entry_point = Some(slot);
            }
        } else {
            // First node becomes the entry point.
            self.entry_point = Some(slot);
            self.max_layer = level;
        }

        self.id_to_slot.insert(id, slot);
        self.ids.push(id);
        self.vectors.push(vector);
        self.nodes.push(node);
        Ok(())
    }

    /// Per-layer statistics: node count per layer and total edge count.
    pub fn stats(&self) -> HnswStats {
        let mut layer_counts = vec![0usize; self.max_layer + 1];
        let mut total_edges = 0;
        for node in &self.nodes {
            for (layer, neighbors) in node.layers.iter().enumerate() {
                if layer < layer_counts.len() {
                    layer_counts[layer] += 1;
                }
                total_edges += neighbors.len();
            }
        }
        HnswStats {
            num_nodes: self.nodes.len(),
            max_layer: self.max_layer,
            layer_counts,
            total_edges,
            m: self.m,
            ef_construction: self.ef_construction,
        }
    }

    /// Draw a level from the geometric distribution with multiplier
    /// `1/ln(M)`. The draw is clamped away from 0 so `ln` stays finite.
    fn random_level(&mut self) -> usize {
        let r: f64 = self.rng.gen::<f64>().max(f64::MIN_POSITIVE);
        ((-r.ln() * self.ml).floor() as usize).min(MAX_LEVEL)
    }

    #[inline]
    fn distance(&self, query: &[f32], slot: usize) -> f32 {
        self.metric.score(query, &self.vectors[slot])
    }

    /// Beam search on one layer: expand the closest frontier candidate until
    /// nothing within the beam can improve the kept set. Returns up to `ef`
    /// hits sorted ascending by distance.
    fn search_layer(
        &self,
        query: &[f32],
        entry: usize,
        ef: usize,
        layer: usize,
    ) -> Vec<(usize, f32)> {
        let mut visited = VisitedGuard::new(self.nodes.len());
        let mut frontier: BinaryHeap<Closest> = BinaryHeap::with_capacity(ef);
        let mut kept: BinaryHeap<Farthest> = BinaryHeap::with_capacity(ef + 1);

        let entry_dist = self.distance(query, entry);
        visited.insert(entry);
        frontier.push(Closest {
            slot: entry,
            dist: entry_dist,
        });
        kept.push(Farthest {
            slot: entry,
            dist: entry_dist,
        });

        while let Some(current) = frontier.pop() {
            if let Some(worst) = kept.peek() {
                if current.dist > worst.dist && kept.len() >= ef {
                    break;
                }
            }

            for &neighbor in self.nodes[current.slot].neighbors(layer) {
                if visited.contains(neighbor) {
                    continue;
                }
                visited.insert(neighbor);

                let dist = self.distance(query, neighbor);
                let dominated = kept.len() >= ef
                    && dist > kept.peek().map(|w| w.dist).unwrap_or(f32::INFINITY);
                if !dominated {
                    frontier.push(Closest {
                        slot: neighbor,
                        dist,
                    });
                    kept.push(Farthest {
                        slot: neighbor,
                        dist,
                    });
                    if kept.len() > ef {
                        kept.pop();
                    }
                }
            }
        }

        let mut hits: Vec<(usize, f32)> = kept.into_iter().map(|f| (f.slot, f.dist)).collect();
        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        hits
    }

    /// Diversity-aware neighbor selection: take a candidate only if it is
    /// closer to the query point than to any already-selected neighbor, so
    /// selected edges spread across directions instead of piling into one
    /// cluster. If diversity leaves the list short, fill with the closest
    /// remaining candidates; a non-empty candidate list always yields at
    /// least one edge, preserving connectivity.
    ///
    /// `pending` carries a slot that is not yet in the vector arrays (the
    /// node being inserted), with its vector.
    fn select_neighbors(
        &self,
        candidates: &[(usize, f32)],
        cap: usize,
        pending: Option<(usize, &[f32])>,
    ) -> Vec<(usize, f32)> {
        if candidates.is_empty() {
            return Vec::new();
        }

        fn vector_of<'a>(
            vectors: &'a [Vec<f32>],
            pending: Option<(usize, &'a [f32])>,
            slot: usize,
        ) -> &'a [f32] {
            match pending {
                Some((p, v)) if p == slot => v,
                _ => &vectors[slot],
            }
        }

        let mut sorted = candidates.to_vec();
        sorted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        let mut selected: Vec<(usize, f32)> = Vec::with_capacity(cap);
        for &(candidate, dist) in &sorted {
            if selected.len() >= cap {
                break;
            }
            let candidate_vec = vector_of(&self.vectors, pending, candidate);
            let diverse = selected.iter().all(|&(kept, _)| {
                self.metric
                    .score(candidate_vec, vector_of(&self.vectors, pending, kept))
                    >= dist
            });
            if diverse {
                selected.push((candidate, dist));
            }
        }

        if selected.len() < cap {
            for &(candidate, dist) in &sorted {
                if selected.len() >= cap {
                    break;
                }
                if !selected.iter().any(|&(s, _)| s == candidate) {
                    selected.push((candidate, dist));
                }
            }
        }

        selected
    }
}

impl VectorSearch for HnswIndex {
    fn size(&self) -> usize {
        self.ids.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn contains(&self, id: u64) -> bool {
        self.id_to_slot.contains_key(&id)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.dimension {
            return Err(Error::dimension_mismatch(self.dimension, query.len()));
        }

        let entry = match self.entry_point {
            Some(entry) if k > 0 => entry,
            _ => return Ok(Vec::new()),
        };

        let mut current = entry;
        for layer in (1..=self.max_layer).rev() {
            if let Some(&(best, _)) = self.search_layer(query, current, 1, layer).first() {
                current = best;
            }
        }

        // The effective beam is never narrower than k.
        let ef = self.ef_search.max(k);
        let found = self.search_layer(query, current, ef, 0);

        let mut hits: Vec<SearchResult> = found
            .into_iter()
            .map(|(slot, score)| SearchResult {
                id: self.ids[slot],
                score,
            })
            .collect();
        hits.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);
        Ok(hits)
    }
}

/// Snapshot of the graph shape, mainly for diagnostics and tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswStats {
    pub num_nodes: usize,
    pub max_layer: usize,
    pub layer_counts: Vec<usize>,
    pub total_edges: usize,
    pub m: usize,
    pub ef_construction: usize,
}
