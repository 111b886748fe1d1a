//! Approximate nearest-neighbor search over a navigable multi-layer graph
//! (HNSW), with seeded reproducible construction and versioned binary
//! persistence.

mod index;
mod node;
mod serialize;
mod visited;

pub use index::{HnswIndex, HnswStats, DEFAULT_EF_CONSTRUCTION, DEFAULT_M};
