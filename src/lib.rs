//! Vesper DB – exact and approximate vector similarity search with
//! zero-copy mmap serving
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 VectorSearch (shared trait)                 │
//! │        size · dimension · metric · contains · search        │
//! ├──────────────────┬──────────────────┬───────────────────────┤
//! │    FlatStore     │    HnswIndex     │      MappedStore      │
//! │  exact, mutable  │  ANN, persisted  │  exact, mmap, frozen  │
//! ├──────────────────┴──────────────────┴───────────────────────┤
//! │        DistanceMetric (L2 · Cosine · Dot) over SIMD         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! All three store kinds score with the same [`DistanceMetric`] convention:
//! smaller score = more similar. Exact search (flat and mapped) is fully
//! deterministic; HNSW search is approximate, but construction is
//! reproducible from a fixed seed.

pub mod error;
pub mod flat;
pub mod hnsw;
pub mod knn;
pub mod metric;
pub mod mmap;
pub mod simd;

pub use error::{Error, Result};
pub use flat::FlatStore;
pub use hnsw::{HnswIndex, HnswStats};
pub use knn::{SearchResult, VectorSearch};
pub use metric::DistanceMetric;
pub use mmap::{MappedStore, MappedStoreBuilder};
pub use simd::{dot_product, l2_distance_squared};
