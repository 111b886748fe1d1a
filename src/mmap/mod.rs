//! Immutable memory-mapped vector store: a write-once [`MappedStoreBuilder`]
//! and a zero-copy read-only [`MappedStore`].

mod builder;
pub mod format;
mod store;

pub use builder::MappedStoreBuilder;
pub use store::MappedStore;
