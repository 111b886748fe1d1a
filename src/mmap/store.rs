//! Read-only memory-mapped vector store
//!
//! Opens a file written by [`super::MappedStoreBuilder`] and serves lookups
//! and queries straight out of the page cache. The id table and the vector
//! data are cast in place from the mapping, so opening is O(validation) and
//! nothing is copied until a query touches it.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use super::format::StoreHeader;
use crate::error::{Error, Result};
use crate::knn::{self, SearchResult, VectorSearch};
use crate::metric::DistanceMetric;

/// Immutable vector store backed by a memory-mapped file.
///
/// The mapping is released when the store is dropped; there is no explicit
/// close. Multiple stores may map the same file concurrently.
pub struct MappedStore {
    mmap: Mmap,
    header: StoreHeader,
}

impl MappedStore {
    /// Map a store file and validate its header and id table.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // Safety: the file is opened read-only and the format is append-free;
        // concurrent truncation by another process is undefined behavior, as
        // with any mapping.
        let mmap = unsafe { Mmap::map(&file)? };

        let header = StoreHeader::from_bytes(&mmap)?;
        let implied = header
            .file_size()
            .filter(|&size| size <= usize::MAX as u64)
            .ok_or_else(|| Error::corrupt("store header implies an impossible file size"))?;
        if mmap.len() as u64 != implied {
            return Err(Error::corrupt(format!(
                "store file is {} bytes, header implies {implied}",
                mmap.len()
            )));
        }

        let store = Self { mmap, header };

        // Ids must be strictly ascending for binary-search lookup.
        let ids = store.ids()?;
        if ids.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::corrupt("store id table is not strictly ascending"));
        }

        tracing::debug!(
            path = %path.display(),
            vectors = store.header.count,
            dimension = store.header.dimension,
            "opened mapped store"
        );
        Ok(store)
    }

    /// The id table, ascending.
    pub fn ids(&self) -> Result<&[u64]> {
        let start = self.header.ids_offset();
        let end = self.header.vectors_offset();
        bytemuck::try_cast_slice(&self.mmap[start..end])
            .map_err(|_| Error::corrupt("store id table is misaligned"))
    }

    fn vector_data(&self) -> Result<&[f32]> {
        // The mapping ends exactly at the vector section; open() checked it.
        let start = self.header.vectors_offset();
        bytemuck::try_cast_slice(&self.mmap[start..])
            .map_err(|_| Error::corrupt("store vector data is misaligned"))
    }

    /// The vector stored at slot `index` (id order).
    pub fn vector_at(&self, index: usize) -> Result<&[f32]> {
        if index >= self.header.count as usize {
            return Err(Error::invalid_argument(format!(
                "slot {index} out of range for {} vectors",
                self.header.count
            )));
        }
        let dim = self.header.dimension as usize;
        Ok(&self.vector_data()?[index * dim..(index + 1) * dim])
    }

    /// Look up a vector by id. `None` when absent.
    pub fn get(&self, id: u64) -> Option<&[f32]> {
        let ids = self.ids().ok()?;
        let slot = ids.binary_search(&id).ok()?;
        self.vector_at(slot).ok()
    }

    /// Iterate over `(id, vector)` pairs in id order.
    pub fn iter(&self) -> Result<impl Iterator<Item = (u64, &[f32])>> {
        let ids = self.ids()?;
        let data = self.vector_data()?;
        let dim = self.header.dimension as usize;
        Ok(ids
            .iter()
            .zip(data.chunks_exact(dim))
            .map(|(&id, v)| (id, v)))
    }

    /// Size of the mapped region in bytes.
    pub fn len_bytes(&self) -> usize {
        self.mmap.len()
    }
}

impl VectorSearch for MappedStore {
    fn size(&self) -> usize {
        self.header.count as usize
    }

    fn dimension(&self) -> usize {
        self.header.dimension as usize
    }

    fn metric(&self) -> DistanceMetric {
        self.header.metric
    }

    fn contains(&self, id: u64) -> bool {
        self.ids()
            .map(|ids| ids.binary_search(&id).is_ok())
            .unwrap_or(false)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.dimension() {
            return Err(Error::dimension_mismatch(self.dimension(), query.len()));
        }
        Ok(knn::top_k(self.header.metric, query, self.iter()?, k))
    }
}
