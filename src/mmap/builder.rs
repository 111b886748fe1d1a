//! Offline builder for the immutable mapped store
//!
//! Accumulates id-keyed vectors in memory, then writes them once in the
//! id-sorted flat layout of [`crate::mmap::format`]. The builder holds no
//! index structure; sorting happens at save time. It is single-use: saving
//! consumes the builder, and the written file is never reopened for writing.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::format::StoreHeader;
use crate::error::{Error, Result};
use crate::metric::DistanceMetric;

/// Accumulates vectors and serializes them into a memory-mappable file.
pub struct MappedStoreBuilder {
    dimension: usize,
    metric: DistanceMetric,
    entries: Vec<(u64, Vec<f32>)>,
    seen: HashSet<u64>,
}

impl MappedStoreBuilder {
    /// Create an empty builder for the given dimension and metric.
    pub fn new(dimension: usize, metric: DistanceMetric) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::invalid_argument("dimension must be non-zero"));
        }
        Ok(Self {
            dimension,
            metric,
            entries: Vec::new(),
            seen: HashSet::new(),
        })
    }

    /// Append a vector. Fails with `DuplicateId` / `InvalidArgument`
    /// exactly like the flat store's `add`.
    pub fn add(&mut self, id: u64, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::dimension_mismatch(self.dimension, vector.len()));
        }
        if !self.seen.insert(id) {
            return Err(Error::DuplicateId(id));
        }
        self.entries.push((id, vector));
        Ok(())
    }

    /// Pre-allocate room for at least `capacity` vectors.
    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        let additional = capacity.saturating_sub(self.entries.len());
        self.entries
            .try_reserve(additional)
            .map_err(|_| Error::OutOfMemory)?;
        self.seen
            .try_reserve(additional)
            .map_err(|_| Error::OutOfMemory)
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Sort by id and write the store file. Stages to a `.tmp` sibling and
    /// renames into place, so a failed save never leaves a file that
    /// [`super::MappedStore::open`] accepts.
    pub fn save<P: AsRef<Path>>(mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let staged = staging_path(path);

        self.entries.sort_by_key(|(id, _)| *id);

        let result = (|| -> Result<()> {
            let file = File::create(&staged)?;
            let mut writer = BufWriter::new(file);

            let header = StoreHeader {
                metric: self.metric,
                dimension: self.dimension as u32,
                count: self.entries.len() as u64,
            };
            writer.write_all(&header.to_bytes())?;

            for (id, _) in &self.entries {
                writer.write_all(&id.to_le_bytes())?;
            }
            for (_, vector) in &self.entries {
                for &value in vector {
                    writer.write_all(&value.to_le_bytes())?;
                }
            }

            writer.flush()?;
            writer.get_ref().sync_all()?;
            Ok(())
        })();

        if let Err(err) = result {
            let _ = fs::remove_file(&staged);
            return Err(err);
        }
        if let Err(err) = fs::rename(&staged, path) {
            let _ = fs::remove_file(&staged);
            return Err(err.into());
        }

        tracing::debug!(
            path = %path.display(),
            vectors = self.entries.len(),
            dimension = self.dimension,
            "saved mapped store"
        );
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
