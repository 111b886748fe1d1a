//! HNSW binary persistence
//!
//! Stable little-endian layout carrying everything a loaded index needs to
//! reproduce the saved index's search results exactly: construction
//! parameters, every vector, every node's per-layer adjacency, and the
//! entry point.
//!
//! ```text
//! Magic    [u8; 8]   "VSPRHNSW"
//! Version  u32       1
//! Metric   u32       DistanceMetric discriminant
//! Dim      u32
//! Capacity u64       max_elements
//! M        u32
//! EfCons   u32
//! EfSearch u32
//! Seed     u64
//! Count    u64
//! Entry    u64       slot of the entry point, u64::MAX when empty
//! MaxLayer u32
//! Nodes    count ×   id u64, level u32,
//!                    per layer 0..=level: n u32, neighbor slots [u32; n]
//! Vectors  count × dim × f32, slot order
//! ```
//!
//! Saves stage to a `.tmp` sibling and rename into place, so a crashed or
//! failed save never leaves a file that `load` accepts.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use super::index::{HnswIndex, MAX_LEVEL};
use super::node::Node;
use crate::error::{Error, Result};
use crate::metric::DistanceMetric;

const MAGIC: [u8; 8] = *b"VSPRHNSW";
const VERSION: u32 = 1;

/// Slot of the entry point when the index is empty.
const NO_ENTRY: u64 = u64::MAX;

/// Upper bound on any single preallocation while loading. Sizes come from
/// the file, so a lying header must run out of bytes at `read_exact` before
/// a vector grows large, never abort on a giant `with_capacity`.
const PREALLOC_LIMIT: usize = 1 << 16;

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn read_u32(reader: &mut impl Read) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(reader: &mut impl Read) -> std::io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f32(reader: &mut impl Read) -> std::io::Result<f32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

impl HnswIndex {
    /// Serialize the whole index to a writer.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        let count = self.ids.len();
        if count > u32::MAX as usize {
            return Err(Error::invalid_argument(
                "index too large for the v1 graph format",
            ));
        }

        writer.write_all(&MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&self.metric.as_u32().to_le_bytes())?;
        writer.write_all(&(self.dimension as u32).to_le_bytes())?;
        writer.write_all(&(self.max_elements as u64).to_le_bytes())?;
        writer.write_all(&(self.m as u32).to_le_bytes())?;
        writer.write_all(&(self.ef_construction as u32).to_le_bytes())?;
        writer.write_all(&(self.ef_search as u32).to_le_bytes())?;
        writer.write_all(&self.seed.to_le_bytes())?;
        writer.write_all(&(count as u64).to_le_bytes())?;
        writer.write_all(&self.entry_point.map(|s| s as u64).unwrap_or(NO_ENTRY).to_le_bytes())?;
        writer.write_all(&(self.max_layer as u32).to_le_bytes())?;

        for (slot, node) in self.nodes.iter().enumerate() {
            writer.write_all(&self.ids[slot].to_le_bytes())?;
            writer.write_all(&(node.level() as u32).to_le_bytes())?;
            for neighbors in &node.layers {
                writer.write_all(&(neighbors.len() as u32).to_le_bytes())?;
                for &neighbor in neighbors {
                    writer.write_all(&(neighbor as u32).to_le_bytes())?;
                }
            }
        }

        for vector in &self.vectors {
            for &value in vector {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
        Ok(())
    }

    /// Save the index to `path`, staging through a temporary sibling file
    /// and renaming atomically.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let staged = staging_path(path);

        let result = (|| -> Result<()> {
            let file = File::create(&staged)?;
            let mut writer = BufWriter::new(file);
            self.serialize(&mut writer)?;
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

        tracing::debug!(path = %path.display(), nodes = self.ids.len(), "saved hnsw index");
        Ok(())
    }

    /// Load an index from `path`. Corrupted or truncated files fail with
    /// `File`; a version this build does not understand fails with
    /// `InvalidArgument`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let index = Self::deserialize(&mut reader)?;
        tracing::debug!(path = %path.display(), nodes = index.ids.len(), "loaded hnsw index");
        Ok(index)
    }

    /// Deserialize an index from a reader, validating the structure as it
    /// is read.
    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::corrupt("not a vesper hnsw file (bad magic)"));
        }

        let version = read_u32(reader)?;
        if version != VERSION {
            return Err(Error::invalid_argument(format!(
                "unsupported hnsw file version {version} (expected {VERSION})"
            )));
        }

        let metric = DistanceMetric::try_from(read_u32(reader)?)?;
        let dimension = read_u32(reader)? as usize;
        let max_elements = read_u64(reader)? as usize;
        let m = read_u32(reader)? as usize;
        let ef_construction = read_u32(reader)? as usize;
        let ef_search = read_u32(reader)? as usize;
        let seed = read_u64(reader)?;
        let count = read_u64(reader)? as usize;
        let entry_raw = read_u64(reader)?;
        let max_layer = read_u32(reader)? as usize;

        if dimension == 0 || m < 2 || ef_construction == 0 || ef_search == 0 {
            return Err(Error::corrupt("hnsw header holds impossible parameters"));
        }
        if max_layer > MAX_LEVEL {
            return Err(Error::corrupt(format!(
                "max layer {max_layer} exceeds the level cap {MAX_LEVEL}"
            )));
        }
        if count > max_elements {
            return Err(Error::corrupt(format!(
                "node count {count} exceeds declared capacity {max_elements}"
            )));
        }

        let entry_point = if entry_raw == NO_ENTRY {
            None
        } else {
            let slot = entry_raw as usize;
            if slot >= count {
                return Err(Error::corrupt("entry point references a missing node"));
            }
            Some(slot)
        };
        if count > 0 && entry_point.is_none() {
            return Err(Error::corrupt("non-empty index without an entry point"));
        }

        let mut ids = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        let mut nodes = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        let mut seen = std::collections::HashSet::with_capacity(count.min(PREALLOC_LIMIT));

        for _ in 0..count {
            let id = read_u64(reader)?;
            if !seen.insert(id) {
                return Err(Error::corrupt(format!("id {id} appears twice")));
            }

            let level = read_u32(reader)? as usize;
            if level > max_layer {
                return Err(Error::corrupt("node level exceeds the graph's max layer"));
            }

            let mut node = Node::new(level);
            for layer in 0..=level {
                let n = read_u32(reader)? as usize;
                let mut neighbors = Vec::with_capacity(n.min(PREALLOC_LIMIT));
                for _ in 0..n {
                    let neighbor = read_u32(reader)? as usize;
                    if neighbor >= count {
                        return Err(Error::corrupt("adjacency references a missing node"));
                    }
                    neighbors.push(neighbor);
                }
                node.set_neighbors(layer, neighbors);
            }
            ids.push(id);
            nodes.push(node);
        }

        let mut vectors = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        for _ in 0..count {
            let mut vector = Vec::with_capacity(dimension.min(PREALLOC_LIMIT));
            for _ in 0..dimension {
                vector.push(read_f32(reader)?);
            }
            vectors.push(vector);
        }

        // Anything after the vector block means the file was not produced
        // by this writer.
        let mut trailing = [0u8; 1];
        if reader.read(&mut trailing)? != 0 {
            return Err(Error::corrupt("trailing bytes after vector block"));
        }

        Ok(HnswIndex::from_parts(
            dimension,
            metric,
            max_elements,
            m,
            ef_construction,
            ef_search,
            seed,
            ids,
            vectors,
            nodes,
            entry_point,
            max_layer,
        ))
    }
}
