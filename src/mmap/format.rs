//! Immutable store file format
//!
//! ```text
//! Offset   Size    Type        Description
//! ──────────────────────────────────────────────────
//! 0x00     8       [u8; 8]     Magic: "VESPMMAP"
//! 0x08     4       u32 LE      Format version (1)
//! 0x0C     4       u32 LE      Distance metric discriminant
//! 0x10     4       u32 LE      D: dimension
//! 0x14     4       [u8; 4]     Reserved (zero)
//! 0x18     8       u64 LE      N: number of vectors
//! 0x20     N*8     [u64]       Ids, strictly ascending
//! …        N*D*4   [f32]       Vector data, id order
//! ──────────────────────────────────────────────────
//! ```
//!
//! The 32-byte header keeps the id section 8-byte aligned and the vector
//! section 4-byte aligned, so both can be cast straight out of the mapping.

use crate::error::{Error, Result};
use crate::metric::DistanceMetric;

/// Magic bytes identifying a vesper mapped-store file.
pub const MAGIC: [u8; 8] = *b"VESPMMAP";

/// Current format version.
pub const VERSION: u32 = 1;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 32;

/// Parsed mapped-store header.
#[derive(Debug, Clone, Copy)]
pub struct StoreHeader {
    pub metric: DistanceMetric,
    pub dimension: u32,
    pub count: u64,
}

impl StoreHeader {
    /// Parse and validate the first [`HEADER_SIZE`] bytes of a file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::corrupt("file too small for a store header"));
        }
        if bytes[0..8] != MAGIC {
            return Err(Error::corrupt("not a vesper store file (bad magic)"));
        }

        let version = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        if version != VERSION {
            return Err(Error::invalid_argument(format!(
                "unsupported store file version {version} (expected {VERSION})"
            )));
        }

        let metric = DistanceMetric::try_from(u32::from_le_bytes(bytes[12..16].try_into().unwrap()))?;
        let dimension = u32::from_le_bytes(bytes[16..20].try_into().unwrap());
        if dimension == 0 {
            return Err(Error::corrupt("store header declares dimension 0"));
        }
        let count = u64::from_le_bytes(bytes[24..32].try_into().unwrap());

        Ok(Self {
            metric,
            dimension,
            count,
        })
    }

    /// Encode the header; bytes 20..24 stay reserved.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..8].copy_from_slice(&MAGIC);
        buf[8..12].copy_from_slice(&VERSION.to_le_bytes());
        buf[12..16].copy_from_slice(&self.metric.as_u32().to_le_bytes());
        buf[16..20].copy_from_slice(&self.dimension.to_le_bytes());
        buf[24..32].copy_from_slice(&self.count.to_le_bytes());
        buf
    }

    /// Byte offset of the id section.
    #[inline(always)]
    pub fn ids_offset(&self) -> usize {
        HEADER_SIZE
    }

    /// Byte offset of the vector section. Only meaningful once
    /// [`Self::file_size`] has been validated against the actual file.
    #[inline(always)]
    pub fn vectors_offset(&self) -> usize {
        HEADER_SIZE + self.count as usize * std::mem::size_of::<u64>()
    }

    /// Total file size implied by the header, or `None` when the arithmetic
    /// overflows. A header with a fabricated `count` must fail here, not
    /// wrap and pass the size check.
    pub fn file_size(&self) -> Option<u64> {
        let ids = self.count.checked_mul(std::mem::size_of::<u64>() as u64)?;
        let vectors = self
            .count
            .checked_mul(self.dimension as u64)?
            .checked_mul(std::mem::size_of::<f32>() as u64)?;
        (HEADER_SIZE as u64).checked_add(ids)?.checked_add(vectors)
    }
}
