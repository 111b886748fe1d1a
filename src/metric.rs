//! Distance metrics
//!
//! A metric scores two equal-length vectors; a **smaller score means more
//! similar**. Every store and index in the crate ranks by this single
//! convention, so the three metric variants are defined to sort the same
//! way:
//!
//! - `L2` — squared Euclidean distance (monotonic with true distance, no
//!   square root).
//! - `Cosine` — `1 − cos(a, b)`; a zero-norm operand is defined to have
//!   similarity 0, so its score is 1.
//! - `Dot` — negated dot product, so larger raw dot products sort first.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::simd::{dot_product, l2_distance_squared, norm};

/// The distance metric of a store, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum DistanceMetric {
    L2 = 0,
    Cosine = 1,
    Dot = 2,
}

impl DistanceMetric {
    /// Score two vectors; smaller is more similar.
    ///
    /// Both slices must have the callers' store dimension; the stores
    /// validate lengths before calling in.
    #[inline]
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => l2_distance_squared(a, b),
            DistanceMetric::Cosine => {
                let denom = norm(a) * norm(b);
                if denom > f32::EPSILON {
                    1.0 - dot_product(a, b) / denom
                } else {
                    1.0
                }
            }
            DistanceMetric::Dot => -dot_product(a, b),
        }
    }

    /// Wire discriminant used by the persisted file headers.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for DistanceMetric {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Error> {
        match value {
            0 => Ok(DistanceMetric::L2),
            1 => Ok(DistanceMetric::Cosine),
            2 => Ok(DistanceMetric::Dot),
            other => Err(Error::invalid_argument(format!(
                "unknown distance metric selector {other}"
            ))),
        }
    }
}
