//! SIMD distance kernels
//!
//! Dot product and squared L2 distance with explicit intrinsics for aarch64
//! (NEON) and x86_64 (AVX2+FMA, runtime-detected), plus a scalar fallback
//! that LLVM auto-vectorizes. These two kernels are the hot path of every
//! search in the engine; the metric layer builds all three metrics on top of
//! them.

// ---------------------------------------------------------------------------
// aarch64 NEON
// ---------------------------------------------------------------------------

/// NEON dot product, 4 lanes per iteration.
#[cfg(target_arch = "aarch64")]
#[inline(always)]
unsafe fn dot_neon(a: &[f32], b: &[f32]) -> f32 {
    use std::arch::aarch64::*;

    let n = a.len();
    let chunks = n / 4;

    let mut acc = vdupq_n_f32(0.0);
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    for i in 0..chunks {
        let va = vld1q_f32(a_ptr.add(i * 4));
        let vb = vld1q_f32(b_ptr.add(i * 4));
        acc = vfmaq_f32(acc, va, vb);
    }

    let mut sum = vaddvq_f32(acc);
    for i in chunks * 4..n {
        sum += a[i] * b[i];
    }
    sum
}

/// NEON squared L2 distance, 4 lanes per iteration.
#[cfg(target_arch = "aarch64")]
#[inline(always)]
unsafe fn l2_sq_neon(a: &[f32], b: &[f32]) -> f32 {
    use std::arch::aarch64::*;

    let n = a.len();
    let chunks = n / 4;

    let mut acc = vdupq_n_f32(0.0);
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    for i in 0..chunks {
        let va = vld1q_f32(a_ptr.add(i * 4));
        let vb = vld1q_f32(b_ptr.add(i * 4));
        let diff = vsubq_f32(va, vb);
        acc = vfmaq_f32(acc, diff, diff);
    }

    let mut sum = vaddvq_f32(acc);
    for i in chunks * 4..n {
        let d = a[i] - b[i];
        sum += d * d;
    }
    sum
}

// ---------------------------------------------------------------------------
// x86_64 AVX2+FMA
// ---------------------------------------------------------------------------

/// Horizontal sum of a 256-bit accumulator down to one f32.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
#[inline]
unsafe fn hsum_avx2(acc: std::arch::x86_64::__m256) -> f32 {
    use std::arch::x86_64::*;

    let hi = _mm256_extractf128_ps(acc, 1);
    let lo = _mm256_castps256_ps128(acc);
    let sum128 = _mm_add_ps(lo, hi);
    let shuf = _mm_movehdup_ps(sum128);
    let sums = _mm_add_ps(sum128, shuf);
    let shuf2 = _mm_movehl_ps(sums, sums);
    _mm_cvtss_f32(_mm_add_ss(sums, shuf2))
}

/// AVX2+FMA dot product, 8 lanes per iteration (unaligned loads).
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
#[inline]
unsafe fn dot_avx2(a: &[f32], b: &[f32]) -> f32 {
    use std::arch::x86_64::*;

    let n = a.len();
    let chunks = n / 8;

    let mut acc = _mm256_setzero_ps();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    for i in 0..chunks {
        let va = _mm256_loadu_ps(a_ptr.add(i * 8));
        let vb = _mm256_loadu_ps(b_ptr.add(i * 8));
        acc = _mm256_fmadd_ps(va, vb, acc);
    }

    let mut sum = hsum_avx2(acc);
    for i in chunks * 8..n {
        sum += a[i] * b[i];
    }
    sum
}

/// AVX2+FMA squared L2 distance, 8 lanes per iteration (unaligned loads).
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
#[inline]
unsafe fn l2_sq_avx2(a: &[f32], b: &[f32]) -> f32 {
    use std::arch::x86_64::*;

    let n = a.len();
    let chunks = n / 8;

    let mut acc = _mm256_setzero_ps();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    for i in 0..chunks {
        let va = _mm256_loadu_ps(a_ptr.add(i * 8));
        let vb = _mm256_loadu_ps(b_ptr.add(i * 8));
        let diff = _mm256_sub_ps(va, vb);
        acc = _mm256_fmadd_ps(diff, diff, acc);
    }

    let mut sum = hsum_avx2(acc);
    for i in chunks * 8..n {
        let d = a[i] - b[i];
        sum += d * d;
    }
    sum
}

// ---------------------------------------------------------------------------
// Scalar fallback
// ---------------------------------------------------------------------------

#[inline(always)]
fn dot_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline(always)]
fn l2_sq_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

// ---------------------------------------------------------------------------
// Public dispatch
// ---------------------------------------------------------------------------

/// Dot product of two equal-length vectors.
#[inline(always)]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vector length mismatch");

    #[cfg(target_arch = "aarch64")]
    {
        return unsafe { dot_neon(a, b) };
    }

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            return unsafe { dot_avx2(a, b) };
        }
    }

    #[allow(unreachable_code)]
    dot_scalar(a, b)
}

/// Squared L2 (Euclidean) distance between two equal-length vectors.
///
/// No square root: the squared form is monotonic with true distance, which is
/// all ranking needs.
#[inline(always)]
pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vector length mismatch");

    #[cfg(target_arch = "aarch64")]
    {
        return unsafe { l2_sq_neon(a, b) };
    }

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            return unsafe { l2_sq_avx2(a, b) };
        }
    }

    #[allow(unreachable_code)]
    l2_sq_scalar(a, b)
}

/// Euclidean norm of a vector.
#[inline]
pub fn norm(v: &[f32]) -> f32 {
    dot_product(v, v).sqrt()
}

/// L2-normalize a vector, returning a new vector. Zero vectors pass through
/// unchanged.
pub fn l2_normalized(v: &[f32]) -> Vec<f32> {
    let n = norm(v);
    if n > f32::EPSILON {
        v.iter().map(|x| x / n).collect()
    } else {
        v.to_vec()
    }
}
