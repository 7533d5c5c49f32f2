//! AVX2+FMA kernels for f32 and f64 vectors (`Haswell` tier).
//!
//! Contains dot product, squared L2 and fused cosine kernels. Large vectors
//! run a 4-accumulator main loop for ILP, followed by a single-register loop
//! and a scalar tail.
//!
//! All functions require the `Haswell` tier; the registry only hands them out
//! after the capability probe confirmed AVX2+FMA.

// SAFETY: Numeric casts in this file are intentional and safe:
// - All casts are from well-bounded values (vector dimensions, loop indices)
// - All casts are validated by the kernel equivalence tests
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::similar_names)]

use std::arch::x86_64::*;

use super::scalar;
use super::tail_unroll::{dot_tail_unrolled_8, sqdiff_tail_unrolled_8};

// =============================================================================
// Horizontal reductions
// =============================================================================

/// Horizontal sum of an 8-lane f32 register.
#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn hsum256_ps(v: __m256) -> f32 {
    let low = _mm256_castps256_ps128(v);
    let high = _mm256_extractf128_ps(v, 1);
    let sum128 = _mm_add_ps(low, high);
    let shuf = _mm_movehdup_ps(sum128);
    let sums = _mm_add_ps(sum128, shuf);
    let shuf2 = _mm_movehl_ps(sums, sums);
    _mm_cvtss_f32(_mm_add_ss(sums, shuf2))
}

/// Horizontal sum of a 4-lane f64 register.
#[target_feature(enable = "avx2")]
#[inline]
pub(crate) unsafe fn hsum256_pd(v: __m256d) -> f64 {
    let low = _mm256_castpd256_pd128(v);
    let high = _mm256_extractf128_pd(v, 1);
    let sum128 = _mm_add_pd(low, high);
    let upper = _mm_unpackhi_pd(sum128, sum128);
    _mm_cvtsd_f64(_mm_add_sd(sum128, upper))
}

// =============================================================================
// f32
// =============================================================================

/// AVX2 f32 dot product with 4 accumulators.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX2+FMA (enforced by registry tier and runtime detection)
/// - `a.len() == b.len()` (enforced by the dispatcher)
#[target_feature(enable = "avx2", enable = "fma")]
pub(crate) unsafe fn inner_f32(a: &[f32], b: &[f32]) -> f64 {
    // SAFETY: loads are unaligned-safe; every load at `offset` is guarded by
    // `offset + width <= len` on both equal-length slices.
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut sum0 = _mm256_setzero_ps();
    let mut sum1 = _mm256_setzero_ps();
    let mut sum2 = _mm256_setzero_ps();
    let mut sum3 = _mm256_setzero_ps();

    let mut offset = 0;
    while offset + 32 <= len {
        let va0 = _mm256_loadu_ps(a_ptr.add(offset));
        let vb0 = _mm256_loadu_ps(b_ptr.add(offset));
        sum0 = _mm256_fmadd_ps(va0, vb0, sum0);

        let va1 = _mm256_loadu_ps(a_ptr.add(offset + 8));
        let vb1 = _mm256_loadu_ps(b_ptr.add(offset + 8));
        sum1 = _mm256_fmadd_ps(va1, vb1, sum1);

        let va2 = _mm256_loadu_ps(a_ptr.add(offset + 16));
        let vb2 = _mm256_loadu_ps(b_ptr.add(offset + 16));
        sum2 = _mm256_fmadd_ps(va2, vb2, sum2);

        let va3 = _mm256_loadu_ps(a_ptr.add(offset + 24));
        let vb3 = _mm256_loadu_ps(b_ptr.add(offset + 24));
        sum3 = _mm256_fmadd_ps(va3, vb3, sum3);

        offset += 32;
    }

    // Combine 4 accumulators into 1
    let sum01 = _mm256_add_ps(sum0, sum1);
    let sum23 = _mm256_add_ps(sum2, sum3);
    let mut acc = _mm256_add_ps(sum01, sum23);

    while offset + 8 <= len {
        let va = _mm256_loadu_ps(a_ptr.add(offset));
        let vb = _mm256_loadu_ps(b_ptr.add(offset));
        acc = _mm256_fmadd_ps(va, vb, acc);
        offset += 8;
    }

    let mut result = hsum256_ps(acc);
    let remainder = len - offset;
    dot_tail_unrolled_8!(a, b, offset, remainder, result);
    f64::from(result)
}

/// AVX2 f32 squared L2 distance with 4 accumulators.
///
/// # Safety
///
/// Same contract as [`inner_f32`].
#[target_feature(enable = "avx2", enable = "fma")]
pub(crate) unsafe fn sqeuclidean_f32(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut sum0 = _mm256_setzero_ps();
    let mut sum1 = _mm256_setzero_ps();
    let mut sum2 = _mm256_setzero_ps();
    let mut sum3 = _mm256_setzero_ps();

    let mut offset = 0;
    while offset + 32 <= len {
        let d0 = _mm256_sub_ps(
            _mm256_loadu_ps(a_ptr.add(offset)),
            _mm256_loadu_ps(b_ptr.add(offset)),
        );
        sum0 = _mm256_fmadd_ps(d0, d0, sum0);

        let d1 = _mm256_sub_ps(
            _mm256_loadu_ps(a_ptr.add(offset + 8)),
            _mm256_loadu_ps(b_ptr.add(offset + 8)),
        );
        sum1 = _mm256_fmadd_ps(d1, d1, sum1);

        let d2 = _mm256_sub_ps(
            _mm256_loadu_ps(a_ptr.add(offset + 16)),
            _mm256_loadu_ps(b_ptr.add(offset + 16)),
        );
        sum2 = _mm256_fmadd_ps(d2, d2, sum2);

        let d3 = _mm256_sub_ps(
            _mm256_loadu_ps(a_ptr.add(offset + 24)),
            _mm256_loadu_ps(b_ptr.add(offset + 24)),
        );
        sum3 = _mm256_fmadd_ps(d3, d3, sum3);

        offset += 32;
    }

    let sum01 = _mm256_add_ps(sum0, sum1);
    let sum23 = _mm256_add_ps(sum2, sum3);
    let mut acc = _mm256_add_ps(sum01, sum23);

    while offset + 8 <= len {
        let d = _mm256_sub_ps(
            _mm256_loadu_ps(a_ptr.add(offset)),
            _mm256_loadu_ps(b_ptr.add(offset)),
        );
        acc = _mm256_fmadd_ps(d, d, acc);
        offset += 8;
    }

    let mut result = hsum256_ps(acc);
    let remainder = len - offset;
    sqdiff_tail_unrolled_8!(a, b, offset, remainder, result);
    f64::from(result)
}

/// AVX2 fused cosine distance: dot product and both norms in one pass,
/// 2 accumulators per sum.
///
/// # Safety
///
/// Same contract as [`inner_f32`].
#[target_feature(enable = "avx2", enable = "fma")]
pub(crate) unsafe fn cosine_f32(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut dot0 = _mm256_setzero_ps();
    let mut dot1 = _mm256_setzero_ps();
    let mut na0 = _mm256_setzero_ps();
    let mut na1 = _mm256_setzero_ps();
    let mut nb0 = _mm256_setzero_ps();
    let mut nb1 = _mm256_setzero_ps();

    let mut offset = 0;
    while offset + 16 <= len {
        let va0 = _mm256_loadu_ps(a_ptr.add(offset));
        let vb0 = _mm256_loadu_ps(b_ptr.add(offset));
        dot0 = _mm256_fmadd_ps(va0, vb0, dot0);
        na0 = _mm256_fmadd_ps(va0, va0, na0);
        nb0 = _mm256_fmadd_ps(vb0, vb0, nb0);

        let va1 = _mm256_loadu_ps(a_ptr.add(offset + 8));
        let vb1 = _mm256_loadu_ps(b_ptr.add(offset + 8));
        dot1 = _mm256_fmadd_ps(va1, vb1, dot1);
        na1 = _mm256_fmadd_ps(va1, va1, na1);
        nb1 = _mm256_fmadd_ps(vb1, vb1, nb1);

        offset += 16;
    }

    let mut dot_acc = _mm256_add_ps(dot0, dot1);
    let mut na_acc = _mm256_add_ps(na0, na1);
    let mut nb_acc = _mm256_add_ps(nb0, nb1);

    if offset + 8 <= len {
        let va = _mm256_loadu_ps(a_ptr.add(offset));
        let vb = _mm256_loadu_ps(b_ptr.add(offset));
        dot_acc = _mm256_fmadd_ps(va, vb, dot_acc);
        na_acc = _mm256_fmadd_ps(va, va, na_acc);
        nb_acc = _mm256_fmadd_ps(vb, vb, nb_acc);
        offset += 8;
    }

    let (tail_dot, tail_na, tail_nb) = scalar::cosine_sums(&a[offset..], &b[offset..]);
    let dot = hsum256_ps(dot_acc) + tail_dot;
    let norm_a_sq = hsum256_ps(na_acc) + tail_na;
    let norm_b_sq = hsum256_ps(nb_acc) + tail_nb;

    scalar::cosine_finish(
        a,
        b,
        f64::from(dot),
        f64::from(norm_a_sq),
        f64::from(norm_b_sq),
    )
}

// =============================================================================
// f64
// =============================================================================

/// AVX2 f64 dot product with 4 accumulators.
///
/// # Safety
///
/// Same contract as [`inner_f32`].
#[target_feature(enable = "avx2", enable = "fma")]
pub(crate) unsafe fn inner_f64(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut sum0 = _mm256_setzero_pd();
    let mut sum1 = _mm256_setzero_pd();
    let mut sum2 = _mm256_setzero_pd();
    let mut sum3 = _mm256_setzero_pd();

    let mut offset = 0;
    while offset + 16 <= len {
        sum0 = _mm256_fmadd_pd(
            _mm256_loadu_pd(a_ptr.add(offset)),
            _mm256_loadu_pd(b_ptr.add(offset)),
            sum0,
        );
        sum1 = _mm256_fmadd_pd(
            _mm256_loadu_pd(a_ptr.add(offset + 4)),
            _mm256_loadu_pd(b_ptr.add(offset + 4)),
            sum1,
        );
        sum2 = _mm256_fmadd_pd(
            _mm256_loadu_pd(a_ptr.add(offset + 8)),
            _mm256_loadu_pd(b_ptr.add(offset + 8)),
            sum2,
        );
        sum3 = _mm256_fmadd_pd(
            _mm256_loadu_pd(a_ptr.add(offset + 12)),
            _mm256_loadu_pd(b_ptr.add(offset + 12)),
            sum3,
        );
        offset += 16;
    }

    let mut acc = _mm256_add_pd(_mm256_add_pd(sum0, sum1), _mm256_add_pd(sum2, sum3));

    while offset + 4 <= len {
        acc = _mm256_fmadd_pd(
            _mm256_loadu_pd(a_ptr.add(offset)),
            _mm256_loadu_pd(b_ptr.add(offset)),
            acc,
        );
        offset += 4;
    }

    let mut result = hsum256_pd(acc);
    for i in offset..len {
        result += a[i] * b[i];
    }
    result
}

/// AVX2 f64 squared L2 distance.
///
/// # Safety
///
/// Same contract as [`inner_f32`].
#[target_feature(enable = "avx2", enable = "fma")]
pub(crate) unsafe fn sqeuclidean_f64(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut sum0 = _mm256_setzero_pd();
    let mut sum1 = _mm256_setzero_pd();

    let mut offset = 0;
    while offset + 8 <= len {
        let d0 = _mm256_sub_pd(
            _mm256_loadu_pd(a_ptr.add(offset)),
            _mm256_loadu_pd(b_ptr.add(offset)),
        );
        sum0 = _mm256_fmadd_pd(d0, d0, sum0);

        let d1 = _mm256_sub_pd(
            _mm256_loadu_pd(a_ptr.add(offset + 4)),
            _mm256_loadu_pd(b_ptr.add(offset + 4)),
        );
        sum1 = _mm256_fmadd_pd(d1, d1, sum1);

        offset += 8;
    }

    let mut acc = _mm256_add_pd(sum0, sum1);

    if offset + 4 <= len {
        let d = _mm256_sub_pd(
            _mm256_loadu_pd(a_ptr.add(offset)),
            _mm256_loadu_pd(b_ptr.add(offset)),
        );
        acc = _mm256_fmadd_pd(d, d, acc);
        offset += 4;
    }

    let mut result = hsum256_pd(acc);
    for i in offset..len {
        let d = a[i] - b[i];
        result += d * d;
    }
    result
}

/// AVX2 f64 fused cosine distance.
///
/// # Safety
///
/// Same contract as [`inner_f32`].
#[target_feature(enable = "avx2", enable = "fma")]
pub(crate) unsafe fn cosine_f64(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut dot = _mm256_setzero_pd();
    let mut na = _mm256_setzero_pd();
    let mut nb = _mm256_setzero_pd();

    let mut offset = 0;
    while offset + 4 <= len {
        let va = _mm256_loadu_pd(a_ptr.add(offset));
        let vb = _mm256_loadu_pd(b_ptr.add(offset));
        dot = _mm256_fmadd_pd(va, vb, dot);
        na = _mm256_fmadd_pd(va, va, na);
        nb = _mm256_fmadd_pd(vb, vb, nb);
        offset += 4;
    }

    let (tail_dot, tail_na, tail_nb) = scalar::cosine_sums(&a[offset..], &b[offset..]);
    scalar::cosine_finish(
        a,
        b,
        hsum256_pd(dot) + tail_dot,
        hsum256_pd(na) + tail_na,
        hsum256_pd(nb) + tail_nb,
    )
}
