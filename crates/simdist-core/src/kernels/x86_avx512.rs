//! AVX-512F kernel implementations (`Skylake` tier).
//!
//! f32 and f64 kernels handle the remainder with a masked load instead of a
//! scalar tail. f16 inputs are widened with `vcvtph2ps` (part of AVX-512F) and
//! finish with a scalar tail, since masked 16-bit loads need AVX-512BW.

// SAFETY: Numeric casts in this file are intentional and safe:
// - Mask construction shifts by a remainder strictly below the lane count
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::incompatible_msrv)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::similar_names)]

use std::arch::x86_64::*;

use half::f16;

use super::scalar;

#[inline]
fn tail_mask16(remainder: usize) -> __mmask16 {
    ((1_u32 << remainder) - 1) as u16
}

#[inline]
fn tail_mask8(remainder: usize) -> __mmask8 {
    ((1_u32 << remainder) - 1) as u8
}

// =============================================================================
// f32
// =============================================================================

/// AVX-512 f32 dot product with 4 accumulators and a masked tail.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX-512F (enforced by registry tier and runtime detection)
/// - `a.len() == b.len()` (enforced by the dispatcher)
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn inner_f32(a: &[f32], b: &[f32]) -> f64 {
    // SAFETY: every full load is guarded by `offset + 16 <= len`; the masked
    // load only touches the `remainder` lanes that are in bounds.
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut acc0 = _mm512_setzero_ps();
    let mut acc1 = _mm512_setzero_ps();
    let mut acc2 = _mm512_setzero_ps();
    let mut acc3 = _mm512_setzero_ps();

    let mut offset = 0;
    while offset + 64 <= len {
        acc0 = _mm512_fmadd_ps(
            _mm512_loadu_ps(a_ptr.add(offset)),
            _mm512_loadu_ps(b_ptr.add(offset)),
            acc0,
        );
        acc1 = _mm512_fmadd_ps(
            _mm512_loadu_ps(a_ptr.add(offset + 16)),
            _mm512_loadu_ps(b_ptr.add(offset + 16)),
            acc1,
        );
        acc2 = _mm512_fmadd_ps(
            _mm512_loadu_ps(a_ptr.add(offset + 32)),
            _mm512_loadu_ps(b_ptr.add(offset + 32)),
            acc2,
        );
        acc3 = _mm512_fmadd_ps(
            _mm512_loadu_ps(a_ptr.add(offset + 48)),
            _mm512_loadu_ps(b_ptr.add(offset + 48)),
            acc3,
        );
        offset += 64;
    }

    let mut acc = _mm512_add_ps(_mm512_add_ps(acc0, acc1), _mm512_add_ps(acc2, acc3));

    while offset + 16 <= len {
        acc = _mm512_fmadd_ps(
            _mm512_loadu_ps(a_ptr.add(offset)),
            _mm512_loadu_ps(b_ptr.add(offset)),
            acc,
        );
        offset += 16;
    }

    let remainder = len - offset;
    if remainder > 0 {
        let mask = tail_mask16(remainder);
        let va = _mm512_maskz_loadu_ps(mask, a_ptr.add(offset));
        let vb = _mm512_maskz_loadu_ps(mask, b_ptr.add(offset));
        acc = _mm512_fmadd_ps(va, vb, acc);
    }

    f64::from(_mm512_reduce_add_ps(acc))
}

/// AVX-512 f32 squared L2 distance with 2 accumulators and a masked tail.
///
/// # Safety
///
/// Same contract as [`inner_f32`].
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn sqeuclidean_f32(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut acc0 = _mm512_setzero_ps();
    let mut acc1 = _mm512_setzero_ps();

    let mut offset = 0;
    while offset + 32 <= len {
        let d0 = _mm512_sub_ps(
            _mm512_loadu_ps(a_ptr.add(offset)),
            _mm512_loadu_ps(b_ptr.add(offset)),
        );
        acc0 = _mm512_fmadd_ps(d0, d0, acc0);
        let d1 = _mm512_sub_ps(
            _mm512_loadu_ps(a_ptr.add(offset + 16)),
            _mm512_loadu_ps(b_ptr.add(offset + 16)),
        );
        acc1 = _mm512_fmadd_ps(d1, d1, acc1);
        offset += 32;
    }

    let mut acc = _mm512_add_ps(acc0, acc1);

    if offset + 16 <= len {
        let d = _mm512_sub_ps(
            _mm512_loadu_ps(a_ptr.add(offset)),
            _mm512_loadu_ps(b_ptr.add(offset)),
        );
        acc = _mm512_fmadd_ps(d, d, acc);
        offset += 16;
    }

    let remainder = len - offset;
    if remainder > 0 {
        let mask = tail_mask16(remainder);
        let d = _mm512_sub_ps(
            _mm512_maskz_loadu_ps(mask, a_ptr.add(offset)),
            _mm512_maskz_loadu_ps(mask, b_ptr.add(offset)),
        );
        acc = _mm512_fmadd_ps(d, d, acc);
    }

    f64::from(_mm512_reduce_add_ps(acc))
}

/// AVX-512 fused cosine distance for f32.
///
/// # Safety
///
/// Same contract as [`inner_f32`].
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn cosine_f32(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut dot = _mm512_setzero_ps();
    let mut na = _mm512_setzero_ps();
    let mut nb = _mm512_setzero_ps();

    let mut offset = 0;
    while offset + 16 <= len {
        let va = _mm512_loadu_ps(a_ptr.add(offset));
        let vb = _mm512_loadu_ps(b_ptr.add(offset));
        dot = _mm512_fmadd_ps(va, vb, dot);
        na = _mm512_fmadd_ps(va, va, na);
        nb = _mm512_fmadd_ps(vb, vb, nb);
        offset += 16;
    }

    let remainder = len - offset;
    if remainder > 0 {
        let mask = tail_mask16(remainder);
        let va = _mm512_maskz_loadu_ps(mask, a_ptr.add(offset));
        let vb = _mm512_maskz_loadu_ps(mask, b_ptr.add(offset));
        dot = _mm512_fmadd_ps(va, vb, dot);
        na = _mm512_fmadd_ps(va, va, na);
        nb = _mm512_fmadd_ps(vb, vb, nb);
    }

    scalar::cosine_finish(
        a,
        b,
        f64::from(_mm512_reduce_add_ps(dot)),
        f64::from(_mm512_reduce_add_ps(na)),
        f64::from(_mm512_reduce_add_ps(nb)),
    )
}

// =============================================================================
// f64
// =============================================================================

/// AVX-512 f64 dot product with 2 accumulators and a masked tail.
///
/// # Safety
///
/// Same contract as [`inner_f32`].
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn inner_f64(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut acc0 = _mm512_setzero_pd();
    let mut acc1 = _mm512_setzero_pd();

    let mut offset = 0;
    while offset + 16 <= len {
        acc0 = _mm512_fmadd_pd(
            _mm512_loadu_pd(a_ptr.add(offset)),
            _mm512_loadu_pd(b_ptr.add(offset)),
            acc0,
        );
        acc1 = _mm512_fmadd_pd(
            _mm512_loadu_pd(a_ptr.add(offset + 8)),
            _mm512_loadu_pd(b_ptr.add(offset + 8)),
            acc1,
        );
        offset += 16;
    }

    let mut acc = _mm512_add_pd(acc0, acc1);

    if offset + 8 <= len {
        acc = _mm512_fmadd_pd(
            _mm512_loadu_pd(a_ptr.add(offset)),
            _mm512_loadu_pd(b_ptr.add(offset)),
            acc,
        );
        offset += 8;
    }

    let remainder = len - offset;
    if remainder > 0 {
        let mask = tail_mask8(remainder);
        let va = _mm512_maskz_loadu_pd(mask, a_ptr.add(offset));
        let vb = _mm512_maskz_loadu_pd(mask, b_ptr.add(offset));
        acc = _mm512_fmadd_pd(va, vb, acc);
    }

    _mm512_reduce_add_pd(acc)
}

/// AVX-512 f64 squared L2 distance.
///
/// # Safety
///
/// Same contract as [`inner_f32`].
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn sqeuclidean_f64(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut acc = _mm512_setzero_pd();
    let mut offset = 0;
    while offset + 8 <= len {
        let d = _mm512_sub_pd(
            _mm512_loadu_pd(a_ptr.add(offset)),
            _mm512_loadu_pd(b_ptr.add(offset)),
        );
        acc = _mm512_fmadd_pd(d, d, acc);
        offset += 8;
    }

    let remainder = len - offset;
    if remainder > 0 {
        let mask = tail_mask8(remainder);
        let d = _mm512_sub_pd(
            _mm512_maskz_loadu_pd(mask, a_ptr.add(offset)),
            _mm512_maskz_loadu_pd(mask, b_ptr.add(offset)),
        );
        acc = _mm512_fmadd_pd(d, d, acc);
    }

    _mm512_reduce_add_pd(acc)
}

/// AVX-512 f64 fused cosine distance.
///
/// # Safety
///
/// Same contract as [`inner_f32`].
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn cosine_f64(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut dot = _mm512_setzero_pd();
    let mut na = _mm512_setzero_pd();
    let mut nb = _mm512_setzero_pd();

    let mut offset = 0;
    while offset + 8 <= len {
        let va = _mm512_loadu_pd(a_ptr.add(offset));
        let vb = _mm512_loadu_pd(b_ptr.add(offset));
        dot = _mm512_fmadd_pd(va, vb, dot);
        na = _mm512_fmadd_pd(va, va, na);
        nb = _mm512_fmadd_pd(vb, vb, nb);
        offset += 8;
    }

    let remainder = len - offset;
    if remainder > 0 {
        let mask = tail_mask8(remainder);
        let va = _mm512_maskz_loadu_pd(mask, a_ptr.add(offset));
        let vb = _mm512_maskz_loadu_pd(mask, b_ptr.add(offset));
        dot = _mm512_fmadd_pd(va, vb, dot);
        na = _mm512_fmadd_pd(va, va, na);
        nb = _mm512_fmadd_pd(vb, vb, nb);
    }

    scalar::cosine_finish(
        a,
        b,
        _mm512_reduce_add_pd(dot),
        _mm512_reduce_add_pd(na),
        _mm512_reduce_add_pd(nb),
    )
}

// =============================================================================
// f16
// =============================================================================

#[target_feature(enable = "avx512f")]
#[inline]
unsafe fn load_f16x16(ptr: *const f16) -> __m512 {
    _mm512_cvtph_ps(_mm256_loadu_si256(ptr.cast::<__m256i>()))
}

/// AVX-512 f16 dot product, widened to f32.
///
/// # Safety
///
/// Same contract as [`inner_f32`].
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn inner_f16(a: &[f16], b: &[f16]) -> f64 {
    let len = a.len();
    let mut acc = _mm512_setzero_ps();
    let mut offset = 0;
    while offset + 16 <= len {
        acc = _mm512_fmadd_ps(
            load_f16x16(a.as_ptr().add(offset)),
            load_f16x16(b.as_ptr().add(offset)),
            acc,
        );
        offset += 16;
    }
    let mut result = _mm512_reduce_add_ps(acc);
    for i in offset..len {
        result += a[i].to_f32() * b[i].to_f32();
    }
    f64::from(result)
}

/// AVX-512 f16 squared L2 distance, widened to f32.
///
/// # Safety
///
/// Same contract as [`inner_f32`].
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn sqeuclidean_f16(a: &[f16], b: &[f16]) -> f64 {
    let len = a.len();
    let mut acc = _mm512_setzero_ps();
    let mut offset = 0;
    while offset + 16 <= len {
        let d = _mm512_sub_ps(
            load_f16x16(a.as_ptr().add(offset)),
            load_f16x16(b.as_ptr().add(offset)),
        );
        acc = _mm512_fmadd_ps(d, d, acc);
        offset += 16;
    }
    let mut result = _mm512_reduce_add_ps(acc);
    for i in offset..len {
        let d = a[i].to_f32() - b[i].to_f32();
        result += d * d;
    }
    f64::from(result)
}

/// AVX-512 f16 fused cosine distance.
///
/// # Safety
///
/// Same contract as [`inner_f32`].
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn cosine_f16(a: &[f16], b: &[f16]) -> f64 {
    let len = a.len();
    let mut dot = _mm512_setzero_ps();
    let mut na = _mm512_setzero_ps();
    let mut nb = _mm512_setzero_ps();
    let mut offset = 0;
    while offset + 16 <= len {
        let va = load_f16x16(a.as_ptr().add(offset));
        let vb = load_f16x16(b.as_ptr().add(offset));
        dot = _mm512_fmadd_ps(va, vb, dot);
        na = _mm512_fmadd_ps(va, va, na);
        nb = _mm512_fmadd_ps(vb, vb, nb);
        offset += 16;
    }
    let (tail_dot, tail_na, tail_nb) = scalar::cosine_sums(&a[offset..], &b[offset..]);
    scalar::cosine_finish(
        a,
        b,
        f64::from(_mm512_reduce_add_ps(dot) + tail_dot),
        f64::from(_mm512_reduce_add_ps(na) + tail_na),
        f64::from(_mm512_reduce_add_ps(nb) + tail_nb),
    )
}
