//! AVX2 kernels for reduced-precision inputs (`Haswell` tier).
//!
//! - f16 is widened with F16C (`vcvtph2ps`) and accumulated in f32.
//! - bf16 is widened by shifting the raw bits into the upper half of an f32
//!   and accumulated in f32.
//! - i8 is sign-extended to i16 and reduced with `vpmaddwd` into i32 lanes.
//!   Lanes are flushed into an i64 total every [`I8_BLOCK`] elements so the
//!   integer result is exact for any length.

// SAFETY: Numeric casts in this file are intentional and safe:
// - i32 lane totals are bounded by the block size (see I8_BLOCK)
// - i64 -> f64 is the documented result conversion
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::similar_names)]

use std::arch::x86_64::*;

use half::{bf16, f16};

use super::scalar;
use super::x86_avx2::hsum256_ps;

/// Elements reduced in i32 lanes before flushing to i64.
///
/// Worst case per lane is 2·255² per 16 elements for squared L2, so 65 536
/// elements stay below 2^29.
const I8_BLOCK: usize = 1 << 16;

// =============================================================================
// Loads
// =============================================================================

#[target_feature(enable = "avx2", enable = "f16c")]
#[inline]
unsafe fn load_f16x8(ptr: *const f16) -> __m256 {
    _mm256_cvtph_ps(_mm_loadu_si128(ptr.cast::<__m128i>()))
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn load_bf16x8(ptr: *const bf16) -> __m256 {
    let raw = _mm256_cvtepu16_epi32(_mm_loadu_si128(ptr.cast::<__m128i>()));
    _mm256_castsi256_ps(_mm256_slli_epi32(raw, 16))
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn load_i8x16(ptr: *const i8) -> __m256i {
    _mm256_cvtepi8_epi16(_mm_loadu_si128(ptr.cast::<__m128i>()))
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn hsum256_epi32(v: __m256i) -> i64 {
    let mut lanes = [0_i32; 8];
    _mm256_storeu_si256(lanes.as_mut_ptr().cast::<__m256i>(), v);
    lanes.iter().map(|&lane| i64::from(lane)).sum()
}

// =============================================================================
// f16 / bf16
// =============================================================================

macro_rules! half_kernels {
    ($ty:ty, $load:ident, [$($feature:literal),*], $inner:ident, $sqeuclidean:ident, $cosine:ident) => {
        /// Dot product over 8-lane widened halves, 2 accumulators.
        ///
        /// # Safety
        ///
        /// CPU must support the `Haswell` tier and `a.len() == b.len()`.
        #[target_feature($(enable = $feature),*)]
        pub(crate) unsafe fn $inner(a: &[$ty], b: &[$ty]) -> f64 {
            let len = a.len();
            let a_ptr = a.as_ptr();
            let b_ptr = b.as_ptr();

            let mut sum0 = _mm256_setzero_ps();
            let mut sum1 = _mm256_setzero_ps();

            let mut offset = 0;
            while offset + 16 <= len {
                sum0 = _mm256_fmadd_ps($load(a_ptr.add(offset)), $load(b_ptr.add(offset)), sum0);
                sum1 = _mm256_fmadd_ps(
                    $load(a_ptr.add(offset + 8)),
                    $load(b_ptr.add(offset + 8)),
                    sum1,
                );
                offset += 16;
            }

            let mut acc = _mm256_add_ps(sum0, sum1);
            if offset + 8 <= len {
                acc = _mm256_fmadd_ps($load(a_ptr.add(offset)), $load(b_ptr.add(offset)), acc);
                offset += 8;
            }

            let mut result = hsum256_ps(acc);
            for i in offset..len {
                result += a[i].to_f32() * b[i].to_f32();
            }
            f64::from(result)
        }

        /// Squared L2 distance over 8-lane widened halves.
        ///
        /// # Safety
        ///
        /// CPU must support the `Haswell` tier and `a.len() == b.len()`.
        #[target_feature($(enable = $feature),*)]
        pub(crate) unsafe fn $sqeuclidean(a: &[$ty], b: &[$ty]) -> f64 {
            let len = a.len();
            let a_ptr = a.as_ptr();
            let b_ptr = b.as_ptr();

            let mut sum0 = _mm256_setzero_ps();
            let mut sum1 = _mm256_setzero_ps();

            let mut offset = 0;
            while offset + 16 <= len {
                let d0 = _mm256_sub_ps($load(a_ptr.add(offset)), $load(b_ptr.add(offset)));
                sum0 = _mm256_fmadd_ps(d0, d0, sum0);
                let d1 = _mm256_sub_ps($load(a_ptr.add(offset + 8)), $load(b_ptr.add(offset + 8)));
                sum1 = _mm256_fmadd_ps(d1, d1, sum1);
                offset += 16;
            }

            let mut acc = _mm256_add_ps(sum0, sum1);
            if offset + 8 <= len {
                let d = _mm256_sub_ps($load(a_ptr.add(offset)), $load(b_ptr.add(offset)));
                acc = _mm256_fmadd_ps(d, d, acc);
                offset += 8;
            }

            let mut result = hsum256_ps(acc);
            for i in offset..len {
                let d = a[i].to_f32() - b[i].to_f32();
                result += d * d;
            }
            f64::from(result)
        }

        /// Fused cosine distance over 8-lane widened halves.
        ///
        /// # Safety
        ///
        /// CPU must support the `Haswell` tier and `a.len() == b.len()`.
        #[target_feature($(enable = $feature),*)]
        pub(crate) unsafe fn $cosine(a: &[$ty], b: &[$ty]) -> f64 {
            let len = a.len();
            let a_ptr = a.as_ptr();
            let b_ptr = b.as_ptr();

            let mut dot = _mm256_setzero_ps();
            let mut na = _mm256_setzero_ps();
            let mut nb = _mm256_setzero_ps();

            let mut offset = 0;
            while offset + 8 <= len {
                let va = $load(a_ptr.add(offset));
                let vb = $load(b_ptr.add(offset));
                dot = _mm256_fmadd_ps(va, vb, dot);
                na = _mm256_fmadd_ps(va, va, na);
                nb = _mm256_fmadd_ps(vb, vb, nb);
                offset += 8;
            }

            let (tail_dot, tail_na, tail_nb) = scalar::cosine_sums(&a[offset..], &b[offset..]);
            scalar::cosine_finish(
                a,
                b,
                f64::from(hsum256_ps(dot) + tail_dot),
                f64::from(hsum256_ps(na) + tail_na),
                f64::from(hsum256_ps(nb) + tail_nb),
            )
        }
    };
}

half_kernels!(f16, load_f16x8, ["avx2", "fma", "f16c"], inner_f16, sqeuclidean_f16, cosine_f16);
half_kernels!(bf16, load_bf16x8, ["avx2", "fma"], inner_bf16, sqeuclidean_bf16, cosine_bf16);

// =============================================================================
// i8
// =============================================================================

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn inner_i8_block(a: &[i8], b: &[i8]) -> i64 {
    let len = a.len();
    let mut acc = _mm256_setzero_si256();
    let mut offset = 0;
    while offset + 16 <= len {
        let va = load_i8x16(a.as_ptr().add(offset));
        let vb = load_i8x16(b.as_ptr().add(offset));
        acc = _mm256_add_epi32(acc, _mm256_madd_epi16(va, vb));
        offset += 16;
    }
    let mut total = hsum256_epi32(acc);
    for i in offset..len {
        total += i64::from(a[i]) * i64::from(b[i]);
    }
    total
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn sqeuclidean_i8_block(a: &[i8], b: &[i8]) -> i64 {
    let len = a.len();
    let mut acc = _mm256_setzero_si256();
    let mut offset = 0;
    while offset + 16 <= len {
        let d = _mm256_sub_epi16(
            load_i8x16(a.as_ptr().add(offset)),
            load_i8x16(b.as_ptr().add(offset)),
        );
        acc = _mm256_add_epi32(acc, _mm256_madd_epi16(d, d));
        offset += 16;
    }
    let mut total = hsum256_epi32(acc);
    for i in offset..len {
        let d = i64::from(a[i]) - i64::from(b[i]);
        total += d * d;
    }
    total
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn cosine_i8_block(a: &[i8], b: &[i8]) -> (i64, i64, i64) {
    let len = a.len();
    let mut dot = _mm256_setzero_si256();
    let mut na = _mm256_setzero_si256();
    let mut nb = _mm256_setzero_si256();
    let mut offset = 0;
    while offset + 16 <= len {
        let va = load_i8x16(a.as_ptr().add(offset));
        let vb = load_i8x16(b.as_ptr().add(offset));
        dot = _mm256_add_epi32(dot, _mm256_madd_epi16(va, vb));
        na = _mm256_add_epi32(na, _mm256_madd_epi16(va, va));
        nb = _mm256_add_epi32(nb, _mm256_madd_epi16(vb, vb));
        offset += 16;
    }
    let (tail_dot, tail_na, tail_nb) = scalar::cosine_sums(&a[offset..], &b[offset..]);
    (
        hsum256_epi32(dot) + tail_dot,
        hsum256_epi32(na) + tail_na,
        hsum256_epi32(nb) + tail_nb,
    )
}

/// i8 dot product, exact.
///
/// # Safety
///
/// CPU must support the `Haswell` tier and `a.len() == b.len()`.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn inner_i8(a: &[i8], b: &[i8]) -> f64 {
    let mut total = 0_i64;
    for (ca, cb) in a.chunks(I8_BLOCK).zip(b.chunks(I8_BLOCK)) {
        total += inner_i8_block(ca, cb);
    }
    total as f64
}

/// i8 squared L2 distance, exact.
///
/// # Safety
///
/// CPU must support the `Haswell` tier and `a.len() == b.len()`.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn sqeuclidean_i8(a: &[i8], b: &[i8]) -> f64 {
    let mut total = 0_i64;
    for (ca, cb) in a.chunks(I8_BLOCK).zip(b.chunks(I8_BLOCK)) {
        total += sqeuclidean_i8_block(ca, cb);
    }
    total as f64
}

/// i8 cosine distance from exact integer sums.
///
/// # Safety
///
/// CPU must support the `Haswell` tier and `a.len() == b.len()`.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn cosine_i8(a: &[i8], b: &[i8]) -> f64 {
    let (mut dot, mut norm_a_sq, mut norm_b_sq) = (0_i64, 0_i64, 0_i64);
    for (ca, cb) in a.chunks(I8_BLOCK).zip(b.chunks(I8_BLOCK)) {
        let (d, na, nb) = cosine_i8_block(ca, cb);
        dot += d;
        norm_a_sq += na;
        norm_b_sq += nb;
    }
    scalar::cosine_from_sums(dot as f64, norm_a_sq as f64, norm_b_sq as f64)
}
