//! AVX2 Hamming and Jaccard kernels for bit-packed vectors (`Haswell` tier).
//!
//! Popcounts use the nibble lookup (`vpshufb`) and fold bytes into four u64
//! lanes with `vpsadbw`, 32 bytes per iteration. Tails go through the scalar
//! word counters.

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::wildcard_imports)]

use std::arch::x86_64::*;

use super::scalar;

/// Per-byte popcount of a 256-bit register.
#[target_feature(enable = "avx2")]
#[inline]
unsafe fn popcount_bytes(v: __m256i) -> __m256i {
    let lookup = _mm256_setr_epi8(
        0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4, //
        0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4,
    );
    let low_mask = _mm256_set1_epi8(0x0f);
    let lo = _mm256_and_si256(v, low_mask);
    let hi = _mm256_and_si256(_mm256_srli_epi16(v, 4), low_mask);
    _mm256_add_epi8(_mm256_shuffle_epi8(lookup, lo), _mm256_shuffle_epi8(lookup, hi))
}

/// Adds the byte popcounts of `v` into four u64 lanes.
#[target_feature(enable = "avx2")]
#[inline]
unsafe fn accumulate_popcount(acc: __m256i, v: __m256i) -> __m256i {
    _mm256_add_epi64(acc, _mm256_sad_epu8(popcount_bytes(v), _mm256_setzero_si256()))
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn hsum256_epi64(v: __m256i) -> u64 {
    let mut lanes = [0_u64; 4];
    _mm256_storeu_si256(lanes.as_mut_ptr().cast::<__m256i>(), v);
    lanes.iter().sum()
}

/// Differing-bit count over 32-byte blocks.
///
/// # Safety
///
/// CPU must support the `Haswell` tier and `a.len() == b.len()`.
#[target_feature(enable = "avx2", enable = "popcnt")]
pub(crate) unsafe fn hamming(a: &[u8], b: &[u8]) -> f64 {
    let len = a.len();
    let mut acc = _mm256_setzero_si256();
    let mut offset = 0;
    while offset + 32 <= len {
        let va = _mm256_loadu_si256(a.as_ptr().add(offset).cast::<__m256i>());
        let vb = _mm256_loadu_si256(b.as_ptr().add(offset).cast::<__m256i>());
        acc = accumulate_popcount(acc, _mm256_xor_si256(va, vb));
        offset += 32;
    }
    let count = hsum256_epi64(acc) + scalar::hamming_count(&a[offset..], &b[offset..]);
    count as f64
}

/// Jaccard distance from intersection and union popcounts over 32-byte
/// blocks.
///
/// # Safety
///
/// CPU must support the `Haswell` tier and `a.len() == b.len()`.
#[target_feature(enable = "avx2", enable = "popcnt")]
pub(crate) unsafe fn jaccard(a: &[u8], b: &[u8]) -> f64 {
    let len = a.len();
    let mut inter = _mm256_setzero_si256();
    let mut union = _mm256_setzero_si256();
    let mut offset = 0;
    while offset + 32 <= len {
        let va = _mm256_loadu_si256(a.as_ptr().add(offset).cast::<__m256i>());
        let vb = _mm256_loadu_si256(b.as_ptr().add(offset).cast::<__m256i>());
        inter = accumulate_popcount(inter, _mm256_and_si256(va, vb));
        union = accumulate_popcount(union, _mm256_or_si256(va, vb));
        offset += 32;
    }
    let (tail_inter, tail_union) = scalar::jaccard_counts(&a[offset..], &b[offset..]);
    scalar::jaccard_from_counts(
        hsum256_epi64(inter) + tail_inter,
        hsum256_epi64(union) + tail_union,
    )
}
