//! ARM NEON kernel implementations for aarch64 (`Neon` tier).
//!
//! Covers f32 and f64 dot/L2/cosine, bf16 widened by bit shift, exact i8 via
//! widening multiplies, and binary Hamming/Jaccard via `vcnt`.
//!
//! NEON is part of the aarch64 baseline, so these are safe functions wrapping
//! the intrinsics in `unsafe` blocks.

// SAFETY: Numeric casts in this file are intentional and safe:
// - i32 lane totals are bounded by the i8 block size
// - i64/u64 -> f64 is the documented result conversion
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::similar_names)]

use std::arch::aarch64::*;

use half::bf16;

use super::scalar;

/// Elements reduced in i32 lanes before flushing to i64.
const I8_BLOCK: usize = 1 << 16;

// =============================================================================
// f32
// =============================================================================

/// ARM NEON f32 dot product with 4 accumulators.
#[inline]
pub(crate) fn inner_f32(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();
    let mut offset = 0;

    // SAFETY: every load at `offset` is guarded by `offset + width <= len`;
    // vld1q_f32 handles unaligned loads on ARM64.
    let mut result = unsafe {
        let mut acc0 = vdupq_n_f32(0.0);
        let mut acc1 = vdupq_n_f32(0.0);
        let mut acc2 = vdupq_n_f32(0.0);
        let mut acc3 = vdupq_n_f32(0.0);

        while offset + 16 <= len {
            acc0 = vfmaq_f32(acc0, vld1q_f32(a_ptr.add(offset)), vld1q_f32(b_ptr.add(offset)));
            acc1 = vfmaq_f32(acc1, vld1q_f32(a_ptr.add(offset + 4)), vld1q_f32(b_ptr.add(offset + 4)));
            acc2 = vfmaq_f32(acc2, vld1q_f32(a_ptr.add(offset + 8)), vld1q_f32(b_ptr.add(offset + 8)));
            acc3 = vfmaq_f32(acc3, vld1q_f32(a_ptr.add(offset + 12)), vld1q_f32(b_ptr.add(offset + 12)));
            offset += 16;
        }

        let mut acc = vaddq_f32(vaddq_f32(acc0, acc1), vaddq_f32(acc2, acc3));
        while offset + 4 <= len {
            acc = vfmaq_f32(acc, vld1q_f32(a_ptr.add(offset)), vld1q_f32(b_ptr.add(offset)));
            offset += 4;
        }
        vaddvq_f32(acc)
    };

    for i in offset..len {
        result += a[i] * b[i];
    }
    f64::from(result)
}

/// ARM NEON f32 squared L2 distance with 4 accumulators.
#[inline]
pub(crate) fn sqeuclidean_f32(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();
    let mut offset = 0;

    // SAFETY: Loop conditions keep every 4-lane load in bounds.
    let mut result = unsafe {
        let mut acc0 = vdupq_n_f32(0.0);
        let mut acc1 = vdupq_n_f32(0.0);
        let mut acc2 = vdupq_n_f32(0.0);
        let mut acc3 = vdupq_n_f32(0.0);

        while offset + 16 <= len {
            let d0 = vsubq_f32(vld1q_f32(a_ptr.add(offset)), vld1q_f32(b_ptr.add(offset)));
            acc0 = vfmaq_f32(acc0, d0, d0);
            let d1 = vsubq_f32(vld1q_f32(a_ptr.add(offset + 4)), vld1q_f32(b_ptr.add(offset + 4)));
            acc1 = vfmaq_f32(acc1, d1, d1);
            let d2 = vsubq_f32(vld1q_f32(a_ptr.add(offset + 8)), vld1q_f32(b_ptr.add(offset + 8)));
            acc2 = vfmaq_f32(acc2, d2, d2);
            let d3 = vsubq_f32(vld1q_f32(a_ptr.add(offset + 12)), vld1q_f32(b_ptr.add(offset + 12)));
            acc3 = vfmaq_f32(acc3, d3, d3);
            offset += 16;
        }

        let mut acc = vaddq_f32(vaddq_f32(acc0, acc1), vaddq_f32(acc2, acc3));
        while offset + 4 <= len {
            let d = vsubq_f32(vld1q_f32(a_ptr.add(offset)), vld1q_f32(b_ptr.add(offset)));
            acc = vfmaq_f32(acc, d, d);
            offset += 4;
        }
        vaddvq_f32(acc)
    };

    for i in offset..len {
        let d = a[i] - b[i];
        result += d * d;
    }
    f64::from(result)
}

/// ARM NEON fused f32 cosine distance.
#[inline]
pub(crate) fn cosine_f32(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();
    let mut offset = 0;

    // SAFETY: Loop condition keeps every 4-lane load in bounds.
    let (dot, na, nb) = unsafe {
        let mut dot = vdupq_n_f32(0.0);
        let mut na = vdupq_n_f32(0.0);
        let mut nb = vdupq_n_f32(0.0);
        while offset + 4 <= len {
            let va = vld1q_f32(a_ptr.add(offset));
            let vb = vld1q_f32(b_ptr.add(offset));
            dot = vfmaq_f32(dot, va, vb);
            na = vfmaq_f32(na, va, va);
            nb = vfmaq_f32(nb, vb, vb);
            offset += 4;
        }
        (vaddvq_f32(dot), vaddvq_f32(na), vaddvq_f32(nb))
    };

    let (tail_dot, tail_na, tail_nb) = scalar::cosine_sums(&a[offset..], &b[offset..]);
    scalar::cosine_finish(
        a,
        b,
        f64::from(dot + tail_dot),
        f64::from(na + tail_na),
        f64::from(nb + tail_nb),
    )
}

// =============================================================================
// f64
// =============================================================================

/// ARM NEON f64 dot product with 2 accumulators.
#[inline]
pub(crate) fn inner_f64(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();
    let mut offset = 0;

    // SAFETY: Loop conditions keep every 2-lane load in bounds.
    let mut result = unsafe {
        let mut acc0 = vdupq_n_f64(0.0);
        let mut acc1 = vdupq_n_f64(0.0);
        while offset + 4 <= len {
            acc0 = vfmaq_f64(acc0, vld1q_f64(a_ptr.add(offset)), vld1q_f64(b_ptr.add(offset)));
            acc1 = vfmaq_f64(acc1, vld1q_f64(a_ptr.add(offset + 2)), vld1q_f64(b_ptr.add(offset + 2)));
            offset += 4;
        }
        let mut acc = vaddq_f64(acc0, acc1);
        if offset + 2 <= len {
            acc = vfmaq_f64(acc, vld1q_f64(a_ptr.add(offset)), vld1q_f64(b_ptr.add(offset)));
            offset += 2;
        }
        vaddvq_f64(acc)
    };

    for i in offset..len {
        result += a[i] * b[i];
    }
    result
}

/// ARM NEON f64 squared L2 distance.
#[inline]
pub(crate) fn sqeuclidean_f64(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();
    let mut offset = 0;

    // SAFETY: Loop condition keeps every 2-lane load in bounds.
    let mut result = unsafe {
        let mut acc = vdupq_n_f64(0.0);
        while offset + 2 <= len {
            let d = vsubq_f64(vld1q_f64(a_ptr.add(offset)), vld1q_f64(b_ptr.add(offset)));
            acc = vfmaq_f64(acc, d, d);
            offset += 2;
        }
        vaddvq_f64(acc)
    };

    for i in offset..len {
        let d = a[i] - b[i];
        result += d * d;
    }
    result
}

/// ARM NEON fused f64 cosine distance.
#[inline]
pub(crate) fn cosine_f64(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();
    let mut offset = 0;

    // SAFETY: Loop condition keeps every 2-lane load in bounds.
    let (dot, na, nb) = unsafe {
        let mut dot = vdupq_n_f64(0.0);
        let mut na = vdupq_n_f64(0.0);
        let mut nb = vdupq_n_f64(0.0);
        while offset + 2 <= len {
            let va = vld1q_f64(a_ptr.add(offset));
            let vb = vld1q_f64(b_ptr.add(offset));
            dot = vfmaq_f64(dot, va, vb);
            na = vfmaq_f64(na, va, va);
            nb = vfmaq_f64(nb, vb, vb);
            offset += 2;
        }
        (vaddvq_f64(dot), vaddvq_f64(na), vaddvq_f64(nb))
    };

    let (tail_dot, tail_na, tail_nb) = scalar::cosine_sums(&a[offset..], &b[offset..]);
    scalar::cosine_finish(a, b, dot + tail_dot, na + tail_na, nb + tail_nb)
}

// =============================================================================
// bf16
// =============================================================================

/// Widens 8 bf16 values into two f32x4 registers.
///
/// # Safety
///
/// `ptr` must be valid for 8 reads.
#[inline]
unsafe fn load_bf16x8(ptr: *const bf16) -> (float32x4_t, float32x4_t) {
    let raw = vld1q_u16(ptr.cast::<u16>());
    let lo = vshlq_n_u32::<16>(vmovl_u16(vget_low_u16(raw)));
    let hi = vshlq_n_u32::<16>(vmovl_high_u16(raw));
    (vreinterpretq_f32_u32(lo), vreinterpretq_f32_u32(hi))
}

/// ARM NEON bf16 dot product, widened to f32.
#[inline]
pub(crate) fn inner_bf16(a: &[bf16], b: &[bf16]) -> f64 {
    let len = a.len();
    let mut offset = 0;

    // SAFETY: Loop condition keeps every 8-lane load in bounds.
    let mut result = unsafe {
        let mut acc0 = vdupq_n_f32(0.0);
        let mut acc1 = vdupq_n_f32(0.0);
        while offset + 8 <= len {
            let (a_lo, a_hi) = load_bf16x8(a.as_ptr().add(offset));
            let (b_lo, b_hi) = load_bf16x8(b.as_ptr().add(offset));
            acc0 = vfmaq_f32(acc0, a_lo, b_lo);
            acc1 = vfmaq_f32(acc1, a_hi, b_hi);
            offset += 8;
        }
        vaddvq_f32(vaddq_f32(acc0, acc1))
    };

    for i in offset..len {
        result += a[i].to_f32() * b[i].to_f32();
    }
    f64::from(result)
}

/// ARM NEON bf16 squared L2 distance, widened to f32.
#[inline]
pub(crate) fn sqeuclidean_bf16(a: &[bf16], b: &[bf16]) -> f64 {
    let len = a.len();
    let mut offset = 0;

    // SAFETY: Loop condition keeps every 8-lane load in bounds.
    let mut result = unsafe {
        let mut acc0 = vdupq_n_f32(0.0);
        let mut acc1 = vdupq_n_f32(0.0);
        while offset + 8 <= len {
            let (a_lo, a_hi) = load_bf16x8(a.as_ptr().add(offset));
            let (b_lo, b_hi) = load_bf16x8(b.as_ptr().add(offset));
            let d0 = vsubq_f32(a_lo, b_lo);
            let d1 = vsubq_f32(a_hi, b_hi);
            acc0 = vfmaq_f32(acc0, d0, d0);
            acc1 = vfmaq_f32(acc1, d1, d1);
            offset += 8;
        }
        vaddvq_f32(vaddq_f32(acc0, acc1))
    };

    for i in offset..len {
        let d = a[i].to_f32() - b[i].to_f32();
        result += d * d;
    }
    f64::from(result)
}

/// ARM NEON fused bf16 cosine distance.
#[inline]
pub(crate) fn cosine_bf16(a: &[bf16], b: &[bf16]) -> f64 {
    let len = a.len();
    let mut offset = 0;

    // SAFETY: Loop condition keeps every 8-lane load in bounds.
    let (dot, na, nb) = unsafe {
        let mut dot = vdupq_n_f32(0.0);
        let mut na = vdupq_n_f32(0.0);
        let mut nb = vdupq_n_f32(0.0);
        while offset + 8 <= len {
            let (a_lo, a_hi) = load_bf16x8(a.as_ptr().add(offset));
            let (b_lo, b_hi) = load_bf16x8(b.as_ptr().add(offset));
            dot = vfmaq_f32(vfmaq_f32(dot, a_lo, b_lo), a_hi, b_hi);
            na = vfmaq_f32(vfmaq_f32(na, a_lo, a_lo), a_hi, a_hi);
            nb = vfmaq_f32(vfmaq_f32(nb, b_lo, b_lo), b_hi, b_hi);
            offset += 8;
        }
        (vaddvq_f32(dot), vaddvq_f32(na), vaddvq_f32(nb))
    };

    let (tail_dot, tail_na, tail_nb) = scalar::cosine_sums(&a[offset..], &b[offset..]);
    scalar::cosine_finish(
        a,
        b,
        f64::from(dot + tail_dot),
        f64::from(na + tail_na),
        f64::from(nb + tail_nb),
    )
}

// =============================================================================
// i8
// =============================================================================

/// Σ aᵢ·bᵢ over one block, products widened to i16 and pairwise-added into
/// i32 lanes.
#[inline]
fn inner_i8_block(a: &[i8], b: &[i8]) -> i64 {
    let len = a.len();
    let mut offset = 0;
    // SAFETY: Loop condition keeps every 16-lane load in bounds.
    let mut total = unsafe {
        let mut acc = vdupq_n_s32(0);
        while offset + 16 <= len {
            let va = vld1q_s8(a.as_ptr().add(offset));
            let vb = vld1q_s8(b.as_ptr().add(offset));
            acc = vpadalq_s16(acc, vmull_s8(vget_low_s8(va), vget_low_s8(vb)));
            acc = vpadalq_s16(acc, vmull_high_s8(va, vb));
            offset += 16;
        }
        vaddlvq_s32(acc)
    };
    for i in offset..len {
        total += i64::from(a[i]) * i64::from(b[i]);
    }
    total
}

/// Σ (aᵢ − bᵢ)² over one block, differences widened to i16.
#[inline]
fn sqeuclidean_i8_block(a: &[i8], b: &[i8]) -> i64 {
    let len = a.len();
    let mut offset = 0;
    // SAFETY: Loop condition keeps every 16-lane load in bounds.
    let mut total = unsafe {
        let mut acc = vdupq_n_s32(0);
        while offset + 16 <= len {
            let va = vld1q_s8(a.as_ptr().add(offset));
            let vb = vld1q_s8(b.as_ptr().add(offset));
            let d_lo = vsubl_s8(vget_low_s8(va), vget_low_s8(vb));
            let d_hi = vsubl_high_s8(va, vb);
            acc = vmlal_s16(acc, vget_low_s16(d_lo), vget_low_s16(d_lo));
            acc = vmlal_high_s16(acc, d_lo, d_lo);
            acc = vmlal_s16(acc, vget_low_s16(d_hi), vget_low_s16(d_hi));
            acc = vmlal_high_s16(acc, d_hi, d_hi);
            offset += 16;
        }
        vaddlvq_s32(acc)
    };
    for i in offset..len {
        let d = i64::from(a[i]) - i64::from(b[i]);
        total += d * d;
    }
    total
}

/// ARM NEON i8 dot product, exact.
#[inline]
pub(crate) fn inner_i8(a: &[i8], b: &[i8]) -> f64 {
    let total: i64 = a
        .chunks(I8_BLOCK)
        .zip(b.chunks(I8_BLOCK))
        .map(|(ca, cb)| inner_i8_block(ca, cb))
        .sum();
    total as f64
}

/// ARM NEON i8 squared L2 distance, exact.
#[inline]
pub(crate) fn sqeuclidean_i8(a: &[i8], b: &[i8]) -> f64 {
    let total: i64 = a
        .chunks(I8_BLOCK)
        .zip(b.chunks(I8_BLOCK))
        .map(|(ca, cb)| sqeuclidean_i8_block(ca, cb))
        .sum();
    total as f64
}

/// ARM NEON i8 cosine distance from exact integer sums.
#[inline]
pub(crate) fn cosine_i8(a: &[i8], b: &[i8]) -> f64 {
    let (mut dot, mut norm_a_sq, mut norm_b_sq) = (0_i64, 0_i64, 0_i64);
    for (ca, cb) in a.chunks(I8_BLOCK).zip(b.chunks(I8_BLOCK)) {
        dot += inner_i8_block(ca, cb);
        norm_a_sq += inner_i8_block(ca, ca);
        norm_b_sq += inner_i8_block(cb, cb);
    }
    scalar::cosine_from_sums(dot as f64, norm_a_sq as f64, norm_b_sq as f64)
}

// =============================================================================
// Binary
// =============================================================================

/// ARM NEON Hamming distance over 16-byte blocks.
#[inline]
pub(crate) fn hamming(a: &[u8], b: &[u8]) -> f64 {
    let len = a.len();
    let mut offset = 0;
    let mut count = 0_u64;
    while offset + 16 <= len {
        // SAFETY: offset + 16 <= len on both equal-length slices.
        count += u64::from(unsafe {
            let x = veorq_u8(vld1q_u8(a.as_ptr().add(offset)), vld1q_u8(b.as_ptr().add(offset)));
            vaddlvq_u8(vcntq_u8(x))
        });
        offset += 16;
    }
    count += scalar::hamming_count(&a[offset..], &b[offset..]);
    count as f64
}

/// ARM NEON Jaccard distance over 16-byte blocks.
#[inline]
pub(crate) fn jaccard(a: &[u8], b: &[u8]) -> f64 {
    let len = a.len();
    let mut offset = 0;
    let mut intersection = 0_u64;
    let mut union = 0_u64;
    while offset + 16 <= len {
        // SAFETY: offset + 16 <= len on both equal-length slices.
        let (inter, uni) = unsafe {
            let va = vld1q_u8(a.as_ptr().add(offset));
            let vb = vld1q_u8(b.as_ptr().add(offset));
            (
                vaddlvq_u8(vcntq_u8(vandq_u8(va, vb))),
                vaddlvq_u8(vcntq_u8(vorrq_u8(va, vb))),
            )
        };
        intersection += u64::from(inter);
        union += u64::from(uni);
        offset += 16;
    }
    let (tail_inter, tail_union) = scalar::jaccard_counts(&a[offset..], &b[offset..]);
    scalar::jaccard_from_counts(intersection + tail_inter, union + tail_union)
}
