//! Scalar baseline kernels.
//!
//! These functions serve as:
//! - The `Serial` tier present for every supported (metric, dtype) pair
//! - The correctness oracle every vectorized kernel is tested against
//! - The shared finalizers (cosine, Jaccard, divergence clamping) that every
//!   tier uses so sentinels are identical across tiers
//!
//! Accumulation is strictly sequential in the element's accumulator type
//! (see [`Element::Acc`]).

// Widening i64/u64 totals to f64 is the documented result type.
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]

use std::ops::{Add, Mul, Sub};

use half::{bf16, f16};

/// Lower clamp applied to every probability mass before a logarithm.
pub const DIVERGENCE_EPSILON: f64 = 1e-10;

/// Cosine distance when both vectors have zero norm.
pub const COSINE_BOTH_ZERO: f64 = 0.0;

/// Cosine distance when exactly one vector has zero norm.
pub const COSINE_ONE_ZERO: f64 = 1.0;

/// Jaccard distance when the union of both bit sets is empty.
pub const JACCARD_EMPTY_UNION: f64 = 0.0;

/// An element type together with its documented accumulator.
pub trait Element: Copy {
    /// Accumulator used for inner products and squared distances.
    type Acc: Copy + Default + Add<Output = Self::Acc> + Sub<Output = Self::Acc> + Mul<Output = Self::Acc>;

    /// Widens one element into the accumulator type.
    fn widen(self) -> Self::Acc;

    /// Converts a finished accumulator into the result type.
    fn finish(acc: Self::Acc) -> f64;

    /// Widens one element to f64 (divergence accumulation).
    fn to_f64(self) -> f64;
}

impl Element for i8 {
    type Acc = i64;

    #[inline]
    fn widen(self) -> i64 {
        i64::from(self)
    }

    #[inline]
    fn finish(acc: i64) -> f64 {
        acc as f64
    }

    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Element for f16 {
    type Acc = f32;

    #[inline]
    fn widen(self) -> f32 {
        self.to_f32()
    }

    #[inline]
    fn finish(acc: f32) -> f64 {
        f64::from(acc)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self.to_f64()
    }
}

impl Element for bf16 {
    type Acc = f32;

    #[inline]
    fn widen(self) -> f32 {
        self.to_f32()
    }

    #[inline]
    fn finish(acc: f32) -> f64 {
        f64::from(acc)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self.to_f64()
    }
}

impl Element for f32 {
    type Acc = f32;

    #[inline]
    fn widen(self) -> f32 {
        self
    }

    #[inline]
    fn finish(acc: f32) -> f64 {
        f64::from(acc)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Element for f64 {
    type Acc = f64;

    #[inline]
    fn widen(self) -> f64 {
        self
    }

    #[inline]
    fn finish(acc: f64) -> f64 {
        acc
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}

// =============================================================================
// Shared finalizers
// =============================================================================

/// Combines the three running sums of a cosine pass into a distance.
///
/// Zero norms map to [`COSINE_BOTH_ZERO`] / [`COSINE_ONE_ZERO`]; everything
/// else is clamped to `[0, 2]` so rounding can never leave the metric range.
///
/// The sums must be finite. Kernels finish through [`cosine_finish`], which
/// guarantees that for any finite input vectors.
#[inline]
#[must_use]
pub fn cosine_from_sums(dot: f64, norm_a_sq: f64, norm_b_sq: f64) -> f64 {
    match (norm_a_sq == 0.0, norm_b_sq == 0.0) {
        (true, true) => COSINE_BOTH_ZERO,
        (true, false) | (false, true) => COSINE_ONE_ZERO,
        (false, false) => (1.0 - dot / norm_a_sq.sqrt() / norm_b_sq.sqrt()).clamp(0.0, 2.0),
    }
}

/// Finishes a cosine pass over `a` and `b` from its accumulated sums.
///
/// When a sum overflowed to a non-finite value, or a norm underflowed below
/// the smallest normal `f32`, the distance is recomputed by
/// [`cosine_rescaled`]. Finite inputs therefore never produce NaN, and tiny
/// non-zero vectors never hit the zero-norm sentinels. Vectors holding NaN or
/// infinite elements yield NaN.
#[inline]
#[must_use]
pub fn cosine_finish<T: Element>(
    a: &[T],
    b: &[T],
    dot: f64,
    norm_a_sq: f64,
    norm_b_sq: f64,
) -> f64 {
    // Sums below the smallest normal f32 have lost precision to underflow.
    let floor = f64::from(f32::MIN_POSITIVE);
    let finite = dot.is_finite() && norm_a_sq.is_finite() && norm_b_sq.is_finite();
    if finite && norm_a_sq >= floor && norm_b_sq >= floor {
        cosine_from_sums(dot, norm_a_sq, norm_b_sq)
    } else {
        cosine_rescaled(a, b)
    }
}

/// Cosine distance in f64 with each vector divided by its largest magnitude.
///
/// After scaling every element lies in `[-1, 1]`, so none of the three sums
/// can overflow and a non-zero vector keeps a norm of at least 1.
#[must_use]
pub fn cosine_rescaled<T: Element>(a: &[T], b: &[T]) -> f64 {
    let max_abs = |v: &[T]| v.iter().fold(0.0_f64, |m, &x| m.max(x.to_f64().abs()));
    let (scale_a, scale_b) = (max_abs(a), max_abs(b));
    match (scale_a == 0.0, scale_b == 0.0) {
        (true, true) => return COSINE_BOTH_ZERO,
        (true, false) | (false, true) => return COSINE_ONE_ZERO,
        (false, false) => {}
    }

    let (mut dot, mut norm_a_sq, mut norm_b_sq) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x.to_f64() / scale_a, y.to_f64() / scale_b);
        dot += x * y;
        norm_a_sq += x * x;
        norm_b_sq += y * y;
    }
    if !(dot.is_finite() && norm_a_sq.is_finite() && norm_b_sq.is_finite()) {
        return f64::NAN;
    }
    cosine_from_sums(dot, norm_a_sq, norm_b_sq)
}

/// Combines intersection and union popcounts into a Jaccard distance.
#[inline]
#[must_use]
pub fn jaccard_from_counts(intersection: u64, union: u64) -> f64 {
    if union == 0 {
        JACCARD_EMPTY_UNION
    } else {
        1.0 - intersection as f64 / union as f64
    }
}

/// Clamps a probability mass from below before it reaches a logarithm.
#[inline]
#[must_use]
pub fn clamp_mass(p: f64) -> f64 {
    p.max(DIVERGENCE_EPSILON)
}

// =============================================================================
// Generic serial kernels
// =============================================================================

/// Inner product Σ aᵢ·bᵢ.
#[inline]
pub fn inner<T: Element>(a: &[T], b: &[T]) -> f64 {
    let mut acc = T::Acc::default();
    for (&x, &y) in a.iter().zip(b) {
        acc = acc + x.widen() * y.widen();
    }
    T::finish(acc)
}

/// Squared Euclidean distance Σ (aᵢ − bᵢ)².
#[inline]
pub fn sqeuclidean<T: Element>(a: &[T], b: &[T]) -> f64 {
    let mut acc = T::Acc::default();
    for (&x, &y) in a.iter().zip(b) {
        let d = x.widen() - y.widen();
        acc = acc + d * d;
    }
    T::finish(acc)
}

/// Cosine distance from a single pass of three running sums.
#[inline]
pub fn cosine<T: Element>(a: &[T], b: &[T]) -> f64 {
    let (dot, norm_a_sq, norm_b_sq) = cosine_sums(a, b);
    cosine_finish(a, b, T::finish(dot), T::finish(norm_a_sq), T::finish(norm_b_sq))
}

/// Running sums `(a·b, |a|², |b|²)` in the element's accumulator.
///
/// Vectorized kernels call this for their tail so the remainder is reduced
/// exactly like the baseline.
#[inline]
pub fn cosine_sums<T: Element>(a: &[T], b: &[T]) -> (T::Acc, T::Acc, T::Acc) {
    let mut dot = T::Acc::default();
    let mut norm_a_sq = T::Acc::default();
    let mut norm_b_sq = T::Acc::default();
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x.widen(), y.widen());
        dot = dot + x * y;
        norm_a_sq = norm_a_sq + x * x;
        norm_b_sq = norm_b_sq + y * y;
    }
    (dot, norm_a_sq, norm_b_sq)
}

/// Kullback–Leibler divergence Σ pᵢ·ln(pᵢ/qᵢ), accumulated in f64.
#[inline]
pub fn kl_divergence<T: Element>(p: &[T], q: &[T]) -> f64 {
    let mut acc = 0.0_f64;
    for (&x, &y) in p.iter().zip(q) {
        let (x, y) = (clamp_mass(x.to_f64()), clamp_mass(y.to_f64()));
        acc += x * (x / y).ln();
    }
    acc
}

/// Jensen–Shannon divergence ½KL(p‖m) + ½KL(q‖m), `m = (p + q)/2`.
#[inline]
pub fn js_divergence<T: Element>(p: &[T], q: &[T]) -> f64 {
    let mut acc = 0.0_f64;
    for (&x, &y) in p.iter().zip(q) {
        let (x, y) = (clamp_mass(x.to_f64()), clamp_mass(y.to_f64()));
        let m = 0.5 * (x + y);
        acc += x * (x / m).ln() + y * (y / m).ln();
    }
    (0.5 * acc).max(0.0)
}

// =============================================================================
// Binary serial kernels
// =============================================================================

/// Population count of `a XOR b`, processed 8 bytes at a time.
#[inline]
pub fn hamming(a: &[u8], b: &[u8]) -> f64 {
    hamming_count(a, b) as f64
}

/// `1 − popcount(a AND b) / popcount(a OR b)`.
#[inline]
pub fn jaccard(a: &[u8], b: &[u8]) -> f64 {
    let (intersection, union) = jaccard_counts(a, b);
    jaccard_from_counts(intersection, union)
}

/// Raw differing-bit count.
#[inline]
pub fn hamming_count(a: &[u8], b: &[u8]) -> u64 {
    let mut count = 0_u64;
    let (a_words, a_tail) = a.split_at(a.len() / 8 * 8);
    let (b_words, b_tail) = b.split_at(a_words.len());
    for (x, y) in a_words.chunks_exact(8).zip(b_words.chunks_exact(8)) {
        count += u64::from((load_word(x) ^ load_word(y)).count_ones());
    }
    for (&x, &y) in a_tail.iter().zip(b_tail) {
        count += u64::from((x ^ y).count_ones());
    }
    count
}

/// Raw `(intersection, union)` bit counts.
#[inline]
pub fn jaccard_counts(a: &[u8], b: &[u8]) -> (u64, u64) {
    let mut intersection = 0_u64;
    let mut union = 0_u64;
    let (a_words, a_tail) = a.split_at(a.len() / 8 * 8);
    let (b_words, b_tail) = b.split_at(a_words.len());
    for (x, y) in a_words.chunks_exact(8).zip(b_words.chunks_exact(8)) {
        let (x, y) = (load_word(x), load_word(y));
        intersection += u64::from((x & y).count_ones());
        union += u64::from((x | y).count_ones());
    }
    for (&x, &y) in a_tail.iter().zip(b_tail) {
        intersection += u64::from((x & y).count_ones());
        union += u64::from((x | y).count_ones());
    }
    (intersection, union)
}

#[inline]
fn load_word(bytes: &[u8]) -> u64 {
    let mut word = [0_u8; 8];
    word.copy_from_slice(bytes);
    u64::from_le_bytes(word)
}

// =============================================================================
// Monomorphized entry points registered in the kernel table
// =============================================================================

macro_rules! serial_entry_points {
    ($($ty:ty => $inner:ident, $sqeuclidean:ident, $cosine:ident;)*) => {
        $(
            pub(crate) fn $inner(a: &[$ty], b: &[$ty]) -> f64 {
                inner(a, b)
            }

            pub(crate) fn $sqeuclidean(a: &[$ty], b: &[$ty]) -> f64 {
                sqeuclidean(a, b)
            }

            pub(crate) fn $cosine(a: &[$ty], b: &[$ty]) -> f64 {
                cosine(a, b)
            }
        )*
    };
}

serial_entry_points! {
    i8 => inner_i8, sqeuclidean_i8, cosine_i8;
    f16 => inner_f16, sqeuclidean_f16, cosine_f16;
    bf16 => inner_bf16, sqeuclidean_bf16, cosine_bf16;
    f32 => inner_f32, sqeuclidean_f32, cosine_f32;
    f64 => inner_f64, sqeuclidean_f64, cosine_f64;
}

macro_rules! divergence_entry_points {
    ($($ty:ty => $kl:ident, $js:ident;)*) => {
        $(
            pub(crate) fn $kl(p: &[$ty], q: &[$ty]) -> f64 {
                kl_divergence(p, q)
            }

            pub(crate) fn $js(p: &[$ty], q: &[$ty]) -> f64 {
                js_divergence(p, q)
            }
        )*
    };
}

divergence_entry_points! {
    f16 => kl_f16, js_f16;
    bf16 => kl_bf16, js_bf16;
    f32 => kl_f32, js_f32;
    f64 => kl_f64, js_f64;
}
