//! Tests for the scalar baseline: sentinels, divergences and binary counts.

use half::{bf16, f16};

use super::kernels::scalar::{
    self, clamp_mass, cosine, cosine_from_sums, cosine_rescaled, hamming, inner, jaccard,
    jaccard_from_counts, js_divergence, kl_divergence, sqeuclidean, COSINE_BOTH_ZERO,
    COSINE_ONE_ZERO, DIVERGENCE_EPSILON, JACCARD_EMPTY_UNION,
};

const EPSILON: f64 = 1e-9;

// ============================================================================
// Inner product / L2
// ============================================================================

#[test]
fn test_inner_and_l2_examples() {
    let a = [1.0_f32, 2.0, 3.0];
    let b = [4.0_f32, 5.0, 6.0];
    assert_eq!(inner(&a, &b), 32.0);
    assert_eq!(sqeuclidean(&a, &b), 27.0);
    assert_eq!(sqeuclidean(&b, &a), 27.0);
}

#[test]
fn test_i8_accumulates_without_overflow() {
    let a = vec![-128_i8; 100_000];
    let b = vec![-128_i8; 100_000];
    assert_eq!(inner(&a, &b), 16_384.0 * 100_000.0);

    let c = vec![127_i8; 100_000];
    assert_eq!(sqeuclidean(&a, &c), 65_025.0 * 100_000.0);
}

#[test]
fn test_half_types_widen_before_accumulating() {
    // The total exceeds the f16 maximum (65504).
    let a = vec![f16::from_f32(4.0); 4096];
    assert_eq!(inner(&a, &a), 65_536.0);

    let b = vec![bf16::from_f32(0.5); 1000];
    assert_eq!(inner(&b, &b), 250.0);
}

// ============================================================================
// Cosine sentinels
// ============================================================================

#[test]
fn test_cosine_both_zero_sentinel() {
    let zero = [0.0_f32; 8];
    assert_eq!(cosine(&zero, &zero), COSINE_BOTH_ZERO);
    assert_eq!(COSINE_BOTH_ZERO, 0.0);
}

#[test]
fn test_cosine_one_zero_sentinel() {
    let zero = [0.0_f64; 5];
    let x = [1.0_f64, -2.0, 0.5, 0.0, 3.0];
    assert_eq!(cosine(&zero, &x), COSINE_ONE_ZERO);
    assert_eq!(cosine(&x, &zero), COSINE_ONE_ZERO);
    assert_eq!(COSINE_ONE_ZERO, 1.0);
}

#[test]
fn test_cosine_never_nan_and_clamped() {
    let a = [1.0_f32, 0.0];
    let b = [-1.0_f32, 0.0];
    assert!((cosine(&a, &b) - 2.0).abs() < EPSILON);
    assert!(cosine(&a, &a).abs() < EPSILON);

    assert_eq!(cosine_from_sums(1.0 + 1e-12, 1.0, 1.0), 0.0);
    assert_eq!(cosine_from_sums(-1.0 - 1e-12, 1.0, 1.0), 2.0);
}

#[test]
fn test_cosine_large_finite_inputs_are_not_nan() {
    // Squares overflow the accumulator; the rescaled pass takes over.
    let big = [1e20_f32, 1e20];
    assert!(cosine(&big, &big).abs() < EPSILON);
    assert!((cosine(&big, &[1e20_f32, -1e20]) - 1.0).abs() < EPSILON);
    assert!((cosine(&[f32::MAX; 4], &[-f32::MAX; 4]) - 2.0).abs() < EPSILON);

    let huge = [1e200_f64, 1e200];
    assert!(cosine(&huge, &huge).abs() < EPSILON);
    assert!((cosine(&huge, &[-1e200_f64, -1e200]) - 2.0).abs() < EPSILON);

    let wide: Vec<bf16> = [3e19_f32, -2e19, 5e19].iter().map(|&x| bf16::from_f32(x)).collect();
    assert!(cosine(&wide, &wide).abs() < 1e-6);
}

#[test]
fn test_cosine_tiny_inputs_are_not_zero_vectors() {
    // |a|² underflows to zero in f32, yet neither vector is zero.
    let a = [1e-30_f32, 0.0];
    let b = [0.0_f32, 1e-30];
    assert!((cosine(&a, &b) - 1.0).abs() < EPSILON);
    assert!(cosine(&a, &a).abs() < EPSILON);
    assert!((cosine(&a, &[-1e-30_f32, 0.0]) - 2.0).abs() < EPSILON);
}

#[test]
fn test_cosine_rescaled_sentinels_and_non_finite() {
    assert_eq!(cosine_rescaled(&[0.0_f64; 3], &[0.0_f64; 3]), COSINE_BOTH_ZERO);
    assert_eq!(cosine_rescaled(&[0.0_f64; 3], &[1.0_f64, 0.0, 0.0]), COSINE_ONE_ZERO);
    assert_eq!(cosine_rescaled::<f32>(&[], &[]), COSINE_BOTH_ZERO);
    assert!(cosine(&[f32::NAN, 1.0], &[1.0_f32, 1.0]).is_nan());
    assert!(cosine(&[f64::INFINITY, 1.0], &[1.0_f64, 1.0]).is_nan());
}

#[test]
fn test_cosine_orthogonal() {
    let a = [1_i8, 0, 0];
    let b = [0_i8, 5, 0];
    assert!((cosine(&a, &b) - 1.0).abs() < EPSILON);
}

// ============================================================================
// Binary
// ============================================================================

#[test]
fn test_hamming_examples() {
    assert_eq!(hamming(&[0b1010], &[0b0110]), 2.0);
    assert_eq!(hamming(&[0xFF; 13], &[0x00; 13]), 104.0);
    assert_eq!(hamming(&[0xAB; 9], &[0xAB; 9]), 0.0);
}

#[test]
fn test_jaccard_example() {
    let d = jaccard(&[0b1100], &[0b1010]);
    assert!((d - (1.0 - 1.0 / 3.0)).abs() < EPSILON);
}

#[test]
fn test_jaccard_empty_union_sentinel() {
    assert_eq!(jaccard(&[0; 17], &[0; 17]), JACCARD_EMPTY_UNION);
    assert_eq!(jaccard(&[], &[]), JACCARD_EMPTY_UNION);
    assert_eq!(jaccard_from_counts(0, 0), 0.0);
}

#[test]
fn test_binary_word_and_tail_paths_agree() {
    let a: Vec<u8> = (0..=40u8).map(|i| i.wrapping_mul(37)).collect();
    let b: Vec<u8> = (0..=40u8).map(|i| i.wrapping_mul(91) ^ 0x5A).collect();
    let expected: u64 = a
        .iter()
        .zip(&b)
        .map(|(x, y)| u64::from((x ^ y).count_ones()))
        .sum();
    assert_eq!(scalar::hamming_count(&a, &b), expected);

    let (inter, union) = scalar::jaccard_counts(&a, &b);
    let expected_inter: u64 = a.iter().zip(&b).map(|(x, y)| u64::from((x & y).count_ones())).sum();
    let expected_union: u64 = a.iter().zip(&b).map(|(x, y)| u64::from((x | y).count_ones())).sum();
    assert_eq!((inter, union), (expected_inter, expected_union));
}

// ============================================================================
// Divergences
// ============================================================================

#[test]
fn test_kl_of_identical_distributions_is_zero() {
    let p = [0.1_f64, 0.2, 0.3, 0.4];
    assert!(kl_divergence(&p, &p).abs() < EPSILON);
    assert!(js_divergence(&p, &p).abs() < EPSILON);
}

#[test]
fn test_kl_known_value() {
    let p = [0.5_f64, 0.5];
    let q = [0.25_f64, 0.75];
    let expected = 0.5 * (0.5_f64 / 0.25).ln() + 0.5 * (0.5_f64 / 0.75).ln();
    assert!((kl_divergence(&p, &q) - expected).abs() < EPSILON);
}

#[test]
fn test_kl_zero_mass_is_finite() {
    let p = [1.0_f32, 0.0];
    let q = [0.0_f32, 1.0];
    let kl = kl_divergence(&p, &q);
    assert!(kl.is_finite());
    let expected = (1.0 / DIVERGENCE_EPSILON).ln() + DIVERGENCE_EPSILON * DIVERGENCE_EPSILON.ln();
    assert!((kl - expected).abs() < 1e-6);
}

#[test]
fn test_js_is_symmetric_and_bounded() {
    let p = [1.0_f64, 0.0, 0.0];
    let q = [0.0_f64, 0.0, 1.0];
    let pq = js_divergence(&p, &q);
    let qp = js_divergence(&q, &p);
    assert!((pq - qp).abs() < EPSILON);
    assert!(pq > 0.0);
    assert!(pq <= std::f64::consts::LN_2 + 1e-6);
}

#[test]
fn test_divergence_accumulates_in_f64_for_half_inputs() {
    let p: Vec<f16> = [0.25_f32, 0.75].iter().map(|&x| f16::from_f32(x)).collect();
    let q: Vec<f16> = [0.5_f32, 0.5].iter().map(|&x| f16::from_f32(x)).collect();
    let expected = 0.25 * (0.5_f64).ln() + 0.75 * (1.5_f64).ln();
    assert!((kl_divergence(&p, &q) - expected).abs() < EPSILON);
}

#[test]
fn test_clamp_mass() {
    assert_eq!(clamp_mass(0.0), DIVERGENCE_EPSILON);
    assert_eq!(clamp_mass(-3.0), DIVERGENCE_EPSILON);
    assert_eq!(clamp_mass(0.5), 0.5);
}
