//! Property-based equivalence tests for the dispatched kernels.
//!
//! Dispatched results are compared against f64/i64 references over randomized
//! vectors and lane-width boundary dimensions.

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]

use half::{bf16, f16};
use proptest::{
    collection::vec,
    prelude::{any, prop_assert, prop_assert_eq, prop_oneof, Just, Strategy},
    proptest,
    test_runner::{Config as ProptestConfig, FileFailurePersistence},
};
use simdist_core::{distance, Metric, COSINE_BOTH_ZERO, COSINE_ONE_ZERO};

const PROP_CASES: u32 = 256;
const PROP_MAX_SHRINK_ITERS: u32 = 2048;

#[derive(Clone, Copy)]
struct Tolerance {
    abs: f64,
    rel: f64,
}

// Envelopes relative to the condition scale Σ|terms|, not the result.
const F32_TOLERANCE: Tolerance = Tolerance {
    abs: 1.0e-6,
    rel: 1.0e-4,
};
const F64_TOLERANCE: Tolerance = Tolerance {
    abs: 1.0e-12,
    rel: 1.0e-10,
};
const HALF_TOLERANCE: Tolerance = Tolerance {
    abs: 1.0e-5,
    rel: 1.0e-3,
};
const COSINE_TOLERANCE: f64 = 5.0e-4;

fn bounded_dimension_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![
        Just(0_usize),
        Just(1_usize),
        Just(3_usize),
        Just(7_usize),
        Just(8_usize),
        Just(9_usize),
        Just(15_usize),
        Just(16_usize),
        Just(17_usize),
        Just(31_usize),
        Just(32_usize),
        Just(33_usize),
        Just(63_usize),
        Just(64_usize),
        Just(65_usize),
        Just(127_usize),
        Just(128_usize),
        Just(129_usize),
        0_usize..=1536,
    ]
}

fn f32_pair_strategy() -> impl Strategy<Value = (Vec<f32>, Vec<f32>)> {
    bounded_dimension_strategy().prop_flat_map(|len| {
        let a = vec(-1.0_f32..1.0_f32, len);
        let b = vec(-1.0_f32..1.0_f32, len);
        (a, b)
    })
}

fn f64_pair_strategy() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    bounded_dimension_strategy().prop_flat_map(|len| {
        let a = vec(-1.0_f64..1.0_f64, len);
        let b = vec(-1.0_f64..1.0_f64, len);
        (a, b)
    })
}

fn i8_pair_strategy() -> impl Strategy<Value = (Vec<i8>, Vec<i8>)> {
    bounded_dimension_strategy().prop_flat_map(|len| (vec(any::<i8>(), len), vec(any::<i8>(), len)))
}

fn binary_pair_strategy() -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
    bounded_dimension_strategy().prop_flat_map(|len| (vec(any::<u8>(), len), vec(any::<u8>(), len)))
}

fn proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: PROP_CASES,
        max_shrink_iters: PROP_MAX_SHRINK_ITERS,
        // Integration tests do not have a nearby lib.rs/main.rs, so set an
        // explicit persistence root for reproducible counterexamples.
        failure_persistence: Some(Box::new(FileFailurePersistence::WithSource(
            "dispatch-property-regressions",
        ))),
        ..ProptestConfig::default()
    }
}

fn within(actual: f64, expected: f64, scale: f64, tolerance: Tolerance) -> bool {
    (actual - expected).abs() <= tolerance.abs.max(tolerance.rel * scale.max(1.0))
}

// ============================================================================
// References (f64 / i64, sequential)
// ============================================================================

fn reference_dot(a: &[f64], b: &[f64]) -> (f64, f64) {
    let dot = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let scale = a.iter().zip(b).map(|(x, y)| (x * y).abs()).sum();
    (dot, scale)
}

fn reference_sqeuclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn reference_cosine(a: &[f64], b: &[f64]) -> f64 {
    let (dot, _) = reference_dot(a, b);
    let (na, _) = reference_dot(a, a);
    let (nb, _) = reference_dot(b, b);
    match (na == 0.0, nb == 0.0) {
        (true, true) => COSINE_BOTH_ZERO,
        (true, false) | (false, true) => COSINE_ONE_ZERO,
        (false, false) => (1.0 - dot / (na.sqrt() * nb.sqrt())).clamp(0.0, 2.0),
    }
}

fn widen<T: Copy>(v: &[T], f: impl Fn(T) -> f64) -> Vec<f64> {
    v.iter().map(|&x| f(x)).collect()
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn test_f32_kernels_match_reference((a, b) in f32_pair_strategy()) {
        let (wa, wb) = (widen(&a, f64::from), widen(&b, f64::from));
        let (dot, scale) = reference_dot(&wa, &wb);
        let l2 = reference_sqeuclidean(&wa, &wb);

        let got = distance(Metric::InnerProduct, &a, &b).unwrap();
        prop_assert!(within(got, dot, scale, F32_TOLERANCE), "dot len={} got={} ref={}", a.len(), got, dot);

        let got = distance(Metric::SqEuclidean, &a, &b).unwrap();
        prop_assert!(within(got, l2, l2, F32_TOLERANCE), "l2 len={} got={} ref={}", a.len(), got, l2);

        let got = distance(Metric::Cosine, &a, &b).unwrap();
        let expected = reference_cosine(&wa, &wb);
        prop_assert!((got - expected).abs() <= COSINE_TOLERANCE, "cosine len={} got={} ref={}", a.len(), got, expected);
        prop_assert!((0.0..=2.0).contains(&got), "cosine out of range: {}", got);
    }

    #[test]
    fn test_f64_kernels_match_reference((a, b) in f64_pair_strategy()) {
        let (dot, scale) = reference_dot(&a, &b);
        let l2 = reference_sqeuclidean(&a, &b);

        let got = distance(Metric::InnerProduct, &a, &b).unwrap();
        prop_assert!(within(got, dot, scale, F64_TOLERANCE), "dot len={} got={} ref={}", a.len(), got, dot);

        let got = distance(Metric::SqEuclidean, &a, &b).unwrap();
        prop_assert!(within(got, l2, l2, F64_TOLERANCE), "l2 len={} got={} ref={}", a.len(), got, l2);
    }

    #[test]
    fn test_half_kernels_match_reference((a, b) in f32_pair_strategy()) {
        let ha: Vec<f16> = a.iter().map(|&x| f16::from_f32(x)).collect();
        let hb: Vec<f16> = b.iter().map(|&x| f16::from_f32(x)).collect();
        let (dot, scale) = reference_dot(&widen(&ha, f16::to_f64), &widen(&hb, f16::to_f64));
        let got = distance(Metric::InnerProduct, &ha, &hb).unwrap();
        prop_assert!(within(got, dot, scale, HALF_TOLERANCE), "f16 dot len={} got={} ref={}", a.len(), got, dot);

        let ba: Vec<bf16> = a.iter().map(|&x| bf16::from_f32(x)).collect();
        let bb: Vec<bf16> = b.iter().map(|&x| bf16::from_f32(x)).collect();
        let (wa, wb) = (widen(&ba, bf16::to_f64), widen(&bb, bf16::to_f64));
        let l2 = reference_sqeuclidean(&wa, &wb);
        let got = distance(Metric::SqEuclidean, &ba, &bb).unwrap();
        prop_assert!(within(got, l2, l2, HALF_TOLERANCE), "bf16 l2 len={} got={} ref={}", a.len(), got, l2);
    }

    #[test]
    fn test_i8_kernels_are_exact((a, b) in i8_pair_strategy()) {
        let dot: i64 = a.iter().zip(&b).map(|(&x, &y)| i64::from(x) * i64::from(y)).sum();
        let l2: i64 = a.iter().zip(&b).map(|(&x, &y)| (i64::from(x) - i64::from(y)).pow(2)).sum();
        prop_assert_eq!(distance(Metric::InnerProduct, &a, &b).unwrap(), dot as f64);
        prop_assert_eq!(distance(Metric::SqEuclidean, &a, &b).unwrap(), l2 as f64);
    }

    #[test]
    fn test_binary_kernels_are_exact((a, b) in binary_pair_strategy()) {
        let hamming: u32 = a.iter().zip(&b).map(|(x, y)| (x ^ y).count_ones()).sum();
        let inter: u32 = a.iter().zip(&b).map(|(x, y)| (x & y).count_ones()).sum();
        let union: u32 = a.iter().zip(&b).map(|(x, y)| (x | y).count_ones()).sum();
        let jaccard = if union == 0 { 0.0 } else { 1.0 - f64::from(inter) / f64::from(union) };

        prop_assert_eq!(distance(Metric::Hamming, &a, &b).unwrap(), f64::from(hamming));
        prop_assert_eq!(distance(Metric::Jaccard, &a, &b).unwrap(), jaccard);
    }

    #[test]
    fn test_sqeuclidean_is_symmetric((a, b) in f32_pair_strategy()) {
        prop_assert_eq!(
            distance(Metric::SqEuclidean, &a, &b).unwrap(),
            distance(Metric::SqEuclidean, &b, &a).unwrap()
        );
    }

    #[test]
    fn test_cosine_with_zero_vector_is_sentinel(a in vec(-1.0_f32..1.0_f32, 1..300)) {
        let zero = vec![0.0_f32; a.len()];
        let got = distance(Metric::Cosine, &a, &zero).unwrap();
        if a.iter().all(|&x| x == 0.0) {
            prop_assert_eq!(got, COSINE_BOTH_ZERO);
        } else {
            prop_assert_eq!(got, COSINE_ONE_ZERO);
        }
    }
}

#[test]
fn test_tolerance_sanity() {
    let a = [1.0_f32, 2.0, 3.0, 4.0];
    let b = [4.0_f32, 3.0, 2.0, 1.0];
    assert_eq!(distance(Metric::InnerProduct, &a, &b).unwrap(), 20.0);
    assert_eq!(distance(Metric::SqEuclidean, &a, &b).unwrap(), 20.0);
    assert!(within(20.0 + 1e-5, 20.0, 20.0, F32_TOLERANCE));
    assert!(!within(20.1, 20.0, 20.0, F32_TOLERANCE));
}
