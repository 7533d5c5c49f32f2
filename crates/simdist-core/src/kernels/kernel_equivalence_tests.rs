//! Every vectorized kernel the host can run must match the serial baseline.
//!
//! Lengths cover `n = k·width + r` for every remainder `r` in `[0, width)`,
//! so each tail path is exercised.

use half::{bf16, f16};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::capability::{hardware_capabilities, Capability};
use crate::registry::{self, KernelDescriptor};
use crate::types::{DataType, Metric, VectorView};

/// Owned operand pair for one dtype.
enum Operands {
    I8(Vec<i8>, Vec<i8>),
    F16(Vec<f16>, Vec<f16>),
    BF16(Vec<bf16>, Vec<bf16>),
    F32(Vec<f32>, Vec<f32>),
    F64(Vec<f64>, Vec<f64>),
    Binary(Vec<u8>, Vec<u8>),
}

impl Operands {
    fn random(rng: &mut StdRng, dtype: DataType, n: usize) -> Self {
        let floats =
            |rng: &mut StdRng| -> Vec<f32> { (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect() };
        match dtype {
            DataType::I8 => Self::I8(
                (0..n).map(|_| rng.gen()).collect(),
                (0..n).map(|_| rng.gen()).collect(),
            ),
            DataType::F16 => Self::F16(
                floats(rng).into_iter().map(f16::from_f32).collect(),
                floats(rng).into_iter().map(f16::from_f32).collect(),
            ),
            DataType::BF16 => Self::BF16(
                floats(rng).into_iter().map(bf16::from_f32).collect(),
                floats(rng).into_iter().map(bf16::from_f32).collect(),
            ),
            DataType::F32 => Self::F32(floats(rng), floats(rng)),
            DataType::F64 => Self::F64(
                (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect(),
                (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect(),
            ),
            DataType::Binary => Self::Binary(
                (0..n).map(|_| rng.gen()).collect(),
                (0..n).map(|_| rng.gen()).collect(),
            ),
        }
    }

    fn zeros(dtype: DataType, n: usize) -> Self {
        match dtype {
            DataType::I8 => Self::I8(vec![0; n], vec![0; n]),
            DataType::F16 => Self::F16(vec![f16::ZERO; n], vec![f16::ZERO; n]),
            DataType::BF16 => Self::BF16(vec![bf16::ZERO; n], vec![bf16::ZERO; n]),
            DataType::F32 => Self::F32(vec![0.0; n], vec![0.0; n]),
            DataType::F64 => Self::F64(vec![0.0; n], vec![0.0; n]),
            DataType::Binary => Self::Binary(vec![0; n], vec![0; n]),
        }
    }

    /// Converts f64 operands into the floating dtypes whose f32 accumulators
    /// can overflow or underflow. Other dtypes yield `None`.
    fn from_f64(dtype: DataType, a: &[f64], b: &[f64]) -> Option<Self> {
        match dtype {
            DataType::F32 => Some(Self::F32(
                a.iter().map(|&x| x as f32).collect(),
                b.iter().map(|&x| x as f32).collect(),
            )),
            DataType::BF16 => Some(Self::BF16(
                a.iter().map(|&x| bf16::from_f64(x)).collect(),
                b.iter().map(|&x| bf16::from_f64(x)).collect(),
            )),
            DataType::F64 => Some(Self::F64(a.to_vec(), b.to_vec())),
            DataType::I8 | DataType::F16 | DataType::Binary => None,
        }
    }

    fn views(&self) -> (VectorView<'_>, VectorView<'_>) {
        match self {
            Self::I8(a, b) => (a.into(), b.into()),
            Self::F16(a, b) => (a.into(), b.into()),
            Self::BF16(a, b) => (a.into(), b.into()),
            Self::F32(a, b) => (a.into(), b.into()),
            Self::F64(a, b) => (a.into(), b.into()),
            Self::Binary(a, b) => (a.into(), b.into()),
        }
    }
}

fn tolerance(dtype: DataType) -> f64 {
    match dtype {
        DataType::I8 | DataType::Binary => 0.0,
        DataType::F64 => 1e-10,
        DataType::F32 => 1e-4,
        DataType::F16 | DataType::BF16 => 1e-3,
    }
}

fn run(descriptor: &KernelDescriptor, a: VectorView<'_>, b: VectorView<'_>) -> f64 {
    // SAFETY: only descriptors whose tier is in the detected hardware set are run.
    unsafe { descriptor.func().call(a, b) }.expect("operand dtype matches descriptor")
}

fn serial_of(descriptor: &KernelDescriptor) -> &'static KernelDescriptor {
    registry::descriptors(descriptor.metric, descriptor.dtype)
        .into_iter()
        .find(|d| d.capability == Capability::Serial)
        .expect("serial fallback")
}

fn runnable() -> impl Iterator<Item = &'static KernelDescriptor> {
    let hardware = hardware_capabilities();
    registry::all().filter(move |d| d.capability != Capability::Serial && hardware.contains(d.capability))
}

fn assert_matches_serial(descriptor: &KernelDescriptor, rng: &mut StdRng, n: usize) {
    let serial = serial_of(descriptor);
    let operands = Operands::random(rng, descriptor.dtype, n);
    let (a, b) = operands.views();

    let expected = run(serial, a, b);
    let got = run(descriptor, a, b);
    let bound = tolerance(descriptor.dtype) * expected.abs().max(1.0);
    assert!(
        (got - expected).abs() <= bound,
        "{} n={n}: got {got}, serial {expected}",
        descriptor.name
    );
}

#[test]
fn test_every_tail_remainder_matches_serial() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    for descriptor in runnable() {
        let width = descriptor.width;
        for k in [0, 1, 2, 5] {
            for r in 0..width {
                assert_matches_serial(descriptor, &mut rng, k * width + r);
            }
        }
    }
}

#[test]
fn test_long_vectors_match_serial() {
    let mut rng = StdRng::seed_from_u64(42);
    for descriptor in runnable() {
        for n in [768, 1031, 4099] {
            assert_matches_serial(descriptor, &mut rng, n);
        }
    }
}

#[test]
fn test_i8_block_boundary_is_exact() {
    // Crosses the 65 536-element flush of the i32 lanes.
    let mut rng = StdRng::seed_from_u64(7);
    for descriptor in runnable().filter(|d| d.dtype == DataType::I8) {
        assert_matches_serial(descriptor, &mut rng, (1 << 16) + 37);
    }

    let a = vec![-128_i8; 200_000];
    let b = vec![127_i8; 200_000];
    for descriptor in runnable().filter(|d| d.dtype == DataType::I8) {
        let got = run(descriptor, (&a).into(), (&b).into());
        let expected = run(serial_of(descriptor), (&a).into(), (&b).into());
        assert_eq!(got, expected, "{}", descriptor.name);
    }
}

#[test]
fn test_cosine_sentinels_in_every_tier() {
    for descriptor in runnable().filter(|d| d.metric == Metric::Cosine) {
        for n in [0, 1, descriptor.width, 3 * descriptor.width + 1] {
            let zeros = Operands::zeros(descriptor.dtype, n);
            let (z, _) = zeros.views();
            assert_eq!(run(descriptor, z, z), 0.0, "{} n={n}", descriptor.name);
        }
    }
}

#[test]
fn test_cosine_extreme_magnitudes_in_every_tier() {
    for descriptor in runnable().filter(|d| d.metric == Metric::Cosine) {
        let big = if descriptor.dtype == DataType::F64 { 1e200 } else { 1e20 };
        let n = 3 * descriptor.width + 1;
        let same = vec![big; n];
        let opposite = vec![-big; n];
        let evens: Vec<f64> = (0..n).map(|i| if i % 2 == 0 { 1e-30 } else { 0.0 }).collect();
        let odds: Vec<f64> = (0..n).map(|i| if i % 2 == 1 { 1e-30 } else { 0.0 }).collect();

        for (a, b, expected) in [(&same, &same, 0.0), (&same, &opposite, 2.0), (&evens, &odds, 1.0)] {
            let Some(operands) = Operands::from_f64(descriptor.dtype, a, b) else {
                continue;
            };
            let (va, vb) = operands.views();
            let got = run(descriptor, va, vb);
            let serial = run(serial_of(descriptor), va, vb);
            assert!(
                (got - expected).abs() < 1e-9,
                "{} n={n}: got {got}, expected {expected}",
                descriptor.name
            );
            assert!((got - serial).abs() < 1e-9, "{}: got {got}, serial {serial}", descriptor.name);
        }
    }
}
