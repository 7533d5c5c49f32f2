//! Fuzz target for the flat C boundary.
//!
//! Arbitrary metric and dtype ids, element counts and raw bytes are pushed
//! through `simdist_compute`. No input may panic, and every call must return
//! one of the four status codes.
//!
//! # Running
//!
//! ```bash
//! cd fuzz
//! cargo +nightly fuzz run fuzz_compute
//! ```

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use simdist_core::ffi::simdist_compute;
use simdist_core::{DataType, Metric, Status};

const MAX_BYTES: usize = 16 * 1024;

#[derive(Arbitrary, Debug)]
struct ComputeInput {
    metric_id: u8,
    dtype_id: u8,
    /// Requested element count, clamped to what the buffers hold.
    count: u16,
    bytes_a: Vec<u8>,
    bytes_b: Vec<u8>,
}

/// Copies `bytes` into 8-byte aligned storage of exactly `len` bytes.
fn aligned(bytes: &[u8], len: usize) -> Vec<u64> {
    let mut words = vec![0_u64; len.div_ceil(8)];
    for (i, byte) in bytes.iter().take(len).enumerate() {
        words[i / 8] |= u64::from(*byte) << ((i % 8) * 8);
    }
    words
}

fuzz_target!(|input: ComputeInput| {
    let metric_id = u32::from(input.metric_id % 9);
    let dtype_id = u32::from(input.dtype_id % 8);
    let size = DataType::from_id(dtype_id).map_or(1, DataType::size_of);

    let len = input.bytes_a.len().max(input.bytes_b.len()).min(MAX_BYTES);
    let capacity = len / size;
    let n = usize::from(input.count).min(capacity);

    let a = aligned(&input.bytes_a, len);
    let b = aligned(&input.bytes_b, len);
    let mut out = f64::NAN;

    // SAFETY: both buffers are 8-byte aligned and hold at least `n * size` bytes.
    let status = unsafe { simdist_compute(metric_id, dtype_id, a.as_ptr().cast(), b.as_ptr().cast(), n, &mut out) };

    match status {
        Status::Ok => {
            let metric = Metric::from_id(metric_id).expect("ok implies a known metric");
            if metric == Metric::Hamming {
                assert!(out >= 0.0 && out <= (8 * n) as f64, "hamming {out} for {n} bytes");
            }
            if metric == Metric::Jaccard {
                assert!((0.0..=1.0).contains(&out), "jaccard {out}");
            }
        }
        Status::UnsupportedMetricOrDtype | Status::InvalidArgument => {
            assert!(out.is_nan(), "out written on {status:?}");
        }
        Status::LengthMismatch => unreachable!("raw calls cannot disagree on length"),
    }
});
