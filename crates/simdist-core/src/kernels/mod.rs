//! Metric kernels, one submodule per instruction set.
//!
//! # Module Structure
//!
//! - `scalar`: Serial baseline, shared finalizers and sentinels
//! - `tail_unroll`: Remainder handling macros for the AVX2 f32 loops
//! - `x86_avx2`: AVX2+FMA f32/f64 kernels (x86_64 only)
//! - `x86_avx2_mixed`: AVX2 f16/bf16/i8 kernels (x86_64 only)
//! - `x86_avx2_binary`: AVX2 Hamming/Jaccard kernels (x86_64 only)
//! - `x86_avx512`: AVX-512F f32/f64/f16 kernels (x86_64 only)
//! - `neon`: ARM NEON kernels (aarch64 only)
//!
//! Nothing here is called directly by users; kernels are reached through the
//! [`registry`](crate::registry) and the [`dispatch`](crate::dispatch) layer.
#![allow(clippy::cast_lossless)] // Numeric widening in SIMD kernels is intentional.

pub mod scalar;
#[cfg(target_arch = "x86_64")]
mod tail_unroll;

// =============================================================================
// Unsafe Invariants Reference
// =============================================================================
// SAFETY: Shared invariants for SIMD unsafe blocks in this module tree.
// - Condition 1: All pointer arithmetic is derived from slice pointers with loop bounds
//   proving in-range access for each lane width.
// - Condition 2: Target-featured functions are only reachable through registry
//   descriptors whose tier is contained in the probed hardware set.
// - Condition 3: Unaligned loads use `*_loadu_*`/masked-load intrinsics or equivalent
//   APIs that permit unaligned access.
// - Condition 4: Both operands have equal length; the dispatcher rejects anything else
//   before a kernel runs.

#[cfg(target_arch = "x86_64")]
pub(crate) mod x86_avx2;

#[cfg(target_arch = "x86_64")]
pub(crate) mod x86_avx2_mixed;

#[cfg(target_arch = "x86_64")]
pub(crate) mod x86_avx2_binary;

#[cfg(target_arch = "x86_64")]
pub(crate) mod x86_avx512;

#[cfg(target_arch = "aarch64")]
pub(crate) mod neon;

#[cfg(test)]
mod kernel_equivalence_tests;
