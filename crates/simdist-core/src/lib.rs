//! # simdist core
//!
//! Runtime-dispatched SIMD similarity and distance kernels.
//!
//! One logical operation, `metric(a, b)`, is served by many hardware- and
//! precision-specific kernels. This crate probes the CPU once, keeps a static
//! registry of every compiled kernel, and resolves (then memoizes) the best
//! kernel per (metric, dtype) pair.
//!
//! ## Features
//!
//! - **7 metrics**: inner product, squared Euclidean, cosine, Hamming,
//!   Jaccard, Kullback–Leibler and Jensen–Shannon divergence
//! - **6 element types**: i8, f16, bf16, f32, f64 and bit-packed binary
//! - **Tiers**: AVX-512F, AVX2/FMA/F16C, NEON, and a scalar baseline that is
//!   also the correctness oracle
//! - **Flat C boundary**: see [`ffi`]
//!
//! ## Quick Start
//!
//! ```rust
//! use simdist_core::{compute, resolve, DataType, Metric, VectorView};
//!
//! fn main() -> Result<(), simdist_core::Error> {
//!     let a = [1.0_f32, 2.0, 3.0];
//!     let b = [4.0_f32, 5.0, 6.0];
//!
//!     let d = compute(Metric::SqEuclidean, DataType::F32, (&a).into(), (&b).into(), 3)?;
//!     assert_eq!(d, 27.0);
//!
//!     // Resolution is memoized: the same pair yields the same kernel.
//!     let kernel = resolve(Metric::Cosine, DataType::F32)?;
//!     assert_eq!(kernel, resolve(Metric::Cosine, DataType::F32)?);
//!     let _ = kernel.compute(VectorView::F32(&a), VectorView::F32(&b))?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
// Clippy lints configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(
    test,
    allow(
        clippy::doc_markdown,
        clippy::uninlined_format_args,
        clippy::cast_lossless,
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss,
        clippy::float_cmp
    )
)]

pub mod capability;
pub mod config;
#[cfg(test)]
mod config_tests;
pub mod dispatch;
pub mod error;
#[cfg(test)]
mod error_tests;
pub mod ffi;
pub mod kernels;
#[cfg(test)]
mod scalar_tests;
pub mod registry;
pub mod types;

pub use capability::{
    detect, hardware_capabilities, override_capabilities, reset_capabilities, Capability,
    CapabilitySet,
};
pub use config::{DispatchConfig, SimdistConfig};
pub use dispatch::{compute, compute_batch, distance, resolve, warmup, Kernel};
pub use error::{Error, Result, Status};
pub use kernels::scalar::{
    COSINE_BOTH_ZERO, COSINE_ONE_ZERO, DIVERGENCE_EPSILON, JACCARD_EMPTY_UNION,
};
pub use registry::{KernelDescriptor, KernelFn};
pub use types::{DataType, Metric, VectorView};
