//! Static kernel registry.
//!
//! Every kernel compiled into the artifact is described by one
//! [`KernelDescriptor`]. The table is fixed at build time: a portable
//! `SERIAL_KERNELS` slice present on every target, plus an `ARCH_KERNELS`
//! slice selected by `target_arch`.
//!
//! A (metric, dtype) pair is *supported* if and only if it has a `Serial`
//! descriptor, so resolution against any capability set always finds a kernel
//! for a supported pair.

use std::fmt;

use half::{bf16, f16};

use crate::capability::Capability;
use crate::kernels::scalar;
use crate::types::{DataType, Metric, VectorView};

#[cfg(target_arch = "x86_64")]
use crate::kernels::{x86_avx2, x86_avx2_binary, x86_avx2_mixed, x86_avx512};

#[cfg(target_arch = "aarch64")]
use crate::kernels::neon;

/// Typed function reference of a kernel.
///
/// Each variant matches one element type; the pointer is `unsafe` because
/// vectorized kernels require their capability tier to be present.
#[derive(Clone, Copy)]
pub enum KernelFn {
    /// Signed 8-bit kernel.
    I8(unsafe fn(&[i8], &[i8]) -> f64),
    /// Half-precision kernel.
    F16(unsafe fn(&[f16], &[f16]) -> f64),
    /// Brain-float kernel.
    BF16(unsafe fn(&[bf16], &[bf16]) -> f64),
    /// Single-precision kernel.
    F32(unsafe fn(&[f32], &[f32]) -> f64),
    /// Double-precision kernel.
    F64(unsafe fn(&[f64], &[f64]) -> f64),
    /// Packed-binary kernel.
    Binary(unsafe fn(&[u8], &[u8]) -> f64),
}

impl KernelFn {
    /// Element type this function accepts.
    #[must_use]
    pub fn dtype(&self) -> DataType {
        match self {
            Self::I8(_) => DataType::I8,
            Self::F16(_) => DataType::F16,
            Self::BF16(_) => DataType::BF16,
            Self::F32(_) => DataType::F32,
            Self::F64(_) => DataType::F64,
            Self::Binary(_) => DataType::Binary,
        }
    }

    /// Invokes the kernel. Returns `None` if either view has a different
    /// element type than the function.
    ///
    /// # Safety
    ///
    /// The running CPU must provide the descriptor's capability tier, and
    /// `a.len() == b.len()`.
    pub(crate) unsafe fn call(self, a: VectorView<'_>, b: VectorView<'_>) -> Option<f64> {
        let value = match (self, a, b) {
            (Self::I8(f), VectorView::I8(a), VectorView::I8(b)) => f(a, b),
            (Self::F16(f), VectorView::F16(a), VectorView::F16(b)) => f(a, b),
            (Self::BF16(f), VectorView::BF16(a), VectorView::BF16(b)) => f(a, b),
            (Self::F32(f), VectorView::F32(a), VectorView::F32(b)) => f(a, b),
            (Self::F64(f), VectorView::F64(a), VectorView::F64(b)) => f(a, b),
            (Self::Binary(f), VectorView::Binary(a), VectorView::Binary(b)) => f(a, b),
            _ => return None,
        };
        Some(value)
    }
}

impl fmt::Debug for KernelFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KernelFn({})", self.dtype())
    }
}

/// Static record describing one compiled kernel.
#[derive(Debug)]
pub struct KernelDescriptor {
    /// Metric computed.
    pub metric: Metric,
    /// Element type consumed.
    pub dtype: DataType,
    /// Capability tier the kernel requires.
    pub capability: Capability,
    /// Elements processed per vector step (1 for scalar kernels).
    pub width: usize,
    /// Stable `module::function` name, used in logs and diagnostics.
    pub name: &'static str,
    pub(crate) func: KernelFn,
}

impl KernelDescriptor {
    /// Function reference of the kernel.
    #[must_use]
    pub fn func(&self) -> KernelFn {
        self.func
    }
}

macro_rules! kernel {
    ($metric:ident, $dtype:ident, $cap:ident, $width:expr, $module:ident :: $func:ident) => {
        KernelDescriptor {
            metric: Metric::$metric,
            dtype: DataType::$dtype,
            capability: Capability::$cap,
            width: $width,
            name: concat!(stringify!($module), "::", stringify!($func)),
            func: KernelFn::$dtype($module::$func),
        }
    };
}

// =============================================================================
// Portable baseline
// =============================================================================

static SERIAL_KERNELS: &[KernelDescriptor] = &[
    kernel!(InnerProduct, I8, Serial, 1, scalar::inner_i8),
    kernel!(SqEuclidean, I8, Serial, 1, scalar::sqeuclidean_i8),
    kernel!(Cosine, I8, Serial, 1, scalar::cosine_i8),
    kernel!(InnerProduct, F16, Serial, 1, scalar::inner_f16),
    kernel!(SqEuclidean, F16, Serial, 1, scalar::sqeuclidean_f16),
    kernel!(Cosine, F16, Serial, 1, scalar::cosine_f16),
    kernel!(InnerProduct, BF16, Serial, 1, scalar::inner_bf16),
    kernel!(SqEuclidean, BF16, Serial, 1, scalar::sqeuclidean_bf16),
    kernel!(Cosine, BF16, Serial, 1, scalar::cosine_bf16),
    kernel!(InnerProduct, F32, Serial, 1, scalar::inner_f32),
    kernel!(SqEuclidean, F32, Serial, 1, scalar::sqeuclidean_f32),
    kernel!(Cosine, F32, Serial, 1, scalar::cosine_f32),
    kernel!(InnerProduct, F64, Serial, 1, scalar::inner_f64),
    kernel!(SqEuclidean, F64, Serial, 1, scalar::sqeuclidean_f64),
    kernel!(Cosine, F64, Serial, 1, scalar::cosine_f64),
    kernel!(Hamming, Binary, Serial, 1, scalar::hamming),
    kernel!(Jaccard, Binary, Serial, 1, scalar::jaccard),
    kernel!(KlDivergence, F16, Serial, 1, scalar::kl_f16),
    kernel!(JsDivergence, F16, Serial, 1, scalar::js_f16),
    kernel!(KlDivergence, BF16, Serial, 1, scalar::kl_bf16),
    kernel!(JsDivergence, BF16, Serial, 1, scalar::js_bf16),
    kernel!(KlDivergence, F32, Serial, 1, scalar::kl_f32),
    kernel!(JsDivergence, F32, Serial, 1, scalar::js_f32),
    kernel!(KlDivergence, F64, Serial, 1, scalar::kl_f64),
    kernel!(JsDivergence, F64, Serial, 1, scalar::js_f64),
];

// =============================================================================
// Architecture-specific tiers
// =============================================================================

#[cfg(target_arch = "x86_64")]
static ARCH_KERNELS: &[KernelDescriptor] = &[
    // Skylake (AVX-512F)
    kernel!(InnerProduct, F32, Skylake, 16, x86_avx512::inner_f32),
    kernel!(SqEuclidean, F32, Skylake, 16, x86_avx512::sqeuclidean_f32),
    kernel!(Cosine, F32, Skylake, 16, x86_avx512::cosine_f32),
    kernel!(InnerProduct, F64, Skylake, 8, x86_avx512::inner_f64),
    kernel!(SqEuclidean, F64, Skylake, 8, x86_avx512::sqeuclidean_f64),
    kernel!(Cosine, F64, Skylake, 8, x86_avx512::cosine_f64),
    kernel!(InnerProduct, F16, Skylake, 16, x86_avx512::inner_f16),
    kernel!(SqEuclidean, F16, Skylake, 16, x86_avx512::sqeuclidean_f16),
    kernel!(Cosine, F16, Skylake, 16, x86_avx512::cosine_f16),
    // Haswell (AVX2 + FMA + F16C + POPCNT)
    kernel!(InnerProduct, F32, Haswell, 8, x86_avx2::inner_f32),
    kernel!(SqEuclidean, F32, Haswell, 8, x86_avx2::sqeuclidean_f32),
    kernel!(Cosine, F32, Haswell, 8, x86_avx2::cosine_f32),
    kernel!(InnerProduct, F64, Haswell, 4, x86_avx2::inner_f64),
    kernel!(SqEuclidean, F64, Haswell, 4, x86_avx2::sqeuclidean_f64),
    kernel!(Cosine, F64, Haswell, 4, x86_avx2::cosine_f64),
    kernel!(InnerProduct, F16, Haswell, 8, x86_avx2_mixed::inner_f16),
    kernel!(SqEuclidean, F16, Haswell, 8, x86_avx2_mixed::sqeuclidean_f16),
    kernel!(Cosine, F16, Haswell, 8, x86_avx2_mixed::cosine_f16),
    kernel!(InnerProduct, BF16, Haswell, 8, x86_avx2_mixed::inner_bf16),
    kernel!(SqEuclidean, BF16, Haswell, 8, x86_avx2_mixed::sqeuclidean_bf16),
    kernel!(Cosine, BF16, Haswell, 8, x86_avx2_mixed::cosine_bf16),
    kernel!(InnerProduct, I8, Haswell, 16, x86_avx2_mixed::inner_i8),
    kernel!(SqEuclidean, I8, Haswell, 16, x86_avx2_mixed::sqeuclidean_i8),
    kernel!(Cosine, I8, Haswell, 16, x86_avx2_mixed::cosine_i8),
    kernel!(Hamming, Binary, Haswell, 32, x86_avx2_binary::hamming),
    kernel!(Jaccard, Binary, Haswell, 32, x86_avx2_binary::jaccard),
];

#[cfg(target_arch = "aarch64")]
static ARCH_KERNELS: &[KernelDescriptor] = &[
    kernel!(InnerProduct, F32, Neon, 4, neon::inner_f32),
    kernel!(SqEuclidean, F32, Neon, 4, neon::sqeuclidean_f32),
    kernel!(Cosine, F32, Neon, 4, neon::cosine_f32),
    kernel!(InnerProduct, F64, Neon, 2, neon::inner_f64),
    kernel!(SqEuclidean, F64, Neon, 2, neon::sqeuclidean_f64),
    kernel!(Cosine, F64, Neon, 2, neon::cosine_f64),
    kernel!(InnerProduct, BF16, Neon, 8, neon::inner_bf16),
    kernel!(SqEuclidean, BF16, Neon, 8, neon::sqeuclidean_bf16),
    kernel!(Cosine, BF16, Neon, 8, neon::cosine_bf16),
    kernel!(InnerProduct, I8, Neon, 16, neon::inner_i8),
    kernel!(SqEuclidean, I8, Neon, 16, neon::sqeuclidean_i8),
    kernel!(Cosine, I8, Neon, 16, neon::cosine_i8),
    kernel!(Hamming, Binary, Neon, 16, neon::hamming),
    kernel!(Jaccard, Binary, Neon, 16, neon::jaccard),
];

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
static ARCH_KERNELS: &[KernelDescriptor] = &[];

// =============================================================================
// Queries
// =============================================================================

/// Every descriptor compiled into this artifact, in table order.
pub fn all() -> impl Iterator<Item = &'static KernelDescriptor> {
    SERIAL_KERNELS.iter().chain(ARCH_KERNELS.iter())
}

/// Descriptors for one (metric, dtype) pair, sorted by descending capability
/// tier and then descending vector width.
///
/// Empty for unsupported pairs.
#[must_use]
pub fn descriptors(metric: Metric, dtype: DataType) -> Vec<&'static KernelDescriptor> {
    let mut found: Vec<_> = all()
        .filter(|d| d.metric == metric && d.dtype == dtype)
        .collect();
    found.sort_by(|x, y| (y.capability, y.width).cmp(&(x.capability, x.width)));
    found
}

/// Returns `true` if the pair has a `Serial` baseline and is therefore
/// resolvable on every host.
#[must_use]
pub fn is_supported(metric: Metric, dtype: DataType) -> bool {
    SERIAL_KERNELS
        .iter()
        .any(|d| d.metric == metric && d.dtype == dtype)
}

/// All supported (metric, dtype) pairs, in id order.
pub fn supported_pairs() -> impl Iterator<Item = (Metric, DataType)> {
    Metric::ALL.into_iter().flat_map(|metric| {
        DataType::ALL
            .into_iter()
            .filter(move |&dtype| is_supported(metric, dtype))
            .map(move |dtype| (metric, dtype))
    })
}
