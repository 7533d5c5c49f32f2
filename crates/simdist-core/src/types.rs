//! Metric and element-type tags, and the borrowed vector view.
//!
//! The numeric ids of [`Metric`] and [`DataType`] are part of the C boundary
//! and must never be renumbered.

use std::fmt;

use half::{bf16, f16};
use serde::{Deserialize, Serialize};

/// Similarity or distance metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum Metric {
    /// Σ aᵢ·bᵢ.
    InnerProduct = 0,
    /// Σ (aᵢ − bᵢ)².
    SqEuclidean = 1,
    /// 1 − cos(a, b).
    Cosine = 2,
    /// Number of differing bits of packed binary vectors.
    Hamming = 3,
    /// 1 − |A∩B| / |A∪B| of packed binary vectors.
    Jaccard = 4,
    /// Kullback–Leibler divergence KL(a‖b), in nats.
    KlDivergence = 5,
    /// Jensen–Shannon divergence, in nats.
    JsDivergence = 6,
}

impl Metric {
    /// Number of metrics.
    pub const COUNT: usize = 7;

    /// All metrics in id order.
    pub const ALL: [Metric; Self::COUNT] = [
        Metric::InnerProduct,
        Metric::SqEuclidean,
        Metric::Cosine,
        Metric::Hamming,
        Metric::Jaccard,
        Metric::KlDivergence,
        Metric::JsDivergence,
    ];

    /// Parses a boundary id.
    #[must_use]
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Boundary id of this metric.
    #[must_use]
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Canonical snake_case name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::InnerProduct => "inner_product",
            Self::SqEuclidean => "sqeuclidean",
            Self::Cosine => "cosine",
            Self::Hamming => "hamming",
            Self::Jaccard => "jaccard",
            Self::KlDivergence => "kl_divergence",
            Self::JsDivergence => "js_divergence",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element type of a vector buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum DataType {
    /// Signed 8-bit integers.
    #[serde(rename = "int8")]
    I8 = 0,
    /// IEEE 754 half precision.
    #[serde(rename = "float16")]
    F16 = 1,
    /// Brain floating point (8-bit exponent, 7-bit mantissa).
    #[serde(rename = "bfloat16")]
    BF16 = 2,
    /// IEEE 754 single precision.
    #[serde(rename = "float32")]
    F32 = 3,
    /// IEEE 754 double precision.
    #[serde(rename = "float64")]
    F64 = 4,
    /// Bit-packed binary vector, 8 dimensions per byte.
    #[serde(rename = "binary_packed")]
    Binary = 5,
}

impl DataType {
    /// Number of element types.
    pub const COUNT: usize = 6;

    /// All element types in id order.
    pub const ALL: [DataType; Self::COUNT] = [
        DataType::I8,
        DataType::F16,
        DataType::BF16,
        DataType::F32,
        DataType::F64,
        DataType::Binary,
    ];

    /// Parses a boundary id.
    #[must_use]
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Boundary id of this element type.
    #[must_use]
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Bytes per stored element. Binary vectors count whole bytes.
    #[must_use]
    pub fn size_of(self) -> usize {
        match self {
            Self::I8 | Self::Binary => 1,
            Self::F16 | Self::BF16 => 2,
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Canonical name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::I8 => "int8",
            Self::F16 => "float16",
            Self::BF16 => "bfloat16",
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::Binary => "binary_packed",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Non-owning, typed view over a caller-owned buffer.
///
/// Kernels only ever read through a view; the view never outlives the call
/// that received it.
#[derive(Debug, Clone, Copy)]
pub enum VectorView<'a> {
    /// Signed 8-bit integers.
    I8(&'a [i8]),
    /// Half precision.
    F16(&'a [f16]),
    /// Brain floating point.
    BF16(&'a [bf16]),
    /// Single precision.
    F32(&'a [f32]),
    /// Double precision.
    F64(&'a [f64]),
    /// Packed bits, one byte per 8 dimensions.
    Binary(&'a [u8]),
}

impl<'a> VectorView<'a> {
    /// Element type tag of the view.
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

    /// Number of stored elements (bytes for binary vectors).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::I8(v) => v.len(),
            Self::F16(v) => v.len(),
            Self::BF16(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::Binary(v) => v.len(),
        }
    }

    /// Returns `true` if the view holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds a view from a raw pointer and element count.
    ///
    /// A null pointer is accepted only for `n == 0` and yields an empty view.
    ///
    /// # Safety
    ///
    /// For `n > 0`, `ptr` must be non-null, aligned for `dtype`, and valid for
    /// reads of `n * dtype.size_of()` bytes for the lifetime `'a`; the memory
    /// must not be mutated while the view is alive.
    #[must_use]
    pub unsafe fn from_raw_parts(
        dtype: DataType,
        ptr: *const std::ffi::c_void,
        n: usize,
    ) -> Option<Self> {
        if n == 0 {
            return Some(Self::empty(dtype));
        }
        if ptr.is_null() || (ptr as usize) % dtype_align(dtype) != 0 {
            return None;
        }
        // SAFETY: non-null, aligned, and valid for `n` elements per the caller contract.
        let view = match dtype {
            DataType::I8 => Self::I8(std::slice::from_raw_parts(ptr.cast::<i8>(), n)),
            DataType::F16 => Self::F16(std::slice::from_raw_parts(ptr.cast::<f16>(), n)),
            DataType::BF16 => Self::BF16(std::slice::from_raw_parts(ptr.cast::<bf16>(), n)),
            DataType::F32 => Self::F32(std::slice::from_raw_parts(ptr.cast::<f32>(), n)),
            DataType::F64 => Self::F64(std::slice::from_raw_parts(ptr.cast::<f64>(), n)),
            DataType::Binary => Self::Binary(std::slice::from_raw_parts(ptr.cast::<u8>(), n)),
        };
        Some(view)
    }

    fn empty(dtype: DataType) -> Self {
        match dtype {
            DataType::I8 => Self::I8(&[]),
            DataType::F16 => Self::F16(&[]),
            DataType::BF16 => Self::BF16(&[]),
            DataType::F32 => Self::F32(&[]),
            DataType::F64 => Self::F64(&[]),
            DataType::Binary => Self::Binary(&[]),
        }
    }
}

fn dtype_align(dtype: DataType) -> usize {
    match dtype {
        DataType::I8 | DataType::Binary => 1,
        DataType::F16 => std::mem::align_of::<f16>(),
        DataType::BF16 => std::mem::align_of::<bf16>(),
        DataType::F32 => std::mem::align_of::<f32>(),
        DataType::F64 => std::mem::align_of::<f64>(),
    }
}

macro_rules! impl_view_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl<'a> From<&'a [$ty]> for VectorView<'a> {
                fn from(slice: &'a [$ty]) -> Self {
                    Self::$variant(slice)
                }
            }

            impl<'a, const N: usize> From<&'a [$ty; N]> for VectorView<'a> {
                fn from(array: &'a [$ty; N]) -> Self {
                    Self::$variant(array.as_slice())
                }
            }

            impl<'a> From<&'a Vec<$ty>> for VectorView<'a> {
                fn from(vec: &'a Vec<$ty>) -> Self {
                    Self::$variant(vec.as_slice())
                }
            }
        )*
    };
}

impl_view_from! {
    i8 => I8,
    f16 => F16,
    bf16 => BF16,
    f32 => F32,
    f64 => F64,
    u8 => Binary,
}
