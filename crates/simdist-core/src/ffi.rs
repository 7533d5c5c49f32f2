//! Flat `extern "C"` boundary for binding layers.
//!
//! Buffers cross the boundary as untyped pointers plus a dtype id and an
//! element count; results are written through an out-pointer and every call
//! returns a [`Status`]. Nothing here allocates or retains a pointer past the
//! call.

use std::ffi::c_void;

use crate::capability::{self, CapabilitySet};
use crate::dispatch;
use crate::error::{Error, Result, Status};
use crate::registry;
use crate::types::{DataType, Metric, VectorView};

/// Computes `metric_id` over two buffers of `n` elements of `dtype_id`.
///
/// On [`Status::Ok`] the result is written to `*out`; on any other status
/// `*out` is left untouched.
///
/// # Safety
///
/// For `n > 0`, `a` and `b` must be aligned for the element type and valid
/// for reads of `n` elements (`n` bytes for binary vectors) for the duration
/// of the call. `out` must be valid for one `f64` write.
#[no_mangle]
pub unsafe extern "C" fn simdist_compute(
    metric_id: u32,
    dtype_id: u32,
    a: *const c_void,
    b: *const c_void,
    n: usize,
    out: *mut f64,
) -> Status {
    if out.is_null() {
        return Status::InvalidArgument;
    }
    let result = compute_raw(metric_id, dtype_id, a, b, n);
    match &result {
        // SAFETY: `out` is non-null and valid for one write per the contract.
        Ok(value) => out.write(*value),
        Err(err) => tracing::trace!(error = %err, "simdist_compute rejected call"),
    }
    Status::from(&result)
}

unsafe fn compute_raw(
    metric_id: u32,
    dtype_id: u32,
    a: *const c_void,
    b: *const c_void,
    n: usize,
) -> Result<f64> {
    let metric = Metric::from_id(metric_id)
        .ok_or_else(|| Error::InvalidArgument(format!("unknown metric id {metric_id}")))?;
    let dtype = DataType::from_id(dtype_id)
        .ok_or_else(|| Error::InvalidArgument(format!("unknown dtype id {dtype_id}")))?;

    if !registry::is_supported(metric, dtype) {
        return Err(Error::Unsupported { metric, dtype });
    }

    let fits = n
        .checked_mul(dtype.size_of())
        .is_some_and(|bytes| isize::try_from(bytes).is_ok());
    if !fits {
        return Err(Error::InvalidArgument(format!(
            "{n} elements of {dtype} overflow the address space"
        )));
    }

    // SAFETY: forwarded caller contract; null and misaligned pointers are
    // rejected by `from_raw_parts`.
    let a = VectorView::from_raw_parts(dtype, a, n)
        .ok_or_else(|| Error::InvalidArgument("null or misaligned pointer for a".into()))?;
    let b = VectorView::from_raw_parts(dtype, b, n)
        .ok_or_else(|| Error::InvalidArgument("null or misaligned pointer for b".into()))?;

    dispatch::compute(metric, dtype, a, b, n)
}

/// Forces the published capability set (raw [`CapabilitySet`] bits).
///
/// The effective set is intersected with the probed hardware; it is returned
/// as raw bits.
#[no_mangle]
pub extern "C" fn simdist_override_capabilities(bits: u32) -> u32 {
    capability::override_capabilities(CapabilitySet::from_bits(bits)).bits()
}

/// Drops any override and re-publishes the probed hardware set.
#[no_mangle]
pub extern "C" fn simdist_reset_capabilities() -> u32 {
    capability::reset_capabilities().bits()
}

/// Raw bits of the currently published capability set.
#[no_mangle]
pub extern "C" fn simdist_capabilities() -> u32 {
    capability::detect().bits()
}
