//! Kernel resolution and the single computation entry point.
//!
//! This module provides:
//! - [`resolve`] for memoized (metric, dtype) → kernel resolution
//! - [`compute`] / [`distance`] as the validated entry points
//! - [`compute_batch`] as a thin loop over the single-vector contract
//! - [`warmup`] for resolving every supported pair ahead of time
//!
//! The resolution cache is an immutable snapshot tied to one capability set,
//! published through an `ArcSwap`. Each (metric, dtype) slot is filled once
//! with a `OnceLock`, so readers never take a lock. Installing a capability
//! override swaps in a fresh, empty snapshot.

use std::fmt;
use std::ptr;
use std::sync::{Arc, OnceLock};

use arc_swap::{ArcSwap, Guard};

use crate::capability::{self, Capability, CapabilitySet};
use crate::error::{Error, Result};
use crate::registry::{self, KernelDescriptor};
use crate::types::{DataType, Metric, VectorView};

// =============================================================================
// Resolution cache
// =============================================================================

const SLOTS: usize = Metric::COUNT * DataType::COUNT;

#[inline]
fn slot_index(metric: Metric, dtype: DataType) -> usize {
    metric.id() as usize * DataType::COUNT + dtype.id() as usize
}

/// One immutable generation of the cache.
struct DispatchState {
    capabilities: CapabilitySet,
    resolved: [OnceLock<Option<&'static KernelDescriptor>>; SLOTS],
}

impl DispatchState {
    fn new(capabilities: CapabilitySet) -> Self {
        Self {
            capabilities,
            resolved: [const { OnceLock::new() }; SLOTS],
        }
    }

    fn resolve(&self, metric: Metric, dtype: DataType) -> Option<&'static KernelDescriptor> {
        *self.resolved[slot_index(metric, dtype)].get_or_init(|| {
            let chosen = registry::descriptors(metric, dtype)
                .into_iter()
                .find(|d| self.capabilities.contains(d.capability));
            if let Some(descriptor) = chosen {
                tracing::debug!(
                    %metric,
                    %dtype,
                    kernel = descriptor.name,
                    capability = %descriptor.capability,
                    width = descriptor.width,
                    "resolved kernel"
                );
            }
            chosen
        })
    }
}

static DISPATCH: OnceLock<ArcSwap<DispatchState>> = OnceLock::new();

fn cache() -> &'static ArcSwap<DispatchState> {
    DISPATCH.get_or_init(|| ArcSwap::from_pointee(DispatchState::new(capability::detect())))
}

/// Drops every memoized resolution. Called whenever the published
/// capability set changes.
pub(crate) fn invalidate() {
    if let Some(cache) = DISPATCH.get() {
        cache.store(Arc::new(DispatchState::new(capability::detect())));
    }
}

// =============================================================================
// Kernel handle
// =============================================================================

/// Handle on a resolved kernel.
///
/// Handles are only produced by [`resolve`], so the kernel's capability tier
/// is guaranteed to be present on the running CPU. Two handles compare equal
/// if and only if they refer to the same registry descriptor.
#[derive(Clone, Copy)]
pub struct Kernel(&'static KernelDescriptor);

impl Kernel {
    /// Registry descriptor behind this handle.
    #[must_use]
    pub fn descriptor(&self) -> &'static KernelDescriptor {
        self.0
    }

    /// `module::function` name of the kernel.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.0.name
    }

    /// Capability tier the kernel requires.
    #[must_use]
    pub fn capability(&self) -> Capability {
        self.0.capability
    }

    /// Elements per vector step.
    #[must_use]
    pub fn width(&self) -> usize {
        self.0.width
    }

    /// Metric computed by the kernel.
    #[must_use]
    pub fn metric(&self) -> Metric {
        self.0.metric
    }

    /// Element type consumed by the kernel.
    #[must_use]
    pub fn dtype(&self) -> DataType {
        self.0.dtype
    }

    /// Runs the kernel on two views of equal length and matching dtype.
    pub fn compute(&self, a: VectorView<'_>, b: VectorView<'_>) -> Result<f64> {
        check_views(self.dtype(), a, b, a.len())?;
        self.invoke(a, b)
    }

    fn invoke(self, a: VectorView<'_>, b: VectorView<'_>) -> Result<f64> {
        // SAFETY: the handle was resolved against a published capability set,
        // which is always a subset of the probed hardware; view lengths and
        // dtypes were validated by the caller.
        unsafe { self.0.func.call(a, b) }.ok_or_else(|| {
            Error::InvalidArgument(format!(
                "kernel {} expects {} views",
                self.0.name, self.0.dtype
            ))
        })
    }
}

impl PartialEq for Kernel {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.0, other.0)
    }
}

impl Eq for Kernel {}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("name", &self.0.name)
            .field("capability", &self.0.capability)
            .field("width", &self.0.width)
            .finish()
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Resolves the best kernel for `(metric, dtype)` under the published
/// capability set.
///
/// The first call for a pair filters the registry and memoizes the result;
/// later calls are a slot lookup. Repeated calls under an unchanged
/// capability set return the identical kernel.
pub fn resolve(metric: Metric, dtype: DataType) -> Result<Kernel> {
    let caps = capability::detect();
    let cache = cache();

    let state = cache.load();
    let descriptor = if state.capabilities == caps {
        state.resolve(metric, dtype)
    } else {
        let stale = Guard::into_inner(state);
        let fresh = Arc::new(DispatchState::new(caps));
        let descriptor = fresh.resolve(metric, dtype);
        // Only replace the generation we observed; a snapshot installed by a
        // concurrent override stays in place.
        let _ = cache.compare_and_swap(&stale, fresh);
        descriptor
    };

    descriptor
        .map(Kernel)
        .ok_or(Error::Unsupported { metric, dtype })
}

/// Computes `metric` over two views of `n` elements of `dtype`.
///
/// Validation order: unsupported pair, then length disagreement, then dtype
/// disagreement. For binary vectors `n` counts bytes.
pub fn compute(
    metric: Metric,
    dtype: DataType,
    a: VectorView<'_>,
    b: VectorView<'_>,
    n: usize,
) -> Result<f64> {
    let kernel = resolve(metric, dtype)?;
    check_views(dtype, a, b, n)?;
    kernel.invoke(a, b)
}

/// Convenience form of [`compute`] inferring dtype and length from `a`.
///
/// # Example
///
/// ```
/// use simdist_core::{distance, Metric};
///
/// let a = [1.0_f32, 2.0, 3.0];
/// let b = [4.0_f32, 5.0, 6.0];
/// assert_eq!(distance(Metric::InnerProduct, &a, &b).unwrap(), 32.0);
/// ```
pub fn distance<'a>(
    metric: Metric,
    a: impl Into<VectorView<'a>>,
    b: impl Into<VectorView<'a>>,
) -> Result<f64> {
    let (a, b) = (a.into(), b.into());
    compute(metric, a.dtype(), a, b, a.len())
}

/// Computes `metric` between `query` and every candidate, writing into `out`.
///
/// The kernel is resolved once for the whole batch. `out` must hold exactly
/// one slot per candidate. Every candidate is validated before the first
/// slot is written, so on error `out` is left untouched.
pub fn compute_batch(
    metric: Metric,
    query: VectorView<'_>,
    candidates: &[VectorView<'_>],
    out: &mut [f64],
) -> Result<()> {
    if out.len() != candidates.len() {
        return Err(Error::InvalidArgument(format!(
            "output holds {} slots for {} candidates",
            out.len(),
            candidates.len()
        )));
    }
    let dtype = query.dtype();
    let kernel = resolve(metric, dtype)?;
    for candidate in candidates {
        check_views(dtype, query, *candidate, query.len())?;
    }
    for (candidate, slot) in candidates.iter().zip(out.iter_mut()) {
        *slot = kernel.invoke(query, *candidate)?;
    }
    Ok(())
}

/// Resolves every supported pair so the first real call skips resolution.
///
/// Returns the number of pairs resolved.
pub fn warmup() -> usize {
    let mut resolved = 0;
    for (metric, dtype) in registry::supported_pairs() {
        if resolve(metric, dtype).is_ok() {
            resolved += 1;
        }
    }
    tracing::debug!(pairs = resolved, "dispatch cache warmed up");
    resolved
}

fn check_views(dtype: DataType, a: VectorView<'_>, b: VectorView<'_>, n: usize) -> Result<()> {
    if a.len() != n || b.len() != n {
        return Err(Error::LengthMismatch {
            a: a.len(),
            b: b.len(),
            n,
        });
    }
    if a.dtype() != dtype || b.dtype() != dtype {
        return Err(Error::InvalidArgument(format!(
            "expected {dtype} views, got {} and {}",
            a.dtype(),
            b.dtype()
        )));
    }
    Ok(())
}
