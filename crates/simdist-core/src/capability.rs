//! Runtime CPU capability detection.
//!
//! The hardware is probed exactly once per process. The probed set is then
//! published through an atomic cell that every dispatch resolution reads.
//! Tests and benchmarks may install an override through
//! [`override_capabilities`]; an override is always intersected with the
//! probed hardware so it can lower the selected tier but never enable an
//! instruction set the CPU lacks.

use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// A hardware vector-instruction tier a kernel may require.
///
/// Variants are declared in ascending preference order; the derived `Ord` is
/// the tie-breaker used when sorting registry candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Portable scalar code. Always available.
    Serial,
    /// aarch64 Advanced SIMD (128-bit).
    Neon,
    /// x86-64 AVX2 + FMA + F16C + POPCNT (256-bit).
    Haswell,
    /// x86-64 AVX-512F (512-bit).
    Skylake,
}

impl Capability {
    /// All tiers, lowest first.
    pub const ALL: [Capability; 4] = [
        Capability::Serial,
        Capability::Neon,
        Capability::Haswell,
        Capability::Skylake,
    ];

    /// Bit of this tier inside a [`CapabilitySet`].
    #[must_use]
    pub const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Lowercase tier name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Neon => "neon",
            Self::Haswell => "haswell",
            Self::Skylake => "skylake",
        }
    }

    /// Parses a lowercase tier name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cap| cap.name() == name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable bitmask of available tiers. `Serial` is always a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilitySet(u32);

impl CapabilitySet {
    /// The universal baseline: scalar code only.
    pub const SERIAL: Self = Self(Capability::Serial.bit());

    const MASK: u32 = Capability::Serial.bit()
        | Capability::Neon.bit()
        | Capability::Haswell.bit()
        | Capability::Skylake.bit();

    /// Builds a set from raw bits. Unknown bits are dropped and `Serial` is
    /// always added.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self((bits & Self::MASK) | Capability::Serial.bit())
    }

    /// Raw bitmask.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if `cap` is a member.
    #[must_use]
    pub const fn contains(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    /// Returns a copy with `cap` added.
    #[must_use]
    pub const fn with(self, cap: Capability) -> Self {
        Self(self.0 | cap.bit())
    }

    /// Iterates the member tiers, lowest first.
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |cap| self.contains(*cap))
    }

    /// Highest member tier.
    #[must_use]
    pub fn best(self) -> Capability {
        self.iter().last().unwrap_or(Capability::Serial)
    }
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self::SERIAL
    }
}

impl BitAnd for CapabilitySet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self::from_bits(self.0 & rhs.0)
    }
}

impl BitOr for CapabilitySet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self::from_bits(self.0 | rhs.0)
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::SERIAL, CapabilitySet::with)
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for cap in self.iter() {
            if !first {
                f.write_str("+")?;
            }
            f.write_str(cap.name())?;
            first = false;
        }
        Ok(())
    }
}

// =============================================================================
// One-time probe and publication
// =============================================================================

/// Hardware probe result, computed once.
static HARDWARE: OnceLock<CapabilitySet> = OnceLock::new();

/// Published set. Zero means "not yet published"; a published set always
/// has the `Serial` bit so it can never be zero.
static PUBLISHED: AtomicU32 = AtomicU32::new(0);

/// Probes the running CPU. Never fails: anything inconclusive degrades to
/// the scalar baseline.
fn probe() -> CapabilitySet {
    if cfg!(miri) {
        return CapabilitySet::SERIAL;
    }

    #[allow(unused_mut)]
    let mut caps = CapabilitySet::SERIAL;

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2")
            && is_x86_feature_detected!("fma")
            && is_x86_feature_detected!("f16c")
            && is_x86_feature_detected!("popcnt")
        {
            caps = caps.with(Capability::Haswell);
        }
        if is_x86_feature_detected!("avx512f") {
            caps = caps.with(Capability::Skylake);
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("neon") {
            caps = caps.with(Capability::Neon);
        }
    }

    caps
}

/// Returns the probed hardware capabilities, ignoring any override.
///
/// Only the first call touches the hardware; every later call observes the
/// same value.
#[must_use]
pub fn hardware_capabilities() -> CapabilitySet {
    *HARDWARE.get_or_init(|| {
        let caps = probe();
        tracing::debug!(capabilities = %caps, "probed CPU capabilities");
        caps
    })
}

/// Returns the published capability set used by dispatch resolution.
///
/// This is the hardware probe unless an override is installed.
#[inline]
#[must_use]
pub fn detect() -> CapabilitySet {
    let bits = PUBLISHED.load(Ordering::Acquire);
    if bits != 0 {
        return CapabilitySet::from_bits(bits);
    }
    let caps = hardware_capabilities();
    // Only the first publisher wins; a concurrent override is kept.
    let _ = PUBLISHED.compare_exchange(0, caps.bits(), Ordering::AcqRel, Ordering::Acquire);
    CapabilitySet::from_bits(PUBLISHED.load(Ordering::Acquire))
}

/// Forces the capability set seen by dispatch resolution.
///
/// The effective set is `caps ∩ hardware ∪ {Serial}`. The dispatch cache is
/// invalidated so subsequent resolutions honour the new set. Returns the
/// effective set.
pub fn override_capabilities(caps: CapabilitySet) -> CapabilitySet {
    let hardware = hardware_capabilities();
    let effective = caps & hardware;
    if effective != caps {
        tracing::warn!(
            requested = %caps,
            hardware = %hardware,
            "requested capabilities exceed the hardware; clamping"
        );
    }
    PUBLISHED.store(effective.bits(), Ordering::Release);
    crate::dispatch::invalidate();
    tracing::info!(capabilities = %effective, "capability override installed");
    effective
}

/// Removes any override and re-publishes the hardware probe.
pub fn reset_capabilities() -> CapabilitySet {
    let hardware = hardware_capabilities();
    PUBLISHED.store(hardware.bits(), Ordering::Release);
    crate::dispatch::invalidate();
    tracing::info!(capabilities = %hardware, "capability override cleared");
    hardware
}
