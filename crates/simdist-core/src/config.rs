//! Layered configuration for the dispatch engine.
//!
//! Sources are merged in priority order (lowest first):
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. `SIMDIST_`-prefixed environment variables, `__` separating sections
//!    (e.g. `SIMDIST_DISPATCH__WARMUP=true`)
//!
//! Loading never touches global state; call [`SimdistConfig::apply`] to
//! install the result.
//!
//! ```toml
//! [dispatch]
//! capabilities = ["serial", "haswell"]
//! warmup = true
//! ```

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::capability::{self, Capability, CapabilitySet};
use crate::dispatch;
use crate::error::{Error, Result};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SIMDIST_";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimdistConfig {
    /// Dispatch settings.
    pub dispatch: DispatchConfig,
}

/// `[dispatch]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Tiers to allow. `None` leaves the published set untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<Capability>>,
    /// Resolve every supported pair when the config is applied.
    pub warmup: bool,
}

impl SimdistConfig {
    /// Loads defaults, then `path` if given, then the environment.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::figment(path).extract().map_err(Error::from)
    }

    /// Loads from a TOML string layered over defaults (no environment).
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(content))
            .extract()
            .map_err(Error::from)
    }

    /// The merged provider chain, exposed for callers layering their own
    /// sources on top.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Capability set requested by this config, if any.
    #[must_use]
    pub fn requested_capabilities(&self) -> Option<CapabilitySet> {
        self.dispatch
            .capabilities
            .as_ref()
            .map(|caps| caps.iter().copied().collect())
    }

    /// Installs the configured override (if any) and warms up (if asked).
    ///
    /// Returns the capability set in effect afterwards.
    pub fn apply(&self) -> CapabilitySet {
        let effective = match self.requested_capabilities() {
            Some(requested) => {
                let effective = capability::override_capabilities(requested);
                for cap in requested.iter().filter(|cap| !effective.contains(*cap)) {
                    tracing::warn!(capability = %cap, "configured tier unavailable on this host");
                }
                effective
            }
            None => capability::detect(),
        };
        if self.dispatch.warmup {
            dispatch::warmup();
        }
        effective
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(Error::from)
    }
}
