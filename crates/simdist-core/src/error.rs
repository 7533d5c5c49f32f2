//! Error types and boundary status codes.

use thiserror::Error;

use crate::types::{DataType, Metric};

/// Errors reported by the dispatch boundary.
///
/// Kernels never fail; every error is raised by upfront validation before a
/// kernel is invoked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No kernel is registered for the requested combination.
    #[error("Unsupported metric/dtype combination: {metric} over {dtype}")]
    Unsupported {
        /// Requested metric.
        metric: Metric,
        /// Requested element type.
        dtype: DataType,
    },

    /// Buffers disagree with each other or with the declared length.
    #[error("Length mismatch: a has {a} elements, b has {b}, declared {n}")]
    LengthMismatch {
        /// Elements in the first buffer.
        a: usize,
        /// Elements in the second buffer.
        b: usize,
        /// Declared element count.
        n: usize,
    },

    /// Malformed caller input (unknown tag, null pointer, dtype disagreement).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be loaded or applied.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Status codes of the flat C boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The result was written.
    Ok = 0,
    /// No registry entry for the requested (metric, dtype) pair.
    UnsupportedMetricOrDtype = 1,
    /// Buffers inconsistent with the declared length.
    LengthMismatch = 2,
    /// Malformed pointers or tags.
    InvalidArgument = 3,
}

impl Error {
    /// Maps the error onto its boundary status code.
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Self::Unsupported { .. } => Status::UnsupportedMetricOrDtype,
            Self::LengthMismatch { .. } => Status::LengthMismatch,
            Self::InvalidArgument(_) | Self::Config(_) => Status::InvalidArgument,
        }
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl<T> From<&Result<T>> for Status {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(err) => err.status(),
        }
    }
}
