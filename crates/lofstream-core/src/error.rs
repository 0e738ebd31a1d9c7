//! Error types for `lofstream`.
//!
//! This module provides a unified error type for all engine operations.
//! Error codes follow the pattern `LOF-XXX` for easy debugging.

use thiserror::Error;

use crate::neighbors::ObjectId;

/// Result type alias for `lofstream` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a [`DistanceOracle`](crate::oracle::DistanceOracle).
///
/// Oracle failures are propagated unchanged through the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    /// The identifier was never registered with the oracle.
    #[error("object '{0}' is unknown to the oracle")]
    UnknownObject(ObjectId),

    /// A vector does not match the dimension fixed by the first insertion.
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// A vector is empty or carries non-finite components.
    #[error("invalid vector: {0}")]
    InvalidVector(String),
}

/// Errors that can occur in `lofstream` operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (LOF-001).
    #[error("[LOF-001] Configuration error: {0}")]
    Config(String),

    /// Structural inconsistency (LOF-002).
    ///
    /// The neighbor graph or score cache reached a state the insertion
    /// algorithm should never produce. Fatal.
    #[error("[LOF-002] Structural inconsistency: {0}")]
    StructuralInconsistency(String),

    /// Oracle error (LOF-003).
    #[error("[LOF-003] Oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Object inserted twice (LOF-004).
    #[error("[LOF-004] Object '{0}' has already been inserted")]
    DuplicateObject(ObjectId),

    /// Engine poisoned by an earlier failed insertion (LOF-005).
    #[error("[LOF-005] Engine poisoned by a failed insertion: {0}")]
    Poisoned(String),
}

impl Error {
    /// Returns the error code (e.g., "LOF-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "LOF-001",
            Self::StructuralInconsistency(_) => "LOF-002",
            Self::Oracle(_) => "LOF-003",
            Self::DuplicateObject(_) => "LOF-004",
            Self::Poisoned(_) => "LOF-005",
        }
    }

    /// Returns true if this error is recoverable.
    ///
    /// Structural inconsistencies and poisoned engines are not: the cached
    /// scores can no longer be trusted and the engine must be rebuilt.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::StructuralInconsistency(_) | Self::Poisoned(_))
    }

    pub(crate) fn structural(msg: impl Into<String>) -> Self {
        Self::StructuralInconsistency(msg.into())
    }
}

/// Conversion from configuration errors.
impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
