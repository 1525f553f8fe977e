//! Error kinds for the memory engine (spec §7).
//!
//! Each variant corresponds to one of the error kinds in the error handling
//! design: most are surfaced to the caller, a few (`CacheUnavailable`,
//! `ProviderUnavailable`) are meant to be swallowed at the call site and only
//! ever logged, never propagated past the façade.

use std::time::Duration;

/// Result type used throughout the engine.
pub type Result<T> = std::result::Result<T, ContinuumError>;

/// Error kinds produced by the memory engine.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ContinuumError {
    /// Malformed input or an invalid enum value.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced entity, session, or intention is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// The requested operation is gated behind a federation tier.
    #[error("forbidden for current tier: {0}")]
    TenantForbidden(String),

    /// Tier-based rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// How long the caller should wait before retrying.
        retry_after: Duration,
    },

    /// Storage pool exhausted, disk full, or schema corruption.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The external cache is unreachable. Never surfaced to callers —
    /// constructed only so internal degrade-to-pass-through paths have a
    /// value to log.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// The embedding or neural-predictor provider failed. Callers fall back
    /// to the non-provider path; this variant exists for structured logging.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// An internal invariant was violated (e.g. a self-link was attempted).
    /// Never recovered silently.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The caller-supplied deadline expired before the operation completed.
    #[error("operation timed out")]
    TimedOut,
}

impl From<rusqlite::Error> for ContinuumError {
    fn from(err: rusqlite::Error) -> Self {
        ContinuumError::StorageUnavailable(err.to_string())
    }
}

impl From<r2d2::Error> for ContinuumError {
    fn from(err: r2d2::Error) -> Self {
        ContinuumError::StorageUnavailable(err.to_string())
    }
}
