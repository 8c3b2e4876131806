//! Error types for the TRUSTLOG audit core.
//!
//! All fallible operations in the audit pipeline return `TrustlogResult<T>`.
//! Error variants carry enough context for the caller to correct the request
//! or, for integrity violations, to locate the exact point of divergence.

use thiserror::Error;

/// The unified error type for the TRUSTLOG audit core.
#[derive(Debug, Error)]
pub enum TrustlogError {
    /// A malformed append or query request: missing required field,
    /// non-canonicalizable metadata, non-positive page size, inverted time
    /// range, or an unknown export column. Never partially applied.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// An append's assumed tail state was stale by commit time. Retried
    /// internally by the appender up to a bounded count; surfaced only when
    /// retries are exhausted.
    #[error("concurrent append conflict: {reason}")]
    ConcurrencyConflict { reason: String },

    /// The chain failed verification: a recomputed hash, prev-hash link, or
    /// sequence contiguity check did not match the stored data.
    ///
    /// Never auto-corrected — always surfaced with the first divergent
    /// sequence for investigation.
    #[error("integrity violation at sequence {sequence}: {reason}")]
    IntegrityViolation { sequence: u64, reason: String },

    /// A query or verification range references sequences beyond the current
    /// tail. Distinct from an empty result page.
    #[error("not found: {reason}")]
    NotFound { reason: String },

    /// A subscription observer fell behind the bounded backlog and was
    /// disconnected. The observer must re-subscribe and backfill the gap
    /// through the query engine.
    #[error("observer overran its backlog: {missed} entries missed")]
    ObserverOverrun { missed: u64 },

    /// The underlying store could not complete an operation.
    ///
    /// Treated as fatal for appends — an entry that cannot be persisted is
    /// never reported as committed.
    #[error("store operation failed: {reason}")]
    StoreFailed { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

/// Convenience alias used throughout the TRUSTLOG crates.
pub type TrustlogResult<T> = Result<T, TrustlogError>;
