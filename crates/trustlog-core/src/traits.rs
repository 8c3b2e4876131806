//! The storage trait seam of the audit core.
//!
//! `EntryStore` abstracts the durable, append-capable store the chain is
//! built on. The appender is the only writer; the query engine and the
//! verifier are read-only consumers. Implementations must never mutate or
//! delete a committed entry — the store is the append-only substrate the
//! whole trust model rests on.

use trustlog_contracts::{
    entry::{ChainTail, LogEntry},
    error::TrustlogResult,
};

/// An append-only store of committed log entries, keyed by `sequence`.
///
/// # Contract
///
/// - `insert` accepts an entry only when its `sequence` is exactly
///   `tail + 1` (or `1` for an empty store). A stale or duplicate sequence
///   must be rejected with `TrustlogError::ConcurrencyConflict` so the
///   appender can retry from a fresh tail.
/// - Committed entries are immutable. No update or delete operation exists.
/// - Readers only ever observe fully committed entries — a torn write must
///   never be visible.
pub trait EntryStore: Send + Sync {
    /// The current tail, or `None` for an empty chain.
    fn tail(&self) -> TrustlogResult<Option<ChainTail>>;

    /// Commit one entry at the tail, atomically.
    ///
    /// Rejects with `ConcurrencyConflict` when `entry.sequence` is not the
    /// next expected sequence.
    fn insert(&self, entry: &LogEntry) -> TrustlogResult<()>;

    /// All committed entries with `sequence` in the inclusive range
    /// `[from, to]`, in ascending sequence order.
    fn range(&self, from: u64, to: u64) -> TrustlogResult<Vec<LogEntry>>;

    /// Every committed entry, in ascending sequence order.
    ///
    /// The returned snapshot is a consistent prefix of the chain as of the
    /// moment the tail was read; appends that race with the call are simply
    /// not included.
    fn snapshot(&self) -> TrustlogResult<Vec<LogEntry>>;
}
