//! In-memory implementation of `EntryStore`.
//!
//! `MemoryChainStore` is the reference store: a `Vec` of committed entries
//! behind a `Mutex`, safe to share between the appender and any number of
//! readers. Durable deployments swap in a store backed by a relational or
//! log-structured engine; the trait contract is identical.

use std::sync::Mutex;

use trustlog_contracts::{
    entry::{ChainTail, LogEntry},
    error::{TrustlogError, TrustlogResult},
};
use trustlog_core::traits::EntryStore;

/// An in-memory, append-only store of committed entries.
#[derive(Debug, Default)]
pub struct MemoryChainStore {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryChainStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// True when no entry has been committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutate a committed entry in place, bypassing the append-only
    /// contract.
    ///
    /// Exists to exercise tamper detection — tests and operator drills use
    /// it to simulate storage-level corruption and confirm the verifier
    /// reports the divergence. Nothing in the write path calls this.
    pub fn simulate_tamper(
        &self,
        sequence: u64,
        mutate: impl FnOnce(&mut LogEntry),
    ) -> TrustlogResult<()> {
        let mut entries = self.lock()?;
        let entry = entries
            .iter_mut()
            .find(|e| e.sequence == sequence)
            .ok_or_else(|| TrustlogError::NotFound {
                reason: format!("no entry at sequence {sequence}"),
            })?;
        mutate(entry);
        Ok(())
    }

    fn lock(&self) -> TrustlogResult<std::sync::MutexGuard<'_, Vec<LogEntry>>> {
        self.entries.lock().map_err(|e| TrustlogError::StoreFailed {
            reason: format!("store lock poisoned: {}", e),
        })
    }
}

impl EntryStore for MemoryChainStore {
    fn tail(&self) -> TrustlogResult<Option<ChainTail>> {
        let entries = self.lock()?;
        Ok(entries.last().map(|e| ChainTail {
            sequence: e.sequence,
            integrity_hash: e.integrity_hash.clone(),
        }))
    }

    /// Commit one entry, enforcing the next-sequence contract.
    ///
    /// The check-and-push happens under one lock acquisition, so readers
    /// never observe a torn tail.
    fn insert(&self, entry: &LogEntry) -> TrustlogResult<()> {
        let mut entries = self.lock()?;

        let expected = entries.last().map(|e| e.sequence + 1).unwrap_or(1);
        if entry.sequence != expected {
            return Err(TrustlogError::ConcurrencyConflict {
                reason: format!(
                    "expected sequence {expected}, got {} — tail moved since it was read",
                    entry.sequence
                ),
            });
        }

        entries.push(entry.clone());
        Ok(())
    }

    fn range(&self, from: u64, to: u64) -> TrustlogResult<Vec<LogEntry>> {
        let entries = self.lock()?;
        Ok(entries
            .iter()
            .filter(|e| e.sequence >= from && e.sequence <= to)
            .cloned()
            .collect())
    }

    fn snapshot(&self) -> TrustlogResult<Vec<LogEntry>> {
        let entries = self.lock()?;
        Ok(entries.clone())
    }
}
