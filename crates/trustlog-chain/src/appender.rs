//! The chain appender: the single point of mutation for a chain's tail.
//!
//! All append requests funnel through one commit lock, so sequence
//! assignment and hash chaining are race-free. Stores that detect a stale
//! tail anyway (for example, a relational store with an external writer)
//! reject the insert with a conflict, and the appender retries the whole
//! commit from a fresh tail read — never resumes partway, so a forked
//! chain cannot occur.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use trustlog_contracts::{
    entry::{LogEntry, ANONYMOUS_ACTOR},
    error::{TrustlogError, TrustlogResult},
    request::AppendRequest,
};
use trustlog_core::{config::LogConfig, traits::EntryStore};
use trustlog_stream::LogBroadcaster;

use crate::encode::{hash_entry, validate_metadata};

/// Commit retry budget used when none is configured.
pub const DEFAULT_COMMIT_RETRIES: u32 = 3;

/// Appends entries to one chain partition, atomically and exactly once
/// per request.
///
/// The appender owns the commit critical section; reads (query, verify)
/// proceed concurrently against committed prefixes and are never blocked
/// by it. Successful commits are published to the subscription fan-out
/// after the store accepts them, off the critical path.
pub struct ChainAppender<S: EntryStore> {
    chain_id: String,
    store: Arc<S>,
    stream: LogBroadcaster,
    commit_retries: u32,
    commit_lock: Mutex<()>,
}

impl<S: EntryStore> ChainAppender<S> {
    /// Create an appender for the chain partition `chain_id`.
    pub fn new(chain_id: impl Into<String>, store: Arc<S>, stream: LogBroadcaster) -> Self {
        Self {
            chain_id: chain_id.into(),
            store,
            stream,
            commit_retries: DEFAULT_COMMIT_RETRIES,
            commit_lock: Mutex::new(()),
        }
    }

    /// Create an appender from operator configuration: the configured
    /// partition and retry budget, and a fan-out bounded per
    /// `config.stream`.
    pub fn from_config(config: &LogConfig, store: Arc<S>) -> Self {
        Self {
            chain_id: config.chain.partition.clone(),
            store,
            stream: LogBroadcaster::with_capacity(config.stream.backlog_capacity),
            commit_retries: config.chain.commit_retries,
            commit_lock: Mutex::new(()),
        }
    }

    /// The chain partition this appender serves.
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// The fan-out this appender publishes commits to.
    ///
    /// Observers subscribe here; see `trustlog-stream`.
    pub fn stream(&self) -> &LogBroadcaster {
        &self.stream
    }

    /// Commit `request` as the next link in the chain.
    ///
    /// Validates the request, then under the commit lock: reads the tail,
    /// assigns `entry_id`, `sequence`, `recorded_at`, and `prev_hash`,
    /// hashes the canonical encoding, and inserts — retrying the whole
    /// cycle from a fresh tail on a stale-tail conflict, up to the bounded
    /// retry budget.
    ///
    /// Returns the committed entry, including its assigned `sequence` and
    /// `integrity_hash`.
    pub fn append(&self, request: AppendRequest) -> TrustlogResult<LogEntry> {
        validate_request(&request)?;

        let _guard = self.commit_lock.lock().map_err(|e| TrustlogError::StoreFailed {
            reason: format!("commit lock poisoned: {}", e),
        })?;

        let mut attempt = 0;
        loop {
            let entry = self.build_candidate(&request)?;

            match self.store.insert(&entry) {
                Ok(()) => {
                    info!(
                        chain_id = %self.chain_id,
                        sequence = entry.sequence,
                        event_type = %entry.event_type,
                        actor_id = %entry.actor_id,
                        "audit entry committed"
                    );

                    // Commit is durable; notification follows outside the
                    // critical path and never blocks on observers.
                    self.stream.publish(Arc::new(entry.clone()));

                    return Ok(entry);
                }

                Err(TrustlogError::ConcurrencyConflict { reason }) if attempt < self.commit_retries => {
                    attempt += 1;
                    warn!(
                        chain_id = %self.chain_id,
                        attempt,
                        reason = %reason,
                        "stale tail at commit; retrying from a fresh tail read"
                    );
                }

                Err(TrustlogError::ConcurrencyConflict { .. }) => {
                    return Err(TrustlogError::ConcurrencyConflict {
                        reason: format!(
                            "commit retries exhausted after {} attempts",
                            self.commit_retries + 1
                        ),
                    });
                }

                Err(e) => return Err(e),
            }
        }
    }

    /// Read the current tail and materialize the candidate entry for it.
    fn build_candidate(&self, request: &AppendRequest) -> TrustlogResult<LogEntry> {
        let (sequence, prev_hash) = match self.store.tail()? {
            Some(tail) => (tail.sequence + 1, tail.integrity_hash),
            None => (1, LogEntry::GENESIS_HASH.to_string()),
        };

        debug!(
            chain_id = %self.chain_id,
            sequence,
            "building candidate entry"
        );

        let mut entry = LogEntry {
            entry_id: Uuid::new_v4(),
            sequence,
            occurred_at: request.occurred_at,
            recorded_at: Utc::now(),
            actor_id: request
                .actor_id
                .clone()
                .unwrap_or_else(|| ANONYMOUS_ACTOR.to_string()),
            event_type: request.event_type.clone(),
            resource: request.resource.clone(),
            resource_id: request.resource_id.clone(),
            outcome: request.outcome.clone(),
            ip_address: request.ip_address.clone(),
            user_agent: request.user_agent.clone(),
            metadata: request.metadata.clone(),
            prev_hash,
            integrity_hash: String::new(),
        };
        entry.integrity_hash = hash_entry(&self.chain_id, &entry)?;

        Ok(entry)
    }
}

/// Reject a malformed request before any tail state is read.
fn validate_request(request: &AppendRequest) -> TrustlogResult<()> {
    if request.event_type.trim().is_empty() {
        return Err(TrustlogError::Validation {
            reason: "event_type must not be empty".to_string(),
        });
    }
    if let Some(actor) = &request.actor_id {
        if actor.trim().is_empty() {
            return Err(TrustlogError::Validation {
                reason: "actor_id, when supplied, must not be empty".to_string(),
            });
        }
    }
    validate_metadata(&request.metadata)
}
