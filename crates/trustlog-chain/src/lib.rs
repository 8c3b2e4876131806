//! # trustlog-chain
//!
//! Canonical encoding, SHA-256 hash chaining, and integrity verification
//! for the TRUSTLOG audit core.
//!
//! ## Overview
//!
//! Every committed entry links to its predecessor via the SHA-256 hash of
//! a canonical byte encoding. Tampering with any field of any committed
//! entry — even a single byte — breaks the chain and is detected by
//! [`verify_chain`] at the exact sequence of the divergence.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trustlog_chain::{ChainAppender, MemoryChainStore, verify_chain};
//! use trustlog_contracts::request::AppendRequest;
//! use trustlog_stream::LogBroadcaster;
//!
//! let store = Arc::new(MemoryChainStore::new());
//! let appender = ChainAppender::new("tenant-acme", Arc::clone(&store), LogBroadcaster::new());
//!
//! let entry = appender.append(AppendRequest::new("login").actor("user-1"))?;
//! assert!(verify_chain("tenant-acme", store.as_ref())?.is_valid());
//! ```

pub mod appender;
pub mod encode;
pub mod memory;
pub mod verify;

pub use appender::{ChainAppender, DEFAULT_COMMIT_RETRIES};
pub use encode::{canonical_bytes, hash_entry, MAX_METADATA_DEPTH};
pub use memory::MemoryChainStore;
pub use verify::{verify_chain, verify_range};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use chrono::{DateTime, Duration, Utc};
    use serde_json::json;
    use uuid::Uuid;

    use trustlog_contracts::{
        entry::{ChainTail, LogEntry, ANONYMOUS_ACTOR},
        error::{TrustlogError, TrustlogResult},
        request::AppendRequest,
        verify::{FaultKind, VerificationOutcome},
    };
    use trustlog_core::traits::EntryStore;
    use trustlog_stream::LogBroadcaster;

    use super::{
        canonical_bytes, hash_entry, verify_chain, verify_range, ChainAppender, MemoryChainStore,
    };

    const CHAIN: &str = "test-chain";

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn fixture() -> (Arc<MemoryChainStore>, ChainAppender<MemoryChainStore>) {
        let store = Arc::new(MemoryChainStore::new());
        let appender = ChainAppender::new(CHAIN, Arc::clone(&store), LogBroadcaster::new());
        (store, appender)
    }

    /// Build a request with a distinguishable payload.
    fn make_request(event_type: &str, actor: &str) -> AppendRequest {
        AppendRequest::new(event_type)
            .actor(actor)
            .outcome("success")
            .meta("note", json!(format!("{event_type} by {actor}")))
    }

    /// A committed-looking entry with every commit-time field pinned, for
    /// encoder tests that need byte-for-byte reproducibility.
    fn pinned_entry(metadata: serde_json::Map<String, serde_json::Value>) -> LogEntry {
        let at = DateTime::<Utc>::from_timestamp(1_760_000_000, 0).unwrap();
        LogEntry {
            entry_id: Uuid::nil(),
            sequence: 1,
            occurred_at: at,
            recorded_at: at,
            actor_id: "user-1".to_string(),
            event_type: "login".to_string(),
            resource: None,
            resource_id: None,
            outcome: Some("success".to_string()),
            ip_address: None,
            user_agent: None,
            metadata,
            prev_hash: LogEntry::GENESIS_HASH.to_string(),
            integrity_hash: String::new(),
        }
    }

    // ── Chaining ──────────────────────────────────────────────────────────────

    /// Every committed entry's prev_hash equals its predecessor's
    /// integrity_hash, starting from the genesis sentinel.
    #[test]
    fn test_chain_linkage() {
        let (store, appender) = fixture();
        for i in 0..4 {
            appender.append(make_request("scan", &format!("user-{i}"))).unwrap();
        }

        let entries = store.snapshot().unwrap();
        assert_eq!(entries[0].prev_hash, LogEntry::GENESIS_HASH);
        for pair in entries.windows(2) {
            assert_eq!(
                pair[1].prev_hash, pair[0].integrity_hash,
                "prev_hash must equal the predecessor's integrity_hash"
            );
        }
    }

    /// Sequences are 1, 2, 3, … with no gaps or duplicates.
    #[test]
    fn test_sequences_contiguous() {
        let (store, appender) = fixture();
        for _ in 0..5 {
            appender.append(make_request("login", "user-1")).unwrap();
        }

        let sequences: Vec<u64> = store.snapshot().unwrap().iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    }

    /// The appender assigns commit-time fields: a fresh entry_id, a
    /// recorded_at stamp, and the anonymous actor fallback.
    #[test]
    fn test_append_assigns_commit_fields() {
        let (_store, appender) = fixture();

        let a = appender.append(make_request("login", "user-1")).unwrap();
        let b = appender.append(AppendRequest::new("probe")).unwrap();

        assert_ne!(a.entry_id, b.entry_id);
        assert_eq!(b.actor_id, ANONYMOUS_ACTOR);
        assert!(b.recorded_at >= a.recorded_at);
        assert_eq!(a.integrity_hash.len(), 64);
    }

    // ── Canonical encoding ────────────────────────────────────────────────────

    /// Metadata key insertion order does not change the canonical bytes.
    #[test]
    fn test_encoder_key_order_invariance() {
        let mut forward = serde_json::Map::new();
        forward.insert("alpha".to_string(), json!(1));
        forward.insert("beta".to_string(), json!({"x": [1, 2], "a": "y"}));

        let mut reversed = serde_json::Map::new();
        reversed.insert("beta".to_string(), json!({"a": "y", "x": [1, 2]}));
        reversed.insert("alpha".to_string(), json!(1));

        let a = canonical_bytes(CHAIN, &pinned_entry(forward)).unwrap();
        let b = canonical_bytes(CHAIN, &pinned_entry(reversed)).unwrap();
        assert_eq!(a, b, "identical logical content must encode identically");
    }

    /// An absent optional field and an empty string are different logical
    /// values and must encode differently.
    #[test]
    fn test_absent_and_empty_string_differ() {
        let absent = pinned_entry(serde_json::Map::new());
        let mut empty = pinned_entry(serde_json::Map::new());
        empty.resource = Some(String::new());

        let a = canonical_bytes(CHAIN, &absent).unwrap();
        let b = canonical_bytes(CHAIN, &empty).unwrap();
        assert_ne!(a, b);
    }

    /// The stored integrity_hash does not participate in its own
    /// computation, so hashing is stable across candidate and committed
    /// forms of the same entry.
    #[test]
    fn test_hash_ignores_stored_integrity_hash() {
        let mut entry = pinned_entry(serde_json::Map::new());
        let before = hash_entry(CHAIN, &entry).unwrap();
        entry.integrity_hash = before.clone();
        let after = hash_entry(CHAIN, &entry).unwrap();
        assert_eq!(before, after);
    }

    /// Integer and float metadata values hash differently even when
    /// numerically equal.
    #[test]
    fn test_int_and_float_are_distinct() {
        let mut int_meta = serde_json::Map::new();
        int_meta.insert("count".to_string(), json!(5));
        let mut float_meta = serde_json::Map::new();
        float_meta.insert("count".to_string(), json!(5.0));

        let a = canonical_bytes(CHAIN, &pinned_entry(int_meta)).unwrap();
        let b = canonical_bytes(CHAIN, &pinned_entry(float_meta)).unwrap();
        assert_ne!(a, b);
    }

    // ── Tamper detection ──────────────────────────────────────────────────────

    /// Flipping a stored outcome is reported at exactly that sequence.
    #[test]
    fn test_tamper_detection_flags_exact_sequence() {
        let (store, appender) = fixture();
        for _ in 0..4 {
            appender.append(make_request("login", "user-1")).unwrap();
        }

        store
            .simulate_tamper(2, |e| e.outcome = Some("failure".to_string()))
            .unwrap();

        match verify_chain(CHAIN, store.as_ref()).unwrap() {
            VerificationOutcome::Tampered { fault } => {
                assert_eq!(fault.sequence, 2, "divergence must be at the tampered entry");
                assert_eq!(fault.kind, FaultKind::HashMismatch);
            }
            VerificationOutcome::Valid { .. } => panic!("tampering must not verify clean"),
        }
    }

    /// Mutating any single field of a committed entry breaks verification
    /// at that entry's sequence, and at no earlier sequence.
    #[test]
    fn test_tamper_any_field_detected() {
        let mutators: Vec<(&str, fn(&mut LogEntry))> = vec![
            ("actor_id", |e| e.actor_id = "intruder".to_string()),
            ("event_type", |e| e.event_type = "noop".to_string()),
            ("occurred_at", |e| e.occurred_at = e.occurred_at + Duration::seconds(60)),
            ("metadata", |e| {
                e.metadata.insert("injected".to_string(), json!(true));
            }),
            ("resource", |e| e.resource = Some("scan".to_string())),
        ];

        for (field, mutate) in mutators {
            let (store, appender) = fixture();
            for _ in 0..3 {
                appender.append(make_request("review", "user-2")).unwrap();
            }
            store.simulate_tamper(2, mutate).unwrap();

            match verify_chain(CHAIN, store.as_ref()).unwrap() {
                VerificationOutcome::Tampered { fault } => {
                    assert_eq!(fault.sequence, 2, "field {field}: wrong divergence point");
                }
                VerificationOutcome::Valid { .. } => {
                    panic!("field {field}: tampering must be detected")
                }
            }
        }
    }

    /// A rewritten prev_hash is a broken link at that same sequence.
    #[test]
    fn test_tampered_prev_hash_is_broken_link() {
        let (store, appender) = fixture();
        for _ in 0..3 {
            appender.append(make_request("login", "user-1")).unwrap();
        }

        store
            .simulate_tamper(2, |e| e.prev_hash = "ff".repeat(32))
            .unwrap();

        match verify_chain(CHAIN, store.as_ref()).unwrap() {
            VerificationOutcome::Tampered { fault } => {
                assert_eq!(fault.sequence, 2);
                assert_eq!(fault.kind, FaultKind::BrokenLink);
            }
            VerificationOutcome::Valid { .. } => panic!("broken link must be detected"),
        }
    }

    /// Renumbering a committed entry surfaces as a gap or duplicate.
    #[test]
    fn test_resequencing_detected() {
        let (store, appender) = fixture();
        for _ in 0..4 {
            appender.append(make_request("login", "user-1")).unwrap();
        }

        store.simulate_tamper(2, |e| e.sequence = 9).unwrap();
        match verify_range(CHAIN, store.as_ref(), 1, 4, None).unwrap() {
            VerificationOutcome::Tampered { fault } => {
                assert_eq!(fault.sequence, 2);
                assert_eq!(fault.kind, FaultKind::SequenceGap);
            }
            VerificationOutcome::Valid { .. } => panic!("gap must be detected"),
        }

        let (store, appender) = fixture();
        for _ in 0..4 {
            appender.append(make_request("login", "user-1")).unwrap();
        }
        store.simulate_tamper(3, |e| e.sequence = 2).unwrap();
        match verify_range(CHAIN, store.as_ref(), 1, 4, None).unwrap() {
            VerificationOutcome::Tampered { fault } => {
                assert_eq!(fault.kind, FaultKind::DuplicateSequence);
            }
            VerificationOutcome::Valid { .. } => panic!("duplicate must be detected"),
        }
    }

    // ── Verification ranges & checkpoints ─────────────────────────────────────

    /// An empty chain is trivially valid; its checkpoint is the genesis
    /// sentinel.
    #[test]
    fn test_verify_empty_chain() {
        let store = MemoryChainStore::new();
        let outcome = verify_chain(CHAIN, &store).unwrap();
        assert!(outcome.is_valid());
        assert_eq!(outcome.checkpoint(), Some(LogEntry::GENESIS_HASH));
    }

    /// A prefix's terminal hash anchors incremental re-verification of the
    /// suffix.
    #[test]
    fn test_verify_range_with_checkpoint() {
        let (store, appender) = fixture();
        for _ in 0..6 {
            appender.append(make_request("scan", "user-3")).unwrap();
        }

        let prefix = verify_range(CHAIN, store.as_ref(), 1, 3, None).unwrap();
        let checkpoint = prefix.checkpoint().expect("prefix must verify").to_string();

        let suffix = verify_range(CHAIN, store.as_ref(), 4, 6, Some(&checkpoint)).unwrap();
        match suffix {
            VerificationOutcome::Valid { entries_checked, .. } => assert_eq!(entries_checked, 3),
            VerificationOutcome::Tampered { fault } => panic!("suffix must verify: {fault:?}"),
        }
    }

    /// A wrong checkpoint breaks the first link of the range.
    #[test]
    fn test_verify_range_bad_checkpoint() {
        let (store, appender) = fixture();
        for _ in 0..4 {
            appender.append(make_request("scan", "user-3")).unwrap();
        }

        let bogus = "ee".repeat(32);
        match verify_range(CHAIN, store.as_ref(), 3, 4, Some(&bogus)).unwrap() {
            VerificationOutcome::Tampered { fault } => {
                assert_eq!(fault.sequence, 3);
                assert_eq!(fault.kind, FaultKind::BrokenLink);
            }
            VerificationOutcome::Valid { .. } => panic!("bad checkpoint must not verify"),
        }
    }

    /// Ranges beyond the tail are NotFound — distinct from a tampered or
    /// empty result.
    #[test]
    fn test_verify_range_beyond_tail() {
        let (store, appender) = fixture();
        appender.append(make_request("login", "user-1")).unwrap();

        let err = verify_range(CHAIN, store.as_ref(), 1, 9, None).unwrap_err();
        assert!(matches!(err, TrustlogError::NotFound { .. }));
    }

    /// Inverted and zero-based ranges are rejected before any store read.
    #[test]
    fn test_verify_invalid_ranges_rejected() {
        let (store, appender) = fixture();
        appender.append(make_request("login", "user-1")).unwrap();

        assert!(matches!(
            verify_range(CHAIN, store.as_ref(), 3, 1, None).unwrap_err(),
            TrustlogError::Validation { .. }
        ));
        assert!(matches!(
            verify_range(CHAIN, store.as_ref(), 0, 1, None).unwrap_err(),
            TrustlogError::Validation { .. }
        ));
    }

    // ── Concurrency ───────────────────────────────────────────────────────────

    /// N concurrent appenders produce exactly the sequence set {1..N} and a
    /// chain that verifies clean.
    #[test]
    fn test_concurrent_appends_preserve_total_order() {
        let (store, appender) = fixture();

        std::thread::scope(|scope| {
            for t in 0..4 {
                let appender = &appender;
                scope.spawn(move || {
                    for i in 0..10 {
                        appender
                            .append(make_request("scan", &format!("worker-{t}-{i}")))
                            .unwrap();
                    }
                });
            }
        });

        let mut sequences: Vec<u64> =
            store.snapshot().unwrap().iter().map(|e| e.sequence).collect();
        sequences.sort_unstable();
        assert_eq!(sequences, (1..=40).collect::<Vec<u64>>());

        assert!(verify_chain(CHAIN, store.as_ref()).unwrap().is_valid());
    }

    // ── Request validation ────────────────────────────────────────────────────

    #[test]
    fn test_append_rejects_empty_event_type() {
        let (_store, appender) = fixture();
        let err = appender.append(AppendRequest::new("  ")).unwrap_err();
        assert!(matches!(err, TrustlogError::Validation { .. }));
    }

    #[test]
    fn test_append_rejects_bottomless_metadata() {
        let (store, appender) = fixture();

        let nested = (0..40).fold(json!(1), |acc, _| json!({ "n": acc }));
        let request = AppendRequest::new("login").meta("deep", nested);

        let err = appender.append(request).unwrap_err();
        assert!(matches!(err, TrustlogError::Validation { .. }));
        assert!(store.is_empty(), "a rejected request must not touch the store");
    }

    // ── Conflict retry ────────────────────────────────────────────────────────

    /// A store that rejects one commit with a stale-tail conflict is
    /// retried transparently.
    #[test]
    fn test_commit_retried_after_conflict() {
        let store = Arc::new(FlakyStore::failing(1));
        let appender = ChainAppender::new(CHAIN, Arc::clone(&store), LogBroadcaster::new());

        let entry = appender.append(make_request("login", "user-1")).unwrap();
        assert_eq!(entry.sequence, 1);
        assert_eq!(store.inner.len(), 1);
    }

    /// When every retry conflicts, the conflict surfaces to the caller.
    #[test]
    fn test_commit_retries_exhausted() {
        let store = Arc::new(FlakyStore::failing(u32::MAX));
        let appender = ChainAppender::new(CHAIN, Arc::clone(&store), LogBroadcaster::new());

        let err = appender.append(make_request("login", "user-1")).unwrap_err();
        assert!(matches!(err, TrustlogError::ConcurrencyConflict { .. }));
        assert!(store.inner.is_empty());
    }

    /// Each successful commit is published to the fan-out, in order.
    #[test]
    fn test_commit_publishes_to_stream() {
        let (_store, appender) = fixture();
        let mut observer = appender.stream().subscribe();

        for _ in 0..3 {
            appender.append(make_request("login", "user-1")).unwrap();
        }

        for expected in 1..=3u64 {
            let entry = observer.try_recv().unwrap().expect("entry pending");
            assert_eq!(entry.sequence, expected);
        }
    }

    /// Delegating store that fails the first `fail_count` inserts with a
    /// stale-tail conflict.
    struct FlakyStore {
        inner: MemoryChainStore,
        fail_remaining: AtomicU32,
    }

    impl FlakyStore {
        fn failing(fail_count: u32) -> Self {
            Self {
                inner: MemoryChainStore::new(),
                fail_remaining: AtomicU32::new(fail_count),
            }
        }
    }

    impl EntryStore for FlakyStore {
        fn tail(&self) -> TrustlogResult<Option<ChainTail>> {
            self.inner.tail()
        }

        fn insert(&self, entry: &LogEntry) -> TrustlogResult<()> {
            let remaining = self.fail_remaining.load(Ordering::SeqCst);
            if remaining > 0 {
                if remaining != u32::MAX {
                    self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
                }
                return Err(TrustlogError::ConcurrencyConflict {
                    reason: "simulated stale tail".to_string(),
                });
            }
            self.inner.insert(entry)
        }

        fn range(&self, from: u64, to: u64) -> TrustlogResult<Vec<LogEntry>> {
            self.inner.range(from, to)
        }

        fn snapshot(&self) -> TrustlogResult<Vec<LogEntry>> {
            self.inner.snapshot()
        }
    }
}
