//! Chain integrity verification.
//!
//! Replays a committed range in ascending sequence order, recomputing each
//! entry's hash from its canonical encoding and the *recorded* `prev_hash`,
//! and confirming that linkage and sequence contiguity hold. The first
//! divergence wins — verification stops there and reports the exact
//! sequence, so an investigator knows precisely where the chain was cut.
//!
//! Verification is read-only. It is safe to run concurrently with ongoing
//! appends to later sequences, since it only reads a closed, committed
//! prefix.

use tracing::{debug, warn};

use trustlog_contracts::{
    entry::LogEntry,
    error::{TrustlogError, TrustlogResult},
    verify::{FaultKind, IntegrityFault, VerificationOutcome},
};
use trustlog_core::traits::EntryStore;

use crate::encode::hash_entry;

/// Verify the whole chain, genesis to tail.
///
/// An empty chain is trivially valid; its checkpoint is the genesis
/// sentinel.
pub fn verify_chain<S: EntryStore>(chain_id: &str, store: &S) -> TrustlogResult<VerificationOutcome> {
    match store.tail()? {
        None => Ok(VerificationOutcome::Valid {
            entries_checked: 0,
            terminal_hash: LogEntry::GENESIS_HASH.to_string(),
        }),
        Some(tail) => verify_range(chain_id, store, 1, tail.sequence, None),
    }
}

/// Verify the inclusive sequence range `[from, to]`.
///
/// `checkpoint` is a previously trusted hash for `from - 1`, enabling
/// incremental re-verification without replaying the prefix. Without a
/// checkpoint, a mid-chain range anchors on the stored hash of `from - 1`
/// — linkage inside the range is still fully checked.
///
/// Returns `NotFound` when the range reaches beyond the current tail, and
/// `Validation` for an inverted or zero-based range. A tampered chain is
/// reported as `Ok(VerificationOutcome::Tampered { .. })` — the check
/// itself succeeded; it is the chain that failed.
pub fn verify_range<S: EntryStore>(
    chain_id: &str,
    store: &S,
    from: u64,
    to: u64,
    checkpoint: Option<&str>,
) -> TrustlogResult<VerificationOutcome> {
    if from == 0 {
        return Err(TrustlogError::Validation {
            reason: "sequences start at 1; a range cannot begin at 0".to_string(),
        });
    }
    if from > to {
        return Err(TrustlogError::Validation {
            reason: format!("inverted range: from {from} is greater than to {to}"),
        });
    }

    let tail = store.tail()?.ok_or_else(|| TrustlogError::NotFound {
        reason: "chain is empty; the requested range does not exist".to_string(),
    })?;
    if to > tail.sequence {
        return Err(TrustlogError::NotFound {
            reason: format!("range end {to} is beyond the chain tail {}", tail.sequence),
        });
    }

    let mut expected_prev = anchor_hash(chain_id, store, from, checkpoint)?;
    let mut expected_seq = from;
    let entries = store.range(from, to)?;

    debug!(
        chain_id = %chain_id,
        from,
        to,
        count = entries.len(),
        "replaying chain range"
    );

    for entry in &entries {
        // Contiguity: the store must yield exactly the expected sequence.
        if entry.sequence != expected_seq {
            let fault = if entry.sequence < expected_seq {
                IntegrityFault {
                    sequence: entry.sequence,
                    kind: FaultKind::DuplicateSequence,
                    detail: format!(
                        "sequence {} appears after {} was already verified",
                        entry.sequence,
                        expected_seq - 1
                    ),
                }
            } else {
                IntegrityFault {
                    sequence: expected_seq,
                    kind: FaultKind::SequenceGap,
                    detail: format!(
                        "expected sequence {expected_seq}, found {}",
                        entry.sequence
                    ),
                }
            };
            return Ok(tampered(chain_id, fault));
        }

        // Linkage: the recorded prev_hash must equal the hash we arrived
        // with — recomputed for the predecessor, or the trusted anchor.
        if entry.prev_hash != expected_prev {
            return Ok(tampered(
                chain_id,
                IntegrityFault {
                    sequence: entry.sequence,
                    kind: FaultKind::BrokenLink,
                    detail: format!(
                        "stored prev_hash does not match the predecessor hash at sequence {}",
                        entry.sequence
                    ),
                },
            ));
        }

        // Hash correctness: recompute from the canonical encoding using
        // the recorded prev_hash and compare to the stored value.
        let recomputed = hash_entry(chain_id, entry)?;
        if recomputed != entry.integrity_hash {
            return Ok(tampered(
                chain_id,
                IntegrityFault {
                    sequence: entry.sequence,
                    kind: FaultKind::HashMismatch,
                    detail: format!(
                        "recomputed hash differs from stored integrity_hash at sequence {}",
                        entry.sequence
                    ),
                },
            ));
        }

        expected_prev = recomputed;
        expected_seq += 1;
    }

    // A range that ended early without a sequence mismatch means entries
    // are missing at the end of the range.
    if expected_seq != to + 1 {
        return Ok(tampered(
            chain_id,
            IntegrityFault {
                sequence: expected_seq,
                kind: FaultKind::SequenceGap,
                detail: format!("entries from sequence {expected_seq} to {to} are missing"),
            },
        ));
    }

    Ok(VerificationOutcome::Valid {
        entries_checked: entries.len() as u64,
        terminal_hash: expected_prev,
    })
}

/// The hash the first entry of the range must link to.
fn anchor_hash<S: EntryStore>(
    chain_id: &str,
    store: &S,
    from: u64,
    checkpoint: Option<&str>,
) -> TrustlogResult<String> {
    if from == 1 {
        return Ok(LogEntry::GENESIS_HASH.to_string());
    }
    if let Some(cp) = checkpoint {
        debug!(chain_id = %chain_id, from, "anchoring on trusted checkpoint");
        return Ok(cp.to_string());
    }

    let predecessor = store.range(from - 1, from - 1)?;
    predecessor
        .first()
        .map(|e| e.integrity_hash.clone())
        .ok_or_else(|| TrustlogError::NotFound {
            reason: format!("predecessor entry at sequence {} is missing", from - 1),
        })
}

fn tampered(chain_id: &str, fault: IntegrityFault) -> VerificationOutcome {
    warn!(
        chain_id = %chain_id,
        sequence = fault.sequence,
        kind = ?fault.kind,
        "chain failed verification"
    );
    VerificationOutcome::Tampered { fault }
}
