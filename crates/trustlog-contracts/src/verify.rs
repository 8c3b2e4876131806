//! Verification report types.
//!
//! The integrity verifier replays a range of the chain and returns a
//! `VerificationOutcome`. A tampered chain is a *report*, not an error —
//! the operation itself succeeded; it is the chain that failed.

use serde::{Deserialize, Serialize};

/// How a chain range failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The recomputed hash of an entry's canonical encoding does not match
    /// its stored `integrity_hash`.
    HashMismatch,

    /// An entry's stored `prev_hash` does not equal its predecessor's
    /// (recomputed or checkpoint) hash.
    BrokenLink,

    /// A sequence value was skipped.
    SequenceGap,

    /// A sequence value appeared more than once.
    DuplicateSequence,
}

/// The first point at which a verified range diverged from its committed
/// state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityFault {
    /// The first `sequence` at which the divergence was detected.
    pub sequence: u64,

    /// The class of divergence.
    pub kind: FaultKind,

    /// Human-readable explanation for audit investigation.
    pub detail: String,
}

/// The result of replaying a chain range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationOutcome {
    /// Every entry in the range recomputed to its stored hash, every link
    /// held, and sequences were contiguous.
    Valid {
        /// Number of entries replayed.
        entries_checked: u64,

        /// The recomputed hash of the last entry in the range. Reusable as
        /// a trusted checkpoint for incremental re-verification.
        terminal_hash: String,
    },

    /// The range diverged from its committed state. `fault` identifies the
    /// first divergent sequence.
    Tampered {
        /// The first detected divergence.
        fault: IntegrityFault,
    },
}

impl VerificationOutcome {
    /// True when the range verified clean.
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationOutcome::Valid { .. })
    }

    /// The checkpoint hash, if the range verified clean.
    pub fn checkpoint(&self) -> Option<&str> {
        match self {
            VerificationOutcome::Valid { terminal_hash, .. } => Some(terminal_hash),
            VerificationOutcome::Tampered { .. } => None,
        }
    }
}
