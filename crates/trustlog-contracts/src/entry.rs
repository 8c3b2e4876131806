//! The committed log entry and chain tail types.
//!
//! `LogEntry` is the immutable unit of record — one security-relevant event,
//! hash-chained to its predecessor. Modifying any field of a committed entry
//! invalidates `integrity_hash` and every subsequent `prev_hash`, which the
//! verifier detects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Sentinel actor recorded when the event source has no authenticated
/// principal.
pub const ANONYMOUS_ACTOR: &str = "anonymous";

/// A single committed entry in a hash-chained audit log.
///
/// Constructed only by the chain appender; once committed, no field is ever
/// mutated or deleted. Corrections are modeled as new entries referencing
/// the original via `resource_id`, never as edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Stable unique identifier, assigned at commit. Used by correction
    /// entries and external references.
    pub entry_id: Uuid,

    /// Position in the chain. Contiguous and strictly increasing, starting
    /// at 1; defines the total order of the log.
    pub sequence: u64,

    /// When the event happened, per the event source's clock. May differ
    /// from `recorded_at` under clock skew; not trusted for ordering.
    pub occurred_at: DateTime<Utc>,

    /// When the appender committed the entry. Authoritative for ordering
    /// alongside `sequence`.
    pub recorded_at: DateTime<Utc>,

    /// The responsible principal, or [`ANONYMOUS_ACTOR`] if unauthenticated.
    pub actor_id: String,

    /// Indexed classification string, e.g. `"login"` or `"rule_update"`.
    pub event_type: String,

    /// The kind of object acted upon, e.g. `"scan"` or `"rule"`.
    pub resource: Option<String>,

    /// Identifier of the object acted upon.
    pub resource_id: Option<String>,

    /// Result classification, e.g. `"success"` or `"failure"`.
    pub outcome: Option<String>,

    /// Source address of the request that caused the event.
    pub ip_address: Option<String>,

    /// User agent of the request that caused the event.
    pub user_agent: Option<String>,

    /// Opaque, order-insensitive payload captured at event time. Keys are
    /// canonicalized (sorted) before hashing, so logically identical maps
    /// always hash identically.
    pub metadata: Map<String, Value>,

    /// `integrity_hash` of the immediately preceding entry, or
    /// [`LogEntry::GENESIS_HASH`] for the first entry of a chain.
    pub prev_hash: String,

    /// SHA-256 (hex) of this entry's canonical encoding.
    pub integrity_hash: String,
}

impl LogEntry {
    /// The sentinel `prev_hash` for the first entry in every chain.
    ///
    /// 64 hex zeros — a value that can never be the SHA-256 of real data,
    /// making genesis detection unambiguous.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// The committed tail of a chain: the last assigned sequence and its hash.
///
/// Read by the appender under its commit lock to assign the next entry's
/// `sequence` and `prev_hash` as one consistent pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTail {
    /// Sequence of the most recently committed entry.
    pub sequence: u64,

    /// `integrity_hash` of the most recently committed entry.
    pub integrity_hash: String,
}
