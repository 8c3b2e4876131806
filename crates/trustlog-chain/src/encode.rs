//! Canonical byte encoding and hashing.
//!
//! Every field that contributes to an entry's hash is framed explicitly so
//! nothing is accidentally omitted and no two fields can bleed into each
//! other. Strings are length-prefixed, never delimiter-based; optional
//! fields carry an explicit absence marker so "absent" and "empty string"
//! encode differently; metadata objects are walked with keys sorted
//! byte-lexicographically, making the encoding independent of insertion
//! order.
//!
//! Frame layout (bytes, in order):
//!   1.  chain_id            length-prefixed UTF-8
//!   2.  entry_id            length-prefixed UTF-8 (hyphenated lowercase)
//!   3.  sequence            8-byte little-endian
//!   4.  occurred_at         epoch microseconds, i64 little-endian
//!   5.  recorded_at         epoch microseconds, i64 little-endian
//!   6.  actor_id            length-prefixed UTF-8
//!   7.  event_type          length-prefixed UTF-8
//!   8.  resource            marker byte + optional payload
//!   9.  resource_id         marker byte + optional payload
//!   10. outcome             marker byte + optional payload
//!   11. ip_address          marker byte + optional payload
//!   12. user_agent          marker byte + optional payload
//!   13. metadata            tagged recursive encoding, sorted keys
//!   14. prev_hash           length-prefixed UTF-8 (64 ASCII hex chars)
//!
//! `integrity_hash` is excluded by construction — it is the output.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use trustlog_contracts::{
    entry::LogEntry,
    error::{TrustlogError, TrustlogResult},
};

/// Maximum nesting depth accepted in `metadata`.
///
/// Bounds the encoder's recursion; anything deeper is rejected as a
/// validation error before the store is touched.
pub const MAX_METADATA_DEPTH: usize = 32;

// Value tags for the metadata encoding.
const TAG_NULL: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_UINT: u8 = 0x03;
const TAG_FLOAT: u8 = 0x04;
const TAG_STRING: u8 = 0x05;
const TAG_ARRAY: u8 = 0x06;
const TAG_OBJECT: u8 = 0x07;

// Markers for optional fields.
const MARKER_ABSENT: u8 = 0x00;
const MARKER_PRESENT: u8 = 0x01;

/// Serialize an entry's logical fields into the canonical byte sequence.
///
/// Two entries with identical logical content always yield byte-identical
/// output, whatever the metadata insertion order — the property the
/// appender and the verifier both depend on.
///
/// Fails only on non-canonicalizable metadata (nesting beyond
/// [`MAX_METADATA_DEPTH`]).
pub fn canonical_bytes(chain_id: &str, entry: &LogEntry) -> TrustlogResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(256);

    put_str(&mut buf, chain_id);
    put_str(&mut buf, &entry.entry_id.to_string());
    buf.extend_from_slice(&entry.sequence.to_le_bytes());
    put_timestamp(&mut buf, entry.occurred_at.timestamp_micros());
    put_timestamp(&mut buf, entry.recorded_at.timestamp_micros());
    put_str(&mut buf, &entry.actor_id);
    put_str(&mut buf, &entry.event_type);
    put_opt_str(&mut buf, entry.resource.as_deref());
    put_opt_str(&mut buf, entry.resource_id.as_deref());
    put_opt_str(&mut buf, entry.outcome.as_deref());
    put_opt_str(&mut buf, entry.ip_address.as_deref());
    put_opt_str(&mut buf, entry.user_agent.as_deref());
    put_map(&mut buf, &entry.metadata, 1)?;
    put_str(&mut buf, &entry.prev_hash);

    Ok(buf)
}

/// Compute the SHA-256 integrity hash of an entry's canonical encoding.
///
/// Returns a lowercase 64-character hex string. The stored
/// `integrity_hash` field does not participate, so the function can be
/// applied unchanged to both candidate and committed entries.
pub fn hash_entry(chain_id: &str, entry: &LogEntry) -> TrustlogResult<String> {
    let bytes = canonical_bytes(chain_id, entry)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Check that `metadata` can be canonically encoded.
///
/// Used by the appender to reject a malformed request up front, before any
/// tail state is read.
pub fn validate_metadata(metadata: &Map<String, Value>) -> TrustlogResult<()> {
    for value in metadata.values() {
        check_depth(value, 2)?;
    }
    Ok(())
}

// ── Frame primitives ──────────────────────────────────────────────────────────

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn put_opt_str(buf: &mut Vec<u8>, s: Option<&str>) {
    match s {
        None => buf.push(MARKER_ABSENT),
        Some(s) => {
            buf.push(MARKER_PRESENT);
            put_str(buf, s);
        }
    }
}

fn put_timestamp(buf: &mut Vec<u8>, micros: i64) {
    buf.extend_from_slice(&micros.to_le_bytes());
}

// ── Metadata encoding ─────────────────────────────────────────────────────────

/// Encode an object with keys sorted byte-lexicographically.
///
/// Sorting is explicit rather than relying on map iteration order, so the
/// encoding stays canonical even if the underlying map type changes its
/// ordering guarantees.
fn put_map(buf: &mut Vec<u8>, map: &Map<String, Value>, depth: usize) -> TrustlogResult<()> {
    if depth > MAX_METADATA_DEPTH {
        return Err(depth_error());
    }

    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_unstable();

    buf.push(TAG_OBJECT);
    buf.extend_from_slice(&(keys.len() as u64).to_le_bytes());
    for key in keys {
        put_str(buf, key);
        put_value(buf, &map[key.as_str()], depth + 1)?;
    }
    Ok(())
}

fn put_value(buf: &mut Vec<u8>, value: &Value, depth: usize) -> TrustlogResult<()> {
    if depth > MAX_METADATA_DEPTH {
        return Err(depth_error());
    }

    match value {
        Value::Null => buf.push(TAG_NULL),

        Value::Bool(b) => {
            buf.push(TAG_BOOL);
            buf.push(u8::from(*b));
        }

        // Integers and floats carry distinct tags: 5 and 5.0 are different
        // logical values and must hash differently.
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                buf.push(TAG_INT);
                buf.extend_from_slice(&i.to_le_bytes());
            } else if let Some(u) = n.as_u64() {
                buf.push(TAG_UINT);
                buf.extend_from_slice(&u.to_le_bytes());
            } else {
                // serde_json numbers are i64, u64, or finite f64.
                let f = n.as_f64().unwrap_or(0.0);
                buf.push(TAG_FLOAT);
                buf.extend_from_slice(&f.to_bits().to_le_bytes());
            }
        }

        Value::String(s) => {
            buf.push(TAG_STRING);
            put_str(buf, s);
        }

        Value::Array(items) => {
            buf.push(TAG_ARRAY);
            buf.extend_from_slice(&(items.len() as u64).to_le_bytes());
            for item in items {
                put_value(buf, item, depth + 1)?;
            }
        }

        Value::Object(map) => put_map(buf, map, depth)?,
    }
    Ok(())
}

fn check_depth(value: &Value, depth: usize) -> TrustlogResult<()> {
    if depth > MAX_METADATA_DEPTH {
        return Err(depth_error());
    }
    match value {
        Value::Array(items) => {
            for item in items {
                check_depth(item, depth + 1)?;
            }
        }
        Value::Object(map) => {
            for nested in map.values() {
                check_depth(nested, depth + 1)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn depth_error() -> TrustlogError {
    TrustlogError::Validation {
        reason: format!("metadata nesting exceeds the depth bound of {MAX_METADATA_DEPTH}"),
    }
}
