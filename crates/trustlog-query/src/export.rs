//! The export materializer: portable renderings of a query result.
//!
//! Purely a rendering step — row order and content arrive exactly as the
//! query engine produced them, and leave the same way. The only logic here
//! is column projection (validated up front; an unknown column is rejected,
//! never silently dropped) and format-correct escaping.

use serde_json::{Map, Value};

use trustlog_contracts::{
    entry::LogEntry,
    error::{TrustlogError, TrustlogResult},
};

/// Portable output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// RFC 4180-style CSV with a header row.
    Csv,
    /// A pretty-printed JSON array of projected objects.
    Json,
}

/// Every projectable column, in the canonical field order.
pub const COLUMNS: &[&str] = &[
    "entry_id",
    "sequence",
    "occurred_at",
    "recorded_at",
    "actor_id",
    "event_type",
    "resource",
    "resource_id",
    "outcome",
    "ip_address",
    "user_agent",
    "metadata",
    "prev_hash",
    "integrity_hash",
];

/// Render `entries` into `format`, projecting exactly `columns` in order.
///
/// Rejects an empty projection and any column name not in [`COLUMNS`].
pub fn materialize(
    entries: &[LogEntry],
    columns: &[String],
    format: ExportFormat,
) -> TrustlogResult<Vec<u8>> {
    validate_columns(columns)?;

    match format {
        ExportFormat::Csv => Ok(render_csv(entries, columns)),
        ExportFormat::Json => render_json(entries, columns),
    }
}

fn validate_columns(columns: &[String]) -> TrustlogResult<()> {
    if columns.is_empty() {
        return Err(TrustlogError::Validation {
            reason: "projection must name at least one column".to_string(),
        });
    }
    for column in columns {
        if !COLUMNS.contains(&column.as_str()) {
            return Err(TrustlogError::Validation {
                reason: format!("unknown export column '{column}'"),
            });
        }
    }
    Ok(())
}

// ── CSV ───────────────────────────────────────────────────────────────────────

fn render_csv(entries: &[LogEntry], columns: &[String]) -> Vec<u8> {
    let mut out = String::new();

    let header: Vec<String> = columns.iter().map(|c| csv_escape(c)).collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for entry in entries {
        let row: Vec<String> = columns
            .iter()
            .map(|c| csv_escape(&field_text(entry, c)))
            .collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out.into_bytes()
}

/// Quote a field when it contains a delimiter, quote, or line break;
/// embedded quotes are doubled.
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// The CSV cell text for one column. Absent optional fields render empty.
fn field_text(entry: &LogEntry, column: &str) -> String {
    match column {
        "entry_id" => entry.entry_id.to_string(),
        "sequence" => entry.sequence.to_string(),
        "occurred_at" => entry.occurred_at.to_rfc3339(),
        "recorded_at" => entry.recorded_at.to_rfc3339(),
        "actor_id" => entry.actor_id.clone(),
        "event_type" => entry.event_type.clone(),
        "resource" => entry.resource.clone().unwrap_or_default(),
        "resource_id" => entry.resource_id.clone().unwrap_or_default(),
        "outcome" => entry.outcome.clone().unwrap_or_default(),
        "ip_address" => entry.ip_address.clone().unwrap_or_default(),
        "user_agent" => entry.user_agent.clone().unwrap_or_default(),
        "metadata" => serde_json::to_string(&entry.metadata)
            .expect("a JSON map is always serializable"),
        "prev_hash" => entry.prev_hash.clone(),
        "integrity_hash" => entry.integrity_hash.clone(),
        // Unreachable: validate_columns runs first.
        _ => String::new(),
    }
}

// ── JSON ──────────────────────────────────────────────────────────────────────

fn render_json(entries: &[LogEntry], columns: &[String]) -> TrustlogResult<Vec<u8>> {
    let rows: Vec<Value> = entries
        .iter()
        .map(|entry| {
            let mut row = Map::new();
            for column in columns {
                row.insert(column.clone(), field_value(entry, column));
            }
            Value::Object(row)
        })
        .collect();

    serde_json::to_vec_pretty(&rows).map_err(|e| TrustlogError::Validation {
        reason: format!("failed to render JSON export: {}", e),
    })
}

/// The JSON value for one column. Absent optional fields render as null.
fn field_value(entry: &LogEntry, column: &str) -> Value {
    match column {
        "entry_id" => Value::String(entry.entry_id.to_string()),
        "sequence" => Value::from(entry.sequence),
        "occurred_at" => Value::String(entry.occurred_at.to_rfc3339()),
        "recorded_at" => Value::String(entry.recorded_at.to_rfc3339()),
        "actor_id" => Value::String(entry.actor_id.clone()),
        "event_type" => Value::String(entry.event_type.clone()),
        "resource" => opt_string(&entry.resource),
        "resource_id" => opt_string(&entry.resource_id),
        "outcome" => opt_string(&entry.outcome),
        "ip_address" => opt_string(&entry.ip_address),
        "user_agent" => opt_string(&entry.user_agent),
        "metadata" => Value::Object(entry.metadata.clone()),
        "prev_hash" => Value::String(entry.prev_hash.clone()),
        "integrity_hash" => Value::String(entry.integrity_hash.clone()),
        _ => Value::Null,
    }
}

fn opt_string(field: &Option<String>) -> Value {
    field
        .as_ref()
        .map(|s| Value::String(s.clone()))
        .unwrap_or(Value::Null)
}
