//! The append request submitted by the event source.
//!
//! An `AppendRequest` carries every caller-supplied field of a future
//! `LogEntry`. The appender assigns the rest — `entry_id`, `sequence`,
//! `recorded_at`, `prev_hash`, `integrity_hash` — at commit time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A candidate audit event, as submitted by the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendRequest {
    /// When the event happened, per the event source's clock.
    pub occurred_at: DateTime<Utc>,

    /// The acting principal. `None` falls back to the anonymous sentinel
    /// at commit.
    pub actor_id: Option<String>,

    /// Required event classification, e.g. `"login"`.
    pub event_type: String,

    /// The kind of object acted upon.
    pub resource: Option<String>,

    /// Identifier of the object acted upon.
    pub resource_id: Option<String>,

    /// Result classification, e.g. `"success"`.
    pub outcome: Option<String>,

    /// Source address of the originating request.
    pub ip_address: Option<String>,

    /// User agent of the originating request.
    pub user_agent: Option<String>,

    /// Opaque key-value payload captured at event time.
    pub metadata: Map<String, Value>,
}

impl AppendRequest {
    /// Create a minimal request for `event_type` occurring now.
    ///
    /// All optional fields start absent and the metadata map empty.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            occurred_at: Utc::now(),
            actor_id: None,
            event_type: event_type.into(),
            resource: None,
            resource_id: None,
            outcome: None,
            ip_address: None,
            user_agent: None,
            metadata: Map::new(),
        }
    }

    /// Set the acting principal.
    pub fn actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Set the resource kind and identifier.
    pub fn resource(mut self, resource: impl Into<String>, resource_id: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Set the outcome classification.
    pub fn outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    /// Set the event-source timestamp.
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    /// Insert one metadata key-value pair.
    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
