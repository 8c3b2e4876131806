//! Query contract: filters, ordering, and pagination.
//!
//! `LogQuery` is the one input the query engine accepts. All supplied
//! predicates are conjoined; ordering is explicit so that identical input
//! over an unchanged chain always produces an identical page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::LogEntry;

/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Explicit result ordering.
///
/// Ties on `occurred_at` are always broken by `sequence` in the same
/// direction, so ordering is total and reproducible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Descending `occurred_at`, ties by descending `sequence`. The default
    /// presentation order for audit views.
    #[default]
    NewestFirst,

    /// Ascending `occurred_at`, ties by ascending `sequence`.
    OldestFirst,
}

/// A bounded, deterministic question over the committed chain.
///
/// Every filter is optional; supplied filters are ANDed together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogQuery {
    /// Exact match on `event_type`.
    pub event_type: Option<String>,

    /// Exact match on `actor_id`.
    pub actor_id: Option<String>,

    /// Exact match on `resource`.
    pub resource: Option<String>,

    /// Exact match on `outcome`.
    pub outcome: Option<String>,

    /// Inclusive lower bound on `occurred_at`.
    pub occurred_from: Option<DateTime<Utc>>,

    /// Inclusive upper bound on `occurred_at`.
    pub occurred_to: Option<DateTime<Utc>>,

    /// Maximum page size. Must be at least 1.
    pub limit: usize,

    /// Number of matching entries to skip. An offset beyond the result set
    /// yields an empty page, not an error.
    pub offset: usize,

    /// Result ordering.
    pub order: SortOrder,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            event_type: None,
            actor_id: None,
            resource: None,
            outcome: None,
            occurred_from: None,
            occurred_to: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
            order: SortOrder::default(),
        }
    }
}

impl LogQuery {
    /// An unfiltered query with the default page size and ordering.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on `event_type`.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Filter on `actor_id`.
    pub fn actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Filter on `outcome`.
    pub fn outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    /// Restrict `occurred_at` to the inclusive window `[from, to]`.
    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.occurred_from = Some(from);
        self.occurred_to = Some(to);
        self
    }

    /// Set page size and offset.
    pub fn page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

/// One page of query results plus the pagination metadata needed to page
/// further.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogPage {
    /// The matching entries, in the requested order, at most `limit` long.
    pub entries: Vec<LogEntry>,

    /// Total number of entries matching the filters, across all pages.
    pub total: usize,

    /// The offset this page was taken at.
    pub offset: usize,

    /// True when entries matching the filters exist beyond this page.
    pub has_more: bool,
}
