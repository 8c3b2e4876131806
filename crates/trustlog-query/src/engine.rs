//! The query engine: bounded, deterministic views over the committed chain.
//!
//! All supplied predicates are conjoined; ordering is total (the
//! `occurred_at` sort key is always tie-broken by `sequence`), so identical
//! filter and pagination input over an unchanged chain yields an identical
//! page. The engine performs no authorization — the caller's identity
//! provider decides who may see which scope before this code runs.

use std::sync::Arc;

use tracing::debug;

use trustlog_contracts::{
    entry::LogEntry,
    error::{TrustlogError, TrustlogResult},
    query::{LogPage, LogQuery, SortOrder},
};
use trustlog_core::traits::EntryStore;

/// Answers `LogQuery` requests against an `EntryStore`.
///
/// Read-only; runs fully concurrently with other readers and with ongoing
/// appends, observing only the committed prefix as of the snapshot read.
pub struct QueryEngine<S: EntryStore> {
    store: Arc<S>,
}

impl<S: EntryStore> QueryEngine<S> {
    /// Create an engine over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Execute `query` and return one page of results.
    ///
    /// Rejects a zero page size and an inverted time window up front. An
    /// offset beyond the filtered result set returns an empty page with
    /// the true total — not an error.
    pub fn query(&self, query: &LogQuery) -> TrustlogResult<LogPage> {
        validate_query(query)?;

        let mut matches: Vec<LogEntry> = self
            .store
            .snapshot()?
            .into_iter()
            .filter(|entry| matches_filters(entry, query))
            .collect();

        sort_entries(&mut matches, query.order);

        let total = matches.len();
        let entries: Vec<LogEntry> = matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();
        let has_more = query.offset + entries.len() < total;

        debug!(
            total,
            page_len = entries.len(),
            offset = query.offset,
            limit = query.limit,
            "query page served"
        );

        Ok(LogPage {
            entries,
            total,
            offset: query.offset,
            has_more,
        })
    }
}

fn validate_query(query: &LogQuery) -> TrustlogResult<()> {
    if query.limit == 0 {
        return Err(TrustlogError::Validation {
            reason: "limit must be at least 1".to_string(),
        });
    }
    if let (Some(from), Some(to)) = (query.occurred_from, query.occurred_to) {
        if from > to {
            return Err(TrustlogError::Validation {
                reason: format!("inverted time window: from {from} is after to {to}"),
            });
        }
    }
    Ok(())
}

/// All supplied predicates must hold (conjunction).
fn matches_filters(entry: &LogEntry, query: &LogQuery) -> bool {
    if let Some(event_type) = &query.event_type {
        if &entry.event_type != event_type {
            return false;
        }
    }
    if let Some(actor_id) = &query.actor_id {
        if &entry.actor_id != actor_id {
            return false;
        }
    }
    if let Some(resource) = &query.resource {
        if entry.resource.as_ref() != Some(resource) {
            return false;
        }
    }
    if let Some(outcome) = &query.outcome {
        if entry.outcome.as_ref() != Some(outcome) {
            return false;
        }
    }
    if let Some(from) = query.occurred_from {
        if entry.occurred_at < from {
            return false;
        }
    }
    if let Some(to) = query.occurred_to {
        if entry.occurred_at > to {
            return false;
        }
    }
    true
}

fn sort_entries(entries: &mut [LogEntry], order: SortOrder) {
    match order {
        SortOrder::NewestFirst => entries.sort_by(|a, b| {
            b.occurred_at
                .cmp(&a.occurred_at)
                .then_with(|| b.sequence.cmp(&a.sequence))
        }),
        SortOrder::OldestFirst => entries.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then_with(|| a.sequence.cmp(&b.sequence))
        }),
    }
}
