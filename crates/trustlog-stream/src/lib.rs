//! # trustlog-stream
//!
//! Commit-order subscription fan-out for the TRUSTLOG audit core.
//!
//! The chain appender publishes every committed entry to a
//! [`LogBroadcaster`]; each [`LogObserver`] receives those entries in
//! commit order through an independent, bounded cursor. A slow observer
//! never blocks the appender — it is disconnected with an explicit overrun
//! signal instead.

pub mod fanout;

pub use fanout::{LogBroadcaster, LogObserver, DEFAULT_BACKLOG_CAPACITY};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use trustlog_contracts::{entry::LogEntry, error::TrustlogError};

    use super::LogBroadcaster;

    /// Build a minimal committed entry with the given sequence.
    fn make_entry(sequence: u64) -> Arc<LogEntry> {
        Arc::new(LogEntry {
            entry_id: uuid_like(sequence),
            sequence,
            occurred_at: Utc::now(),
            recorded_at: Utc::now(),
            actor_id: "user-1".to_string(),
            event_type: "login".to_string(),
            resource: None,
            resource_id: None,
            outcome: None,
            ip_address: None,
            user_agent: None,
            metadata: serde_json::Map::new(),
            prev_hash: LogEntry::GENESIS_HASH.to_string(),
            integrity_hash: format!("{:064x}", sequence),
        })
    }

    /// Deterministic UUID stand-in so entries are distinguishable.
    fn uuid_like(sequence: u64) -> uuid::Uuid {
        uuid::Uuid::from_u128(sequence as u128)
    }

    /// An observer registered before K publishes receives all K entries in
    /// strictly increasing sequence order.
    #[test]
    fn observer_receives_entries_in_commit_order() {
        let broadcaster = LogBroadcaster::with_capacity(64);
        let mut observer = broadcaster.subscribe();

        for seq in 1..=10 {
            broadcaster.publish(make_entry(seq));
        }

        let mut last = 0;
        for _ in 0..10 {
            let entry = observer.try_recv().unwrap().expect("entry pending");
            assert!(entry.sequence > last, "delivery must preserve commit order");
            last = entry.sequence;
        }
        assert_eq!(last, 10, "all published entries must arrive");
    }

    /// Publishing with no observers succeeds and reports zero deliveries.
    #[test]
    fn publish_without_observers_is_not_an_error() {
        let broadcaster = LogBroadcaster::new();
        assert_eq!(broadcaster.publish(make_entry(1)), 0);
    }

    /// A new observer starts at the moment of registration — it does not
    /// see entries committed before it subscribed.
    #[test]
    fn late_observer_does_not_replay_history() {
        let broadcaster = LogBroadcaster::with_capacity(64);
        broadcaster.publish(make_entry(1));
        broadcaster.publish(make_entry(2));

        let mut observer = broadcaster.subscribe();
        broadcaster.publish(make_entry(3));

        let entry = observer.try_recv().unwrap().expect("entry pending");
        assert_eq!(entry.sequence, 3);
        assert!(observer.try_recv().unwrap().is_none());
    }

    /// An observer that lags past the backlog bound is disconnected with an
    /// overrun signal, and stays disconnected until it re-subscribes.
    #[test]
    fn lagging_observer_is_disconnected_with_overrun() {
        let broadcaster = LogBroadcaster::with_capacity(4);
        let mut observer = broadcaster.subscribe();

        // Overrun the backlog without receiving anything.
        for seq in 1..=20 {
            broadcaster.publish(make_entry(seq));
        }

        let err = observer.try_recv().unwrap_err();
        match err {
            TrustlogError::ObserverOverrun { missed } => {
                assert!(missed > 0, "the gap must be signaled, never silent");
            }
            other => panic!("expected ObserverOverrun, got: {other}"),
        }
        assert!(observer.is_disconnected());

        // The disconnect is sticky — the observer cannot quietly resume.
        assert!(matches!(
            observer.try_recv(),
            Err(TrustlogError::ObserverOverrun { .. })
        ));

        // A fresh subscription starts clean.
        let mut fresh = broadcaster.subscribe();
        broadcaster.publish(make_entry(21));
        let entry = fresh.try_recv().unwrap().expect("entry pending");
        assert_eq!(entry.sequence, 21);
    }

    /// `recv` reports a clean end of stream when every broadcaster clone
    /// has been dropped.
    #[test]
    fn recv_reports_end_of_stream_after_publisher_drops() {
        let broadcaster = LogBroadcaster::with_capacity(8);
        let mut observer = broadcaster.subscribe();

        broadcaster.publish(make_entry(1));
        drop(broadcaster);

        assert_eq!(observer.recv().unwrap().unwrap().sequence, 1);
        assert!(observer.recv().unwrap().is_none(), "stream must end cleanly");
    }

    /// Every registered observer receives every entry independently.
    #[test]
    fn fanout_reaches_all_observers() {
        let broadcaster = LogBroadcaster::with_capacity(16);
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();
        assert_eq!(broadcaster.observer_count(), 2);

        let delivered = broadcaster.publish(make_entry(1));
        assert_eq!(delivered, 2);

        assert_eq!(a.try_recv().unwrap().unwrap().sequence, 1);
        assert_eq!(b.try_recv().unwrap().unwrap().sequence, 1);
    }
}
