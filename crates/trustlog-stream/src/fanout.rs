//! Broadcast fan-out of committed entries.
//!
//! One ordered stream of commit events, published by the chain appender.
//! Each observer holds an independent cursor into a bounded broadcast
//! channel. Publishing never blocks, whatever the observers are doing; an
//! observer that falls more than the backlog bound behind is disconnected
//! with an explicit overrun signal and must backfill through the query
//! engine before re-subscribing.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use trustlog_contracts::{
    entry::LogEntry,
    error::{TrustlogError, TrustlogResult},
};

/// Default bound on an observer's backlog.
pub const DEFAULT_BACKLOG_CAPACITY: usize = 1024;

/// The publish side of the commit stream.
///
/// Cheap to clone — clones share the same channel. The appender holds one
/// and calls [`publish`](LogBroadcaster::publish) after every successful
/// commit, outside its commit lock.
#[derive(Debug)]
pub struct LogBroadcaster {
    sender: broadcast::Sender<Arc<LogEntry>>,
    capacity: usize,
}

impl LogBroadcaster {
    /// Create a broadcaster with the default backlog bound.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BACKLOG_CAPACITY)
    }

    /// Create a broadcaster whose observers may lag at most `capacity`
    /// entries before being disconnected.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish one committed entry to every current observer.
    ///
    /// Never blocks. Returns the number of observers the entry was
    /// delivered to; zero observers is not an error.
    pub fn publish(&self, entry: Arc<LogEntry>) -> usize {
        trace!(sequence = entry.sequence, "publishing committed entry");

        match self.sender.send(entry) {
            Ok(count) => {
                debug!(observer_count = count, "entry published");
                count
            }
            Err(_) => {
                // No observers registered; the entry is already durable,
                // so nothing is lost.
                0
            }
        }
    }

    /// Register a new observer.
    ///
    /// The observer receives entries committed from this moment on; it is
    /// not obligated to replay history unless it backfills via the query
    /// engine first.
    pub fn subscribe(&self) -> LogObserver {
        LogObserver {
            receiver: self.sender.subscribe(),
            overrun: None,
        }
    }

    /// Number of currently registered observers.
    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// The backlog bound observers are held to.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LogBroadcaster {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            capacity: self.capacity,
        }
    }
}

/// One observer's cursor into the commit stream.
///
/// Entries arrive in strictly increasing sequence order. Dropping the
/// observer unregisters it. After an overrun the observer is permanently
/// disconnected: every further receive repeats
/// `TrustlogError::ObserverOverrun`, and the holder must subscribe afresh
/// and backfill the gap through the query engine.
pub struct LogObserver {
    receiver: broadcast::Receiver<Arc<LogEntry>>,
    /// Set once the observer overruns; holds the missed-entry count.
    overrun: Option<u64>,
}

impl LogObserver {
    /// Wait for the next committed entry.
    ///
    /// Returns `Ok(None)` when the publish side has shut down and all
    /// pending entries have been drained. Must not be called from inside
    /// an async runtime — it parks the calling thread.
    pub fn recv(&mut self) -> TrustlogResult<Option<Arc<LogEntry>>> {
        if let Some(missed) = self.overrun {
            return Err(TrustlogError::ObserverOverrun { missed });
        }

        match self.receiver.blocking_recv() {
            Ok(entry) => Ok(Some(entry)),
            Err(broadcast::error::RecvError::Closed) => Ok(None),
            Err(broadcast::error::RecvError::Lagged(missed)) => Err(self.disconnect(missed)),
        }
    }

    /// Take the next committed entry if one is already buffered.
    ///
    /// Returns `Ok(None)` when nothing is pending right now (or the
    /// publish side has shut down).
    pub fn try_recv(&mut self) -> TrustlogResult<Option<Arc<LogEntry>>> {
        if let Some(missed) = self.overrun {
            return Err(TrustlogError::ObserverOverrun { missed });
        }

        match self.receiver.try_recv() {
            Ok(entry) => Ok(Some(entry)),
            Err(broadcast::error::TryRecvError::Empty)
            | Err(broadcast::error::TryRecvError::Closed) => Ok(None),
            Err(broadcast::error::TryRecvError::Lagged(missed)) => Err(self.disconnect(missed)),
        }
    }

    /// True once this observer has been disconnected by an overrun.
    pub fn is_disconnected(&self) -> bool {
        self.overrun.is_some()
    }

    fn disconnect(&mut self, missed: u64) -> TrustlogError {
        warn!(missed, "observer overran its backlog; disconnecting");
        self.overrun = Some(missed);
        TrustlogError::ObserverOverrun { missed }
    }
}
