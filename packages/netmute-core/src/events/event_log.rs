//! Append-only diagnostic log with observable snapshots.
//!
//! The [`EventLog`] is the single record of what the monitor did and when.
//! Writers append from any thread; readers either take a [`LogSnapshot`] or
//! subscribe to a stream of snapshots that is fed on every append and clear.

use std::sync::Arc;

use futures::Stream;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::utils::{Clock, SystemClock};

/// A single timestamped diagnostic entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Position in the log since the last clear, starting at 0.
    pub id: u64,
    /// Local wall-clock time of the append, formatted `HH:MM:SS`.
    pub timestamp: String,
    /// Human-readable description of what happened.
    pub message: String,
}

/// Immutable point-in-time copy of the log's entries.
pub type LogSnapshot = Arc<[LogEntry]>;

struct LogState {
    snapshot: LogSnapshot,
    next_id: u64,
}

/// Thread-safe, append-only, observable event log.
///
/// # Concurrency design
///
/// One mutex covers "read counter, build entry, publish snapshot, increment
/// counter, broadcast" so ids are unique and dense and broadcast order matches
/// id order. Snapshots are swapped copy-on-write; a reader holding an older
/// snapshot is never affected by later writes.
pub struct EventLog {
    state: Mutex<LogState>,
    tx: broadcast::Sender<LogSnapshot>,
    clock: Arc<dyn Clock>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Creates an empty log stamped by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), EVENT_CHANNEL_CAPACITY)
    }

    /// Creates an empty log with a custom clock and broadcast capacity.
    ///
    /// A capacity of 0 is raised to 1 because `broadcast::channel` panics on 0.
    pub fn with_clock(clock: Arc<dyn Clock>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            state: Mutex::new(LogState {
                snapshot: Arc::from(Vec::new()),
                next_id: 0,
            }),
            tx,
            clock,
        }
    }

    /// Appends a message and returns the entry that was published.
    pub fn append(&self, message: impl Into<String>) -> LogEntry {
        let mut state = self.state.lock();

        let entry = LogEntry {
            id: state.next_id,
            timestamp: self.clock.now_hms(),
            message: message.into(),
        };

        let mut entries = Vec::with_capacity(state.snapshot.len() + 1);
        entries.extend_from_slice(&state.snapshot);
        entries.push(entry.clone());
        state.snapshot = Arc::from(entries);
        state.next_id += 1;

        self.publish(&state.snapshot);
        log::debug!("[EventLog] Log added: {}", entry.id);
        entry
    }

    /// Removes every entry and resets the id counter to 0.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.snapshot = Arc::from(Vec::new());
        state.next_id = 0;

        self.publish(&state.snapshot);
        log::debug!("[EventLog] Logs cleared");
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> LogSnapshot {
        Arc::clone(&self.state.lock().snapshot)
    }

    /// Returns the number of entries currently in the log.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().snapshot.len()
    }

    /// Returns true if the log holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribes to the log.
    ///
    /// The stream yields the current snapshot first, then one snapshot per
    /// later append or clear. It ends when the log is dropped. A subscriber
    /// that falls more than the channel capacity behind skips the oldest
    /// snapshots it missed and continues with the ones still retained.
    pub fn subscribe(&self) -> impl Stream<Item = LogSnapshot> + Send + 'static {
        // Both taken under the append lock: nothing is missed or repeated
        // between the initial snapshot and the first broadcast.
        let (initial, mut rx) = {
            let state = self.state.lock();
            (Arc::clone(&state.snapshot), self.tx.subscribe())
        };

        async_stream::stream! {
            yield initial;
            loop {
                match rx.recv().await {
                    Ok(snapshot) => yield snapshot,
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("[EventLog] Subscriber lagged, skipped {} snapshot(s)", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    fn publish(&self, snapshot: &LogSnapshot) {
        if let Err(e) = self.tx.send(Arc::clone(snapshot)) {
            log::trace!("[EventLog] No subscribers: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::FixedClock;
    use futures::StreamExt;
    use std::collections::HashSet;
    use std::thread;

    fn fixed_log() -> EventLog {
        EventLog::with_clock(Arc::new(FixedClock("08:15:00".into())), 16)
    }

    fn messages(snapshot: &LogSnapshot) -> Vec<&str> {
        snapshot.iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn append_assigns_sequential_ids_and_timestamp() {
        let log = fixed_log();

        let first = log.append("Network Lost");
        let second = log.append("Network Available: Home");

        assert_eq!(first.id, 0);
        assert_eq!(second.id, 1);
        assert_eq!(first.timestamp, "08:15:00");
        assert_eq!(log.len(), 2);
        assert_eq!(
            messages(&log.snapshot()),
            vec!["Network Lost", "Network Available: Home"]
        );
    }

    #[test]
    fn clear_resets_id_counter() {
        let log = fixed_log();
        log.append("a");
        log.append("b");

        log.clear();
        assert!(log.is_empty());

        let entry = log.append("after clear");
        assert_eq!(entry.id, 0);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn earlier_snapshots_are_unaffected_by_later_writes() {
        let log = fixed_log();
        log.append("first");
        let before = log.snapshot();

        log.append("second");
        log.clear();

        assert_eq!(messages(&before), vec!["first"]);
    }

    #[test]
    fn concurrent_appends_produce_unique_dense_ids() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 250;

        let log = Arc::new(fixed_log());
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        log.append(format!("thread {t} entry {i}"));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = log.snapshot();
        let total = (THREADS * PER_THREAD) as u64;
        assert_eq!(snapshot.len() as u64, total);

        let ids: HashSet<u64> = snapshot.iter().map(|e| e.id).collect();
        assert_eq!(ids, (0..total).collect::<HashSet<_>>());

        // Snapshot order follows id order because publishing happens under the lock.
        assert!(snapshot.windows(2).all(|w| w[0].id + 1 == w[1].id));
    }

    #[tokio::test]
    async fn subscribe_yields_current_snapshot_then_updates() {
        let log = fixed_log();
        log.append("before subscribe");

        let stream = log.subscribe();
        tokio::pin!(stream);

        let initial = stream.next().await.unwrap();
        assert_eq!(messages(&initial), vec!["before subscribe"]);

        log.append("after subscribe");
        let updated = stream.next().await.unwrap();
        assert_eq!(
            messages(&updated),
            vec!["before subscribe", "after subscribe"]
        );

        log.clear();
        let cleared = stream.next().await.unwrap();
        assert!(cleared.is_empty());
    }

    #[tokio::test]
    async fn independent_subscribers_each_see_every_update() {
        let log = fixed_log();

        let first = log.subscribe();
        let second = log.subscribe();
        tokio::pin!(first);
        tokio::pin!(second);

        log.append("one");
        log.append("two");

        for stream in [&mut first, &mut second] {
            let lengths: Vec<usize> = vec![
                stream.next().await.unwrap().len(),
                stream.next().await.unwrap().len(),
                stream.next().await.unwrap().len(),
            ];
            assert_eq!(lengths, vec![0, 1, 2]);
        }
    }

    #[tokio::test]
    async fn late_subscriber_starts_from_current_state() {
        let log = fixed_log();
        log.append("one");
        log.append("two");

        let late = log.subscribe();
        tokio::pin!(late);

        let initial = late.next().await.unwrap();
        assert_eq!(initial.len(), 2);

        log.append("three");
        let next = late.next().await.unwrap();
        assert_eq!(next.last().map(|e| e.id), Some(2));
    }

    #[tokio::test]
    async fn stream_ends_when_log_is_dropped() {
        let log = fixed_log();
        let stream = log.subscribe();
        tokio::pin!(stream);

        assert!(stream.next().await.is_some());
        drop(log);
        assert!(stream.next().await.is_none());
    }
}
