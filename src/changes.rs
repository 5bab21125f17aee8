//! In-memory change feed. Clients long-poll `GET /changes?since=N` instead of
//! re-reading collections on a timer.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Teachers,
    Departments,
    Students,
    Exams,
    PublishedResults,
    Notifications,
    Documents,
    /// Every collection, e.g. after a snapshot restore
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
    Cleared,
    Restored,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub sequence: u64,
    pub collection: Collection,
    pub id: Option<String>,
    pub action: ChangeAction,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeBatch {
    pub events: Vec<ChangeEvent>,
    /// Highest sequence recorded so far; pass it back as `since`
    pub latest: u64,
    /// Events after `since` were dropped from the buffer; reload everything
    pub truncated: bool,
}

/// Bounded ring of recent changes plus a watch channel carrying the latest sequence.
pub struct ChangeFeed {
    capacity: usize,
    events: Mutex<VecDeque<ChangeEvent>>,
    latest: watch::Sender<u64>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (latest, _) = watch::channel(0);
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::new()),
            latest,
        }
    }

    /// Append an event and wake any waiters. Returns its sequence number.
    pub fn record(&self, collection: Collection, id: Option<&str>, action: ChangeAction) -> u64 {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let sequence = *self.latest.borrow() + 1;

        events.push_back(ChangeEvent {
            sequence,
            collection,
            id: id.map(str::to_string),
            action,
            at: Utc::now(),
        });
        while events.len() > self.capacity {
            events.pop_front();
        }

        self.latest.send_replace(sequence);
        sequence
    }

    pub fn latest(&self) -> u64 {
        *self.latest.borrow()
    }

    /// Events with a sequence greater than `since`.
    pub fn since(&self, since: u64) -> ChangeBatch {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let latest = *self.latest.borrow();

        // A cursor ahead of us comes from before a restart
        let truncated = since > latest
            || events
                .front()
                .is_some_and(|oldest| oldest.sequence > since + 1);

        ChangeBatch {
            events: events
                .iter()
                .filter(|e| e.sequence > since)
                .cloned()
                .collect(),
            latest,
            truncated,
        }
    }

    /// Like [`ChangeFeed::since`], but waits up to `timeout` for a change when
    /// there is nothing new yet.
    pub async fn wait_since(&self, since: u64, timeout: Duration) -> ChangeBatch {
        let mut receiver = self.latest.subscribe();

        let batch = self.since(since);
        if !batch.events.is_empty() || batch.truncated || timeout.is_zero() {
            return batch;
        }

        let _ = tokio::time::timeout(timeout, receiver.wait_for(|seq| *seq > since)).await;
        self.since(since)
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(1024)
    }
}
