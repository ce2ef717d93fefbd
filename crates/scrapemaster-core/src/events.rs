//! Live-update fan-out.
//!
//! Workers publish [`Event`]s to an [`EventBroadcaster`]; every connected
//! [`Subscription`] receives them in publish order. Delivery is best-effort:
//! a subscriber that falls more than `capacity` events behind skips the
//! oldest ones, and a dropped subscriber never affects the others.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use uuid::Uuid;

use crate::job::Job;
use crate::models::Record;

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Events pushed to live subscribers.
///
/// Serialized as internally-tagged JSON (`"type": "job_update"`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job state after a page was processed.
    JobUpdate { job: Job },

    /// Records extracted from one page.
    ScrapedItems {
        job_id: Uuid,
        items: Vec<Record>,
        page: u32,
        timestamp: DateTime<Utc>,
    },

    /// Human-readable progress line.
    Log {
        message: String,
        level: LogLevel,
        timestamp: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        job_id: Option<Uuid>,
    },

    /// The job exhausted its page range.
    JobComplete { job: Job, total_items: u64 },
}

impl Event {
    pub fn job_update(job: Job) -> Self {
        Event::JobUpdate { job }
    }

    pub fn scraped_items(job_id: Uuid, items: Vec<Record>, page: u32) -> Self {
        Event::ScrapedItems {
            job_id,
            items,
            page,
            timestamp: Utc::now(),
        }
    }

    pub fn log(level: LogLevel, message: impl Into<String>, job_id: Option<Uuid>) -> Self {
        Event::Log {
            message: message.into(),
            level,
            timestamp: Utc::now(),
            job_id,
        }
    }

    pub fn job_complete(job: Job) -> Self {
        let total_items = job.items_scraped;
        Event::JobComplete { job, total_items }
    }

    /// The job this event belongs to, if any.
    pub fn job_id(&self) -> Option<Uuid> {
        match self {
            Event::JobUpdate { job } | Event::JobComplete { job, .. } => Some(job.id),
            Event::ScrapedItems { job_id, .. } => Some(*job_id),
            Event::Log { job_id, .. } => *job_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::JobUpdate { .. } => "job_update",
            Event::ScrapedItems { .. } => "scraped_items",
            Event::Log { .. } => "log",
            Event::JobComplete { .. } => "job_complete",
        }
    }
}

/// Fan-out of [`Event`]s to every connected subscriber.
///
/// Cheap to clone; all clones share the same subscriber set.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<Event>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Connect a new subscriber. It sees only events published from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Deliver `event` to every connected subscriber.
    ///
    /// Returns how many subscribers it was queued for. Never fails: with no
    /// subscribers the event is simply dropped.
    pub fn broadcast(&self, event: Event) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(kind = event.kind(), "No subscribers, event dropped");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's view of the event stream (FIFO).
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Wait for the next event. Returns `None` once the broadcaster is gone.
    ///
    /// If this subscriber fell behind, the skipped events are logged and the
    /// stream resumes at the oldest event still buffered.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Subscriber lagged, events dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Leave the subscriber set.
    pub fn disconnect(self) {}
}
