//! Event system for playq
//!
//! Components communicate over a hybrid of:
//! - **EventBus** (tokio::broadcast): one-to-many notification fan-out
//! - **Completion channel** (tokio::mpsc): sink callback → controller loop
//! - **Shared state** (`Arc<RwLock<T>>`): read-heavy access
//!
//! Events are serializable so a front-end layer can forward them verbatim.

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Why the queue contents changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueChangeTrigger {
    Enqueue,
    Dequeue,
    Skip,
    Clear,
}

/// Notifications emitted by the controller and the track-change monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// A new playback session started
    TrackStarted {
        /// Canonical URL now bound to the audio session
        url: String,
        timestamp: DateTime<Utc>,
    },

    /// The monitor observed a source transition
    ///
    /// Carries best-effort metadata for the upcoming queue head so a
    /// front-end can render a "next track" notification.
    TrackChanged {
        /// Upcoming queue head
        url: String,
        /// Best-effort title (placeholder text on lookup failure)
        title: String,
        /// Best-effort thumbnail URI, if the platform has one
        thumbnail: Option<String>,
        /// Entries remaining in the queue
        queue_len: usize,
        timestamp: DateTime<Utc>,
    },

    /// Nothing is playing (emitted once per idle transition, not per tick)
    Idle { timestamp: DateTime<Utc> },

    /// Queue contents changed
    QueueChanged {
        /// Queue snapshot after the change
        queue: Vec<String>,
        trigger: QueueChangeTrigger,
        timestamp: DateTime<Utc>,
    },

    /// The queue drained and loop mode is off; playback stopped normally
    QueueFinished { timestamp: DateTime<Utc> },
}

/// Broadcast bus for [`PlayerEvent`]s.
///
/// Emission is lossy by design: a bus with no subscribers drops events
/// silently, and slow subscribers miss events rather than block playback.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event, ignoring the no-subscriber case.
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Event stream view for async consumers; lagged gaps are skipped.
    pub fn stream(&self) -> impl Stream<Item = PlayerEvent> {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|item| item.ok())
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
