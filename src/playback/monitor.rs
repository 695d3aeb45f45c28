//! Track-change monitor
//!
//! Periodic observer that turns state transitions into notifications: a
//! fresh audio source triggers a `TrackChanged` event describing the
//! upcoming queue head, and an idle player gets exactly one `Idle` event
//! per transition rather than one per tick. The monitor only reads shared
//! state; all mutation stays in the controller.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::metadata::CachedMetadata;
use crate::playback::queue::PlayQueue;
use crate::state::{PlayerMode, SharedState};

/// Default polling interval.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(2);

pub struct TrackMonitor {
    state: Arc<SharedState>,
    queue: Arc<Mutex<PlayQueue>>,
    metadata: Arc<CachedMetadata>,
    interval: Duration,
}

impl TrackMonitor {
    pub fn new(
        state: Arc<SharedState>,
        queue: Arc<Mutex<PlayQueue>>,
        metadata: Arc<CachedMetadata>,
        interval: Duration,
    ) -> Self {
        Self {
            state,
            queue,
            metadata,
            interval,
        }
    }

    /// Spawn the polling task. Runs until aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Track monitor started ({:?} interval)", self.interval);
            let mut ticker = tokio::time::interval(self.interval);
            // Observation state lives here, not in SharedState: it describes
            // what this task has seen, not what the player is doing.
            let mut last_observed: Option<Uuid> = None;
            let mut idle_emitted = false;

            loop {
                ticker.tick().await;
                self.observe(&mut last_observed, &mut idle_emitted).await;
            }
        })
    }

    async fn observe(&self, last_observed: &mut Option<Uuid>, idle_emitted: &mut bool) {
        let mode = self.state.mode().await;
        let source = self.state.active_source().await;

        if mode == PlayerMode::Idle || source.is_none() {
            if !*idle_emitted {
                debug!("Player went idle");
                self.state.broadcast_event(crate::events::PlayerEvent::Idle {
                    timestamp: Utc::now(),
                });
                *idle_emitted = true;
            }
            *last_observed = None;
            return;
        }
        *idle_emitted = false;

        if source == *last_observed {
            return;
        }
        *last_observed = source;

        let (head, queue_len) = {
            let queue = self.queue.lock().await;
            (queue.head().cloned(), queue.len())
        };
        let Some(head) = head else {
            debug!("Source changed, queue empty, nothing to announce");
            return;
        };

        let title = self.metadata.title_or_placeholder(&head).await;
        let thumbnail = self.metadata.thumbnail_opt(&head).await;
        self.state
            .broadcast_event(crate::events::PlayerEvent::TrackChanged {
                url: head.to_string(),
                title,
                thumbnail,
                queue_len,
                timestamp: Utc::now(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResolutionCache;
    use crate::error::Result;
    use crate::events::PlayerEvent;
    use crate::metadata::MetadataLookup;
    use crate::track::{CanonicalUrl, Platform};
    use async_trait::async_trait;

    struct StaticLookup;

    #[async_trait]
    impl MetadataLookup for StaticLookup {
        async fn title(&self, _track: &CanonicalUrl) -> Result<String> {
            Ok("Next Song".to_string())
        }

        async fn thumbnail(&self, _track: &CanonicalUrl) -> Result<Option<String>> {
            Ok(Some("https://img.example/next.jpg".to_string()))
        }
    }

    fn track(id: &str) -> CanonicalUrl {
        CanonicalUrl::new(
            format!("https://www.youtube.com/watch?v={id}"),
            Platform::Youtube,
        )
    }

    fn monitor_parts() -> (Arc<SharedState>, Arc<Mutex<PlayQueue>>, TrackMonitor) {
        let state = Arc::new(SharedState::new());
        let queue = Arc::new(Mutex::new(PlayQueue::new()));
        let metadata = Arc::new(CachedMetadata::new(
            Arc::new(StaticLookup),
            Arc::new(ResolutionCache::default()),
        ));
        let monitor = TrackMonitor::new(
            state.clone(),
            queue.clone(),
            metadata,
            DEFAULT_MONITOR_INTERVAL,
        );
        (state, queue, monitor)
    }

    #[tokio::test]
    async fn idle_event_emitted_once_per_transition() {
        let (state, _queue, monitor) = monitor_parts();
        let mut events = state.subscribe_events();
        let mut last_observed = None;
        let mut idle_emitted = false;

        monitor.observe(&mut last_observed, &mut idle_emitted).await;
        monitor.observe(&mut last_observed, &mut idle_emitted).await;
        monitor.observe(&mut last_observed, &mut idle_emitted).await;

        assert!(matches!(
            events.try_recv().unwrap(),
            PlayerEvent::Idle { .. }
        ));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn new_source_announces_queue_head() {
        let (state, queue, monitor) = monitor_parts();
        queue.lock().await.enqueue(vec![track("up-next")], false);
        state.set_mode(PlayerMode::Playing).await;
        state.set_active_source(Some(Uuid::new_v4())).await;

        let mut events = state.subscribe_events();
        let mut last_observed = None;
        let mut idle_emitted = false;
        monitor.observe(&mut last_observed, &mut idle_emitted).await;

        match events.try_recv().unwrap() {
            PlayerEvent::TrackChanged {
                url,
                title,
                thumbnail,
                queue_len,
                ..
            } => {
                assert_eq!(url, track("up-next").to_string());
                assert_eq!(title, "Next Song");
                assert_eq!(thumbnail.as_deref(), Some("https://img.example/next.jpg"));
                assert_eq!(queue_len, 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn same_source_announced_only_once() {
        let (state, queue, monitor) = monitor_parts();
        queue.lock().await.enqueue(vec![track("a")], false);
        state.set_mode(PlayerMode::Playing).await;
        state.set_active_source(Some(Uuid::new_v4())).await;

        let mut events = state.subscribe_events();
        let mut last_observed = None;
        let mut idle_emitted = false;
        monitor.observe(&mut last_observed, &mut idle_emitted).await;
        monitor.observe(&mut last_observed, &mut idle_emitted).await;

        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_queue_source_change_is_silent() {
        let (state, _queue, monitor) = monitor_parts();
        state.set_mode(PlayerMode::Playing).await;
        state.set_active_source(Some(Uuid::new_v4())).await;

        let mut events = state.subscribe_events();
        let mut last_observed = None;
        let mut idle_emitted = false;
        monitor.observe(&mut last_observed, &mut idle_emitted).await;

        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn idle_reemitted_after_playback_resumes_and_stops() {
        let (state, queue, monitor) = monitor_parts();
        let mut events = state.subscribe_events();
        let mut last_observed = None;
        let mut idle_emitted = false;

        // idle, then playing, then idle again
        monitor.observe(&mut last_observed, &mut idle_emitted).await;
        queue.lock().await.enqueue(vec![track("a")], false);
        state.set_mode(PlayerMode::Playing).await;
        state.set_active_source(Some(Uuid::new_v4())).await;
        monitor.observe(&mut last_observed, &mut idle_emitted).await;
        state.set_mode(PlayerMode::Idle).await;
        state.set_active_source(None).await;
        monitor.observe(&mut last_observed, &mut idle_emitted).await;

        let kinds: Vec<_> = std::iter::from_fn(|| events.try_recv().ok()).collect();
        assert!(matches!(kinds[0], PlayerEvent::Idle { .. }));
        assert!(matches!(kinds[1], PlayerEvent::TrackChanged { .. }));
        assert!(matches!(kinds[2], PlayerEvent::Idle { .. }));
    }
}
