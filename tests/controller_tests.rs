//! End-to-end playback flows with scripted resolver/sink/prober fakes.
//! No network, no audio device; tracks enter through the validator the same
//! way user input does.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use playq::cache::ResolutionCache;
use playq::metadata::{CachedMetadata, MediaProbe, MetadataLookup};
use playq::playback::{PlaybackController, TrackMonitor};
use playq::resolver::{
    AudioSink, Completion, CompletionSender, ProtocolHint, ResolvedStream, StreamResolver,
    TransportOptions,
};
use playq::validate::UrlProber;
use playq::{
    CanonicalUrl, Error, PlayerEvent, PlayerMode, Result, SharedState, Validator,
};

struct PassingProber;

#[async_trait]
impl UrlProber for PassingProber {
    async fn resolve_redirect(&self, url: &str) -> Result<String> {
        Ok(url.to_string())
    }

    async fn thumbnail_exists(&self, _video_id: &str) -> Result<bool> {
        Ok(true)
    }

    async fn is_premium_only(&self, _url: &str) -> Result<bool> {
        Ok(false)
    }
}

struct PassingExtractor;

#[async_trait]
impl MediaProbe for PassingExtractor {
    async fn probe_title(&self, _url: &str) -> Result<String> {
        Ok("A clip".to_string())
    }
}

struct StaticLookup;

#[async_trait]
impl MetadataLookup for StaticLookup {
    async fn title(&self, _track: &CanonicalUrl) -> Result<String> {
        Ok("Up Next".to_string())
    }

    async fn thumbnail(&self, _track: &CanonicalUrl) -> Result<Option<String>> {
        Ok(None)
    }
}

struct ScriptedResolver {
    /// Canonical URLs whose resolution should fail
    failing: Vec<String>,
}

#[async_trait]
impl StreamResolver for ScriptedResolver {
    async fn resolve(&self, track: &CanonicalUrl) -> Result<ResolvedStream> {
        if self.failing.iter().any(|u| u == track.as_str()) {
            return Err(Error::Internal("extractor gave nothing".to_string()));
        }
        Ok(ResolvedStream {
            stream_uri: format!("{}#stream", track.as_str()),
            protocol: ProtocolHint::Direct,
            codec: Some("opus".to_string()),
            session: None,
        })
    }
}

#[derive(Default)]
struct RecordingSink {
    active: Mutex<Option<(Uuid, CompletionSender)>>,
    started: Mutex<Vec<String>>,
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn start(
        &self,
        stream_uri: &str,
        _options: &TransportOptions,
        completion: CompletionSender,
    ) -> Result<Uuid> {
        let session = Uuid::new_v4();
        self.started.lock().await.push(stream_uri.to_string());
        *self.active.lock().await = Some((session, completion));
        Ok(session)
    }

    async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }

    async fn stop(&self) {
        if let Some((session, tx)) = self.active.lock().await.take() {
            let _ = tx.send(Completion::Finished { session });
        }
    }
}

fn validator() -> Validator {
    Validator::new(
        Arc::new(PassingProber),
        Arc::new(PassingExtractor),
        Arc::new(ResolutionCache::default()),
    )
}

fn engine(failing: Vec<String>) -> (Arc<SharedState>, Arc<PlaybackController>, Arc<RecordingSink>) {
    // RUST_LOG-driven diagnostics for failing runs; repeated init is a no-op
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let state = Arc::new(SharedState::new());
    let sink = Arc::new(RecordingSink::default());
    let controller = Arc::new(PlaybackController::new(
        state.clone(),
        Arc::new(ScriptedResolver { failing }),
        sink.clone(),
    ));
    (state, controller, sink)
}

async fn validated(urls: &[&str]) -> Vec<CanonicalUrl> {
    let raw: Vec<String> = urls.iter().map(|s| s.to_string()).collect();
    let result = validator().validate(&raw).await;
    assert!(result.rejected.is_empty(), "rejected: {:?}", result.rejected);
    result.accepted
}

async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition().await {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn tracks_play_through_in_fifo_order() {
    let (_state, controller, sink) = engine(vec![]);
    let _loop_handle = controller.start();
    let tracks = validated(&["https://youtu.be/first", "https://youtu.be/second"]).await;
    controller.enqueue(tracks, false).await;
    controller.play_next().await.unwrap();

    sink.stop().await; // first track ends
    wait_until(|| async {
        controller.now_playing().await.map(|t| t.as_str().to_string())
            == Some("https://www.youtube.com/watch?v=second".to_string())
    })
    .await;

    sink.stop().await; // second track ends, queue empty
    wait_until(|| async { controller.mode().await == PlayerMode::Idle }).await;
    assert_eq!(
        sink.started.lock().await.as_slice(),
        &[
            "https://www.youtube.com/watch?v=first#stream".to_string(),
            "https://www.youtube.com/watch?v=second#stream".to_string(),
        ]
    );
}

#[tokio::test]
async fn interrupt_enqueue_plays_before_earlier_entries() {
    let (_state, controller, _sink) = engine(vec![]);
    let tracks = validated(&["https://youtu.be/a", "https://youtu.be/b"]).await;
    controller.enqueue(tracks, false).await;
    let urgent = validated(&["https://youtu.be/urgent"]).await;
    controller.enqueue(urgent, true).await;

    let playing = controller.play_next().await.unwrap();
    assert_eq!(playing.as_str(), "https://www.youtube.com/watch?v=urgent");
    assert_eq!(controller.queue_len().await, 2);
}

#[tokio::test]
async fn skip_past_end_drains_queue_and_goes_idle() {
    let (_state, controller, sink) = engine(vec![]);
    let _loop_handle = controller.start();
    let tracks = validated(&["https://youtu.be/a", "https://youtu.be/b"]).await;
    controller.enqueue(tracks, false).await;
    controller.play_next().await.unwrap();

    // skip the current track plus far more than the queue holds
    controller.skip_current(10).await.unwrap();
    wait_until(|| async { controller.mode().await == PlayerMode::Idle }).await;
    assert_eq!(controller.queue_len().await, 0);
    assert!(!sink.is_active().await);
}

#[tokio::test]
async fn loop_replays_the_same_track_on_completion() {
    let (_state, controller, sink) = engine(vec![]);
    let _loop_handle = controller.start();
    let tracks = validated(&["https://youtu.be/looped", "https://youtu.be/next"]).await;
    controller.enqueue(tracks, false).await;
    controller.play_next().await.unwrap();
    controller.toggle_loop().await.unwrap();

    sink.stop().await;
    wait_until(|| async { sink.started.lock().await.len() == 2 }).await;
    assert_eq!(
        controller.now_playing().await.unwrap().as_str(),
        "https://www.youtube.com/watch?v=looped"
    );
    // the queued follow-up is still waiting
    assert_eq!(controller.queue_len().await, 1);
    assert_eq!(controller.mode().await, PlayerMode::Looping);
}

#[tokio::test]
async fn toggle_loop_twice_keeps_current_track_and_restores_advance() {
    let (_state, controller, sink) = engine(vec![]);
    let _loop_handle = controller.start();
    let tracks = validated(&["https://youtu.be/a", "https://youtu.be/b"]).await;
    controller.enqueue(tracks, false).await;
    controller.play_next().await.unwrap();

    controller.toggle_loop().await.unwrap();
    controller.toggle_loop().await.unwrap();
    assert_eq!(
        controller.now_playing().await.unwrap().as_str(),
        "https://www.youtube.com/watch?v=a"
    );

    sink.stop().await;
    wait_until(|| async {
        controller.now_playing().await.map(|t| t.as_str().to_string())
            == Some("https://www.youtube.com/watch?v=b".to_string())
    })
    .await;
}

#[tokio::test]
async fn resolution_failure_stops_without_auto_advance() {
    let (_state, controller, sink) = engine(vec![
        "https://www.youtube.com/watch?v=broken".to_string(),
    ]);
    let _loop_handle = controller.start();
    let tracks = validated(&["https://youtu.be/broken", "https://youtu.be/fine"]).await;
    controller.enqueue(tracks, false).await;

    assert!(matches!(
        controller.play_next().await,
        Err(Error::ResolutionFailed { .. })
    ));
    tokio::time::sleep(Duration::from_millis(50)).await;
    // the failed track stays current and the good one stays queued
    assert_eq!(
        controller.now_playing().await.unwrap().as_str(),
        "https://www.youtube.com/watch?v=broken"
    );
    assert_eq!(controller.queue_len().await, 1);
    assert!(sink.started.lock().await.is_empty());
}

#[tokio::test]
async fn queue_events_fire_in_order() {
    let (state, controller, sink) = engine(vec![]);
    let _loop_handle = controller.start();
    let mut events = state.subscribe_events();
    let tracks = validated(&["https://youtu.be/a"]).await;
    controller.enqueue(tracks, false).await;
    controller.play_next().await.unwrap();
    sink.stop().await;

    let mut kinds = Vec::new();
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let kind = match events.recv().await.unwrap() {
                PlayerEvent::QueueChanged { .. } => "queue",
                PlayerEvent::TrackStarted { .. } => "started",
                PlayerEvent::QueueFinished { .. } => "finished",
                PlayerEvent::Idle { .. } => "idle",
                PlayerEvent::TrackChanged { .. } => "changed",
            };
            kinds.push(kind);
            if kind == "finished" {
                break;
            }
        }
    })
    .await
    .expect("playback should run to completion");
    assert_eq!(kinds, vec!["queue", "started", "queue", "finished"]);
}

#[tokio::test]
async fn monitor_announces_upcoming_track_once() {
    let (state, controller, _sink) = engine(vec![]);
    let metadata = Arc::new(CachedMetadata::new(
        Arc::new(StaticLookup),
        Arc::new(ResolutionCache::default()),
    ));
    let monitor = TrackMonitor::new(
        state.clone(),
        controller.queue_handle(),
        metadata,
        Duration::from_millis(10),
    );
    let mut events = state.subscribe_events();
    let monitor_handle = monitor.spawn();

    let tracks = validated(&["https://youtu.be/now", "https://youtu.be/next"]).await;
    controller.enqueue(tracks, false).await;
    controller.play_next().await.unwrap();

    let changed = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if let PlayerEvent::TrackChanged { url, title, .. } = events.recv().await.unwrap() {
                break (url, title);
            }
        }
    })
    .await
    .expect("monitor should announce the upcoming track");
    assert_eq!(changed.0, "https://www.youtube.com/watch?v=next");
    assert_eq!(changed.1, "Up Next");
    monitor_handle.abort();
}

#[tokio::test]
async fn reset_from_looping_returns_to_cold_state() {
    let (state, controller, sink) = engine(vec![]);
    let _loop_handle = controller.start();
    let tracks = validated(&["https://youtu.be/a", "https://youtu.be/b"]).await;
    controller.enqueue(tracks, false).await;
    controller.play_next().await.unwrap();
    controller.toggle_loop().await.unwrap();

    controller.reset().await;
    assert_eq!(controller.mode().await, PlayerMode::Idle);
    assert_eq!(controller.queue_len().await, 0);
    assert!(controller.now_playing().await.is_none());
    assert!(state.active_source().await.is_none());
    assert!(!sink.is_active().await);

    // the engine accepts new work after a reset
    let tracks = validated(&["https://youtu.be/fresh"]).await;
    controller.enqueue(tracks, false).await;
    let playing = controller.play_next().await.unwrap();
    assert_eq!(playing.as_str(), "https://www.youtube.com/watch?v=fresh");
    assert_eq!(controller.mode().await, PlayerMode::Playing);
}
