//! Playback controller
//!
//! Single writer for playback state. Every transition (starting a track,
//! advancing on completion, looping, skipping, reset) funnels through this
//! type, so queue and mode mutations are serialized even though completion
//! signals originate on sink-owned threads.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::events::{PlayerEvent, QueueChangeTrigger};
use crate::playback::queue::PlayQueue;
use crate::resolver::{
    AudioSink, Completion, CompletionSender, SessionGuard, StreamResolver, TransportOptions,
};
use crate::state::{PlayerMode, SharedState};
use crate::track::CanonicalUrl;

/// Upper bound on platform session teardown before we move on without it.
const SESSION_RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct PlaybackController {
    state: Arc<SharedState>,
    queue: Arc<Mutex<PlayQueue>>,
    resolver: Arc<dyn StreamResolver>,
    sink: Arc<dyn AudioSink>,

    /// Platform session bound to the active track, released before the next
    /// track starts (some platforms reject overlapping sessions).
    session: RwLock<Option<Box<dyn SessionGuard>>>,

    completion_tx: CompletionSender,
    completion_rx: Mutex<Option<mpsc::UnboundedReceiver<Completion>>>,
}

impl PlaybackController {
    pub fn new(
        state: Arc<SharedState>,
        resolver: Arc<dyn StreamResolver>,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            state,
            queue: Arc::new(Mutex::new(PlayQueue::new())),
            resolver,
            sink,
            session: RwLock::new(None),
            completion_tx,
            completion_rx: Mutex::new(Some(completion_rx)),
        }
    }

    /// Spawn the completion loop that advances playback when the sink
    /// reports end-of-stream. Call once after construction.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let rx = controller.completion_rx.lock().await.take();
            let Some(mut rx) = rx else {
                warn!("Completion loop already running, not starting another");
                return;
            };
            info!("Completion loop started");
            while let Some(completion) = rx.recv().await {
                controller.handle_completion(completion).await;
            }
            debug!("Completion channel closed, loop exiting");
        })
    }

    /// Append validated URLs to the queue, or splice them to the front when
    /// `interrupt` is set. Does not start playback; callers decide when to
    /// invoke [`play_next`](Self::play_next).
    pub async fn enqueue(&self, urls: Vec<CanonicalUrl>, interrupt: bool) {
        if urls.is_empty() {
            return;
        }
        self.queue.lock().await.enqueue(urls, interrupt);
        self.emit_queue_changed(QueueChangeTrigger::Enqueue).await;
    }

    /// Start the next track: the current one again in loop mode, otherwise
    /// the queue head. A still-active audio session is stopped explicitly
    /// before the new one starts. On an empty queue the engine transitions
    /// to idle and this returns [`Error::EmptyQueue`].
    pub async fn play_next(&self) -> Result<CanonicalUrl> {
        let mode = self.state.mode().await;
        let dequeued = {
            let mut queue = self.queue.lock().await;
            if mode == PlayerMode::Looping {
                match queue.now_playing().cloned() {
                    Some(current) => Ok((current, false)),
                    None => queue.dequeue_next().map(|track| (track, true)),
                }
            } else {
                queue.dequeue_next().map(|track| (track, true))
            }
        };
        let (track, dequeued) = match dequeued {
            Ok(pair) => pair,
            Err(Error::EmptyQueue) => {
                self.enter_idle().await;
                self.state.broadcast_event(PlayerEvent::QueueFinished {
                    timestamp: Utc::now(),
                });
                return Err(Error::EmptyQueue);
            }
            Err(e) => return Err(e),
        };

        // An active session is never silently replaced: stop it, clearing
        // the source identity first so its completion arrives stale.
        if self.state.active_source().await.is_some() {
            self.state.set_active_source(None).await;
            self.sink.stop().await;
        }

        // Previous platform session must be gone before a new handshake.
        self.release_session().await;

        let resolved =
            self.resolver
                .resolve(&track)
                .await
                .map_err(|e| Error::ResolutionFailed {
                    url: track.to_string(),
                    reason: e.to_string(),
                })?;
        let options = TransportOptions::for_protocol(resolved.protocol);

        let session = match self
            .sink
            .start(&resolved.stream_uri, &options, self.completion_tx.clone())
            .await
        {
            Ok(session) => session,
            Err(e) => {
                if let Some(guard) = resolved.session {
                    if let Err(cleanup) = guard.release().await {
                        warn!("Session cleanup after failed start: {cleanup}");
                    }
                }
                return Err(Error::PlaybackStartFailed {
                    url: track.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        *self.session.write().await = resolved.session;
        self.state.set_active_source(Some(session)).await;
        if self.state.mode().await != PlayerMode::Looping {
            self.state.set_mode(PlayerMode::Playing).await;
        }
        self.state.broadcast_event(PlayerEvent::TrackStarted {
            url: track.to_string(),
            timestamp: Utc::now(),
        });
        if dequeued {
            self.emit_queue_changed(QueueChangeTrigger::Dequeue).await;
        }
        info!("Playing {track} (session {session})");
        Ok(track)
    }

    /// Flip between playing and looping. Fails when nothing is playing.
    pub async fn toggle_loop(&self) -> Result<PlayerMode> {
        let next = match self.state.mode().await {
            PlayerMode::Idle => {
                return Err(Error::InvalidState(
                    "cannot toggle loop while idle".to_string(),
                ))
            }
            PlayerMode::Playing => PlayerMode::Looping,
            PlayerMode::Looping => PlayerMode::Playing,
        };
        self.state.set_mode(next).await;
        info!("Loop toggled, mode now {next}");
        Ok(next)
    }

    /// Skip the current track and, for `count > 1`, the next `count - 1`
    /// queued entries as well. Skipping always cancels loop mode; the actual
    /// advance happens when the stopped session posts its completion.
    pub async fn skip_current(&self, count: usize) -> Result<()> {
        if self.state.mode().await == PlayerMode::Idle {
            return Err(Error::InvalidState(
                "cannot skip while idle".to_string(),
            ));
        }
        self.state.set_mode(PlayerMode::Playing).await;

        let count = count.max(1);
        if count > 1 {
            self.queue.lock().await.skip(count - 1);
            self.emit_queue_changed(QueueChangeTrigger::Skip).await;
        }
        self.sink.stop().await;
        Ok(())
    }

    /// Stop playback and drop everything queued.
    ///
    /// The active source is cleared before the sink stops, so the stop's
    /// completion signal arrives stale and cannot restart playback.
    pub async fn reset(&self) {
        self.state.set_mode(PlayerMode::Idle).await;
        self.state.set_active_source(None).await;
        self.queue.lock().await.clear();
        self.release_session().await;
        self.sink.stop().await;
        self.emit_queue_changed(QueueChangeTrigger::Clear).await;
        info!("Playback reset");
    }

    pub async fn peek_queue(&self) -> Vec<CanonicalUrl> {
        self.queue.lock().await.peek()
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn now_playing(&self) -> Option<CanonicalUrl> {
        self.queue.lock().await.now_playing().cloned()
    }

    pub async fn mode(&self) -> PlayerMode {
        self.state.mode().await
    }

    /// Queue handle for read-only observers (the track-change monitor).
    pub fn queue_handle(&self) -> Arc<Mutex<PlayQueue>> {
        Arc::clone(&self.queue)
    }

    async fn handle_completion(&self, completion: Completion) {
        let session = completion.session();
        if self.state.active_source().await != Some(session) {
            debug!("Ignoring completion for stale session {session}");
            return;
        }
        if let Completion::Failed { reason, .. } = &completion {
            warn!("Session {session} ended with error: {reason}");
        }
        match self.play_next().await {
            Ok(track) => debug!("Advanced to {track}"),
            Err(Error::EmptyQueue) => info!("Queue drained, playback idle"),
            Err(e) => warn!("Could not start next track: {e}"),
        }
    }

    // The now-playing record survives a queue drain; only an explicit
    // reset clears it.
    async fn enter_idle(&self) {
        self.state.set_mode(PlayerMode::Idle).await;
        self.state.set_active_source(None).await;
        self.release_session().await;
    }

    async fn release_session(&self) {
        let guard = self.session.write().await.take();
        if let Some(guard) = guard {
            match tokio::time::timeout(SESSION_RELEASE_TIMEOUT, guard.release()).await {
                Ok(Ok(())) => debug!("Platform session released"),
                Ok(Err(e)) => {
                    warn!("{}", Error::SessionCleanupFailed(e.to_string()))
                }
                Err(_) => warn!(
                    "{}",
                    Error::SessionCleanupFailed("release timed out".to_string())
                ),
            }
        }
    }

    async fn emit_queue_changed(&self, trigger: QueueChangeTrigger) {
        let queue = self
            .queue
            .lock()
            .await
            .peek()
            .iter()
            .map(|url| url.to_string())
            .collect();
        self.state.broadcast_event(PlayerEvent::QueueChanged {
            queue,
            trigger,
            timestamp: Utc::now(),
        });
    }
}
