//! Shared playback state
//!
//! Thread-safe state shared between the controller (sole writer) and the
//! track-change monitor (reader). Loop and source-identity flags live here
//! instead of free-standing globals.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::events::{EventBus, PlayerEvent};

/// Playback mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerMode {
    /// No active session
    Idle,
    /// One active audio session, advancing through the queue
    Playing,
    /// Replaying the current track instead of advancing
    Looping,
}

impl std::fmt::Display for PlayerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerMode::Idle => write!(f, "idle"),
            PlayerMode::Playing => write!(f, "playing"),
            PlayerMode::Looping => write!(f, "looping"),
        }
    }
}

/// Shared state accessible by all components
///
/// Uses RwLock for concurrent read access with rare writes. Writes happen
/// only inside the controller; the monitor holds a read-only view.
pub struct SharedState {
    /// Current playback mode
    mode: RwLock<PlayerMode>,

    /// Identity of the active audio source (one fresh token per session)
    active_source: RwLock<Option<Uuid>>,

    /// Event broadcaster for notifications
    events: EventBus,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            mode: RwLock::new(PlayerMode::Idle),
            active_source: RwLock::new(None),
            events: EventBus::default(),
        }
    }

    pub async fn mode(&self) -> PlayerMode {
        *self.mode.read().await
    }

    pub async fn set_mode(&self, mode: PlayerMode) {
        *self.mode.write().await = mode;
    }

    pub async fn active_source(&self) -> Option<Uuid> {
        *self.active_source.read().await
    }

    pub async fn set_active_source(&self, source: Option<Uuid>) {
        *self.active_source.write().await = source;
    }

    /// Broadcast an event to all listeners (no-subscriber case is fine)
    pub fn broadcast_event(&self, event: PlayerEvent) {
        self.events.emit_lossy(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mode_round_trip() {
        let state = SharedState::new();
        assert_eq!(state.mode().await, PlayerMode::Idle);

        state.set_mode(PlayerMode::Playing).await;
        assert_eq!(state.mode().await, PlayerMode::Playing);

        state.set_mode(PlayerMode::Looping).await;
        assert_eq!(state.mode().await, PlayerMode::Looping);
    }

    #[tokio::test]
    async fn active_source_round_trip() {
        let state = SharedState::new();
        assert!(state.active_source().await.is_none());

        let id = Uuid::new_v4();
        state.set_active_source(Some(id)).await;
        assert_eq!(state.active_source().await, Some(id));

        state.set_active_source(None).await;
        assert!(state.active_source().await.is_none());
    }
}
