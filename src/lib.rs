//! # playq
//!
//! Playback-queue and track-resolution engine for a chat-driven music
//! player.
//!
//! **Purpose:** Normalize and validate track URLs, cache resolution
//! results, and drive a FIFO playback queue through an idle/playing/looping
//! state machine, emitting events a front-end can forward verbatim.
//!
//! **Architecture:** Single-writer controller over shared state; platform
//! access (stream resolution, audio output, HTTP probes) sits behind
//! capability traits supplied by the embedding application.

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod metadata;
pub mod net;
pub mod playback;
pub mod playlist;
pub mod resolver;
pub mod state;
pub mod track;
pub mod validate;

pub use error::{Error, RejectKind, Result};
pub use events::{EventBus, PlayerEvent, QueueChangeTrigger};
pub use playback::{PlayQueue, PlaybackController, TrackMonitor};
pub use state::{PlayerMode, SharedState};
pub use track::{CanonicalUrl, Platform};
pub use validate::{ValidationResult, Validator};
