//! Playback engine: queue, controller state machine, and track monitor.

pub mod controller;
pub mod monitor;
pub mod queue;

pub use controller::PlaybackController;
pub use monitor::{TrackMonitor, DEFAULT_MONITOR_INTERVAL};
pub use queue::PlayQueue;
