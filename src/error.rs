//! Error types for playq
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a URL was rejected during validation.
///
/// One kind per rejected URL; validation never aborts a batch for a single
/// bad entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectKind {
    /// Host is not on the supported-platform allowlist
    UnsupportedSite,
    /// Existence probe failed (deleted or private video)
    DeletedOrUnavailable,
    /// Page carries the premium-only marker
    PremiumOnly,
    /// Generic extractor found no playable media in the post
    NoMediaFound,
    /// Network failure while probing this URL
    ResolutionFailed,
}

impl std::fmt::Display for RejectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectKind::UnsupportedSite => write!(f, "unsupported site"),
            RejectKind::DeletedOrUnavailable => write!(f, "deleted or unavailable"),
            RejectKind::PremiumOnly => write!(f, "premium-only"),
            RejectKind::NoMediaFound => write!(f, "no media found"),
            RejectKind::ResolutionFailed => write!(f, "resolution failed"),
        }
    }
}

/// Main error type for playq
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Queue has no entries to dequeue
    #[error("Queue is empty")]
    EmptyQueue,

    /// External resolver could not turn a canonical URL into a stream
    #[error("Stream resolution failed for {url}: {reason}")]
    ResolutionFailed { url: String, reason: String },

    /// Audio sink refused to start the resolved stream
    #[error("Playback start failed for {url}: {reason}")]
    PlaybackStartFailed { url: String, reason: String },

    /// Platform session close/cleanup failed (non-fatal, logged only)
    #[error("Session cleanup failed: {0}")]
    SessionCleanupFailed(String),

    /// Operation not valid in the current playback mode
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Playlist file errors (missing, locked, malformed)
    #[error("Playlist error: {0}")]
    Playlist(String),

    /// HTTP probe or metadata request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using playq Error
pub type Result<T> = std::result::Result<T, Error>;
