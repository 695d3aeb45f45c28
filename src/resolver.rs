//! External playback capabilities
//!
//! The engine never talks to platforms or audio devices directly; it drives
//! a [`StreamResolver`] (canonical URL → streamable source, including any
//! per-platform session handshake) and an [`AudioSink`] (stream → audio
//! output). Both are supplied by the embedding application.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Result;
use crate::track::CanonicalUrl;

/// Transport protocol of a resolved stream URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolHint {
    /// Plain progressive download / direct stream
    Direct,
    /// HLS playlist; transports need reconnect handling and a read timeout
    Hls,
}

impl ProtocolHint {
    /// Best-effort detection from the stream URI itself.
    pub fn detect(stream_uri: &str) -> ProtocolHint {
        if stream_uri.contains(".m3u8") {
            ProtocolHint::Hls
        } else {
            ProtocolHint::Direct
        }
    }
}

/// A stateful platform session that must be explicitly released before a new
/// one is created (e.g. a connect/close handshake per video).
#[async_trait]
pub trait SessionGuard: Send + Sync {
    async fn release(self: Box<Self>) -> Result<()>;
}

/// Outcome of resolving a canonical URL to a playable source.
pub struct ResolvedStream {
    /// URI the audio sink should open
    pub stream_uri: String,
    /// Transport protocol of the stream
    pub protocol: ProtocolHint,
    /// Codec name when the resolver knows it
    pub codec: Option<String>,
    /// Platform session to release when this track stops, if stateful
    pub session: Option<Box<dyn SessionGuard>>,
}

impl std::fmt::Debug for ResolvedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedStream")
            .field("stream_uri", &self.stream_uri)
            .field("protocol", &self.protocol)
            .field("codec", &self.codec)
            .field("session", &self.session.is_some())
            .finish()
    }
}

/// Canonical URL → streamable source.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    async fn resolve(&self, track: &CanonicalUrl) -> Result<ResolvedStream>;
}

/// Options handed to the audio sink's transport layer.
///
/// Mirrors the reconnect/normalization flags the transport needs; HLS
/// streams additionally get a read timeout so a stalled segment fetch
/// cannot hang the session forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub reconnect: bool,
    pub reconnect_delay_max: Duration,
    pub read_timeout: Option<Duration>,
    pub normalize_loudness: bool,
    pub audio_only: bool,
}

impl TransportOptions {
    pub fn for_protocol(protocol: ProtocolHint) -> Self {
        Self {
            reconnect: true,
            reconnect_delay_max: Duration::from_secs(5),
            read_timeout: match protocol {
                ProtocolHint::Hls => Some(Duration::from_secs(10)),
                ProtocolHint::Direct => None,
            },
            normalize_loudness: true,
            audio_only: true,
        }
    }
}

/// End-of-stream signal posted by the sink when a session finishes.
///
/// Sinks running the transport on their own thread must send this through
/// the channel rather than calling back into the engine; the controller's
/// completion loop is the only place that advances playback.
#[derive(Debug, Clone)]
pub enum Completion {
    /// Stream reached its end
    Finished { session: Uuid },
    /// Stream ended with a transport or decode error
    Failed { session: Uuid, reason: String },
}

impl Completion {
    pub fn session(&self) -> Uuid {
        match self {
            Completion::Finished { session } | Completion::Failed { session, .. } => *session,
        }
    }
}

/// Sender half handed to the sink at session start.
pub type CompletionSender = mpsc::UnboundedSender<Completion>;

/// Audio output capability.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Open the stream and start playing; returns the new session identity.
    ///
    /// The sink must post exactly one [`Completion`] for the session when the
    /// stream ends, fails, or is stopped.
    async fn start(
        &self,
        stream_uri: &str,
        options: &TransportOptions,
        completion: CompletionSender,
    ) -> Result<Uuid>;

    /// Whether a session is currently producing audio.
    async fn is_active(&self) -> bool;

    /// Stop the current session, triggering its completion signal.
    async fn stop(&self);
}
