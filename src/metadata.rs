//! Best-effort track metadata
//!
//! Title and thumbnail lookups feed notifications only, so every failure
//! degrades to placeholder text instead of propagating. Results are
//! memoized in the [`ResolutionCache`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cache::ResolutionCache;
use crate::error::Result;
use crate::track::CanonicalUrl;

/// Fallback title when every lookup path fails.
pub const PLACEHOLDER_TITLE: &str = "Upcoming track";

/// Platform metadata endpoints (oEmbed, thumbnail-info APIs).
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn title(&self, track: &CanonicalUrl) -> Result<String>;

    /// `Ok(None)` when the platform has no thumbnail for this track.
    async fn thumbnail(&self, track: &CanonicalUrl) -> Result<Option<String>>;
}

/// Generic extractor probe (a yt-dlp-like capability supplied by the
/// embedding application). Used to verify social posts actually carry
/// playable media, and as a last-resort title source.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Title of whatever playable media the extractor finds at `url`.
    async fn probe_title(&self, url: &str) -> Result<String>;
}

/// Cache-fronted metadata lookups for notification rendering.
pub struct CachedMetadata {
    lookup: Arc<dyn MetadataLookup>,
    cache: Arc<ResolutionCache>,
}

impl CachedMetadata {
    pub fn new(lookup: Arc<dyn MetadataLookup>, cache: Arc<ResolutionCache>) -> Self {
        Self { lookup, cache }
    }

    /// Title for a track, falling back to [`PLACEHOLDER_TITLE`].
    pub async fn title_or_placeholder(&self, track: &CanonicalUrl) -> String {
        if let Some(title) = self.cache.title(track.as_str()) {
            return title;
        }
        match self.lookup.title(track).await {
            Ok(title) => {
                self.cache.store_title(track.as_str(), &title);
                title
            }
            Err(e) => {
                warn!("Title lookup failed for {track}: {e}");
                PLACEHOLDER_TITLE.to_string()
            }
        }
    }

    /// Thumbnail for a track; `None` on failure or for platforms without one.
    pub async fn thumbnail_opt(&self, track: &CanonicalUrl) -> Option<String> {
        if let Some(cached) = self.cache.thumbnail(track.as_str()) {
            return cached;
        }
        match self.lookup.thumbnail(track).await {
            Ok(thumbnail) => {
                self.cache.store_thumbnail(track.as_str(), thumbnail.clone());
                thumbnail
            }
            Err(e) => {
                debug!("Thumbnail lookup failed for {track}: {e}");
                None
            }
        }
    }
}
