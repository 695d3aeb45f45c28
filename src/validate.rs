//! URL normalization and validation pipeline
//!
//! Turns raw user-supplied strings into canonical, playable URLs or
//! structured rejections. Per-URL network probes (redirect resolution,
//! existence check, premium gate, extractor probe) run through the
//! [`UrlProber`]/[`MediaProbe`] capabilities with bounded timeouts and are
//! memoized in the [`ResolutionCache`]; a failing probe rejects that one URL
//! and never aborts the batch.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::ResolutionCache;
use crate::error::{RejectKind, Result};
use crate::metadata::MediaProbe;
use crate::track::{video_id_for, CanonicalUrl, Platform};

/// Marker string present in the watch page of premium-gated videos.
pub(crate) const PREMIUM_MARKER: &str =
    "この動画を視聴できるのは、Music Premium のメンバーのみです";

/// Network probes used during validation.
#[async_trait]
pub trait UrlProber: Send + Sync {
    /// Follow redirects on a shortener URL and return the final target.
    async fn resolve_redirect(&self, url: &str) -> Result<String>;

    /// Whether the unauthenticated thumbnail endpoint answers 200 for this
    /// video id.
    async fn thumbnail_exists(&self, video_id: &str) -> Result<bool>;

    /// Whether the watch page body carries the premium-only marker.
    async fn is_premium_only(&self, url: &str) -> Result<bool>;
}

/// One rejected input URL with the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rejection {
    /// The URL as the user supplied it (after whitespace cleanup)
    pub original: String,
    pub kind: RejectKind,
    /// Human-readable, one line per rejection
    pub message: String,
}

/// Outcome of validating a batch of raw URLs.
///
/// Every deduplicated input lands in exactly one of the two lists, and both
/// lists preserve first-occurrence order.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub accepted: Vec<CanonicalUrl>,
    pub rejected: Vec<Rejection>,
}

/// The URL normalizer/validator.
pub struct Validator {
    prober: Arc<dyn UrlProber>,
    probe: Arc<dyn MediaProbe>,
    cache: Arc<ResolutionCache>,
}

impl Validator {
    pub fn new(
        prober: Arc<dyn UrlProber>,
        probe: Arc<dyn MediaProbe>,
        cache: Arc<ResolutionCache>,
    ) -> Self {
        Self {
            prober,
            probe,
            cache,
        }
    }

    /// Validate a batch of raw URLs.
    ///
    /// Strips whitespace (including full-width space), drops empties,
    /// collapses duplicates to their first occurrence, then canonicalizes
    /// each survivor.
    pub async fn validate(&self, raw: &[String]) -> ValidationResult {
        let cleaned = clean_urls(raw);
        debug!("Validating {} URLs", cleaned.len());

        let mut result = ValidationResult::default();
        for url in cleaned {
            match self.check_one(&url).await {
                Ok(canonical) => {
                    debug!("Accepted {url} as {canonical}");
                    result.accepted.push(canonical);
                }
                Err(rejection) => {
                    warn!("Rejected {url}: {}", rejection.message);
                    result.rejected.push(rejection);
                }
            }
        }
        result
    }

    async fn check_one(&self, url: &str) -> std::result::Result<CanonicalUrl, Rejection> {
        let mut url = url.to_string();
        let mut platform = Platform::classify(&url)
            .ok_or_else(|| reject(&url, RejectKind::UnsupportedSite))?;

        // Shorteners are best effort: a failed redirect lookup keeps the
        // original URL rather than rejecting it.
        if platform == Platform::Shortener {
            match self.prober.resolve_redirect(&url).await {
                Ok(target) => {
                    debug!("Shortener {url} resolved to {target}");
                    platform = Platform::classify(&target)
                        .ok_or_else(|| reject(&target, RejectKind::UnsupportedSite))?;
                    url = target;
                }
                Err(e) => {
                    warn!("Shortener resolution failed for {url}, keeping as-is: {e}");
                }
            }
        }

        match platform {
            Platform::Youtube => self.check_youtube(&url).await,
            Platform::NicoVideo => Ok(CanonicalUrl::new(strip_query(&url), platform)),
            Platform::Twitter => self.check_twitter(&url).await,
            Platform::Shortener | Platform::Other => Ok(CanonicalUrl::new(url, platform)),
        }
    }

    /// Canonicalize a YouTube URL and probe existence plus the premium gate.
    async fn check_youtube(&self, url: &str) -> std::result::Result<CanonicalUrl, Rejection> {
        let video_id = video_id_for(url, Platform::Youtube)
            .ok_or_else(|| reject(url, RejectKind::DeletedOrUnavailable))?;
        let canonical = format!("https://www.youtube.com/watch?v={video_id}");

        let available = match self.cache.availability(&video_id) {
            Some(cached) => cached,
            None => {
                let exists = self
                    .prober
                    .thumbnail_exists(&video_id)
                    .await
                    .map_err(|e| reject_failed(url, &e))?;
                self.cache.store_availability(&video_id, exists);
                exists
            }
        };
        if !available {
            return Err(reject(url, RejectKind::DeletedOrUnavailable));
        }

        let premium = match self.cache.premium(&canonical) {
            Some(cached) => cached,
            None => {
                let premium = self
                    .prober
                    .is_premium_only(&canonical)
                    .await
                    .map_err(|e| reject_failed(url, &e))?;
                self.cache.store_premium(&canonical, premium);
                premium
            }
        };
        if premium {
            return Err(reject(url, RejectKind::PremiumOnly));
        }

        Ok(CanonicalUrl::new(canonical, Platform::Youtube))
    }

    /// Verify the generic extractor can pull playable media from a post.
    async fn check_twitter(&self, url: &str) -> std::result::Result<CanonicalUrl, Rejection> {
        let outcome = match self.cache.probe(url) {
            Some(cached) => cached,
            None => {
                let outcome = match self.probe.probe_title(url).await {
                    Ok(title) => Some(title),
                    Err(e) => {
                        debug!("Extractor probe failed for {url}: {e}");
                        None
                    }
                };
                self.cache.store_probe(url, outcome.clone());
                outcome
            }
        };

        match outcome {
            Some(_) => Ok(CanonicalUrl::new(url.to_string(), Platform::Twitter)),
            None => Err(reject(url, RejectKind::NoMediaFound)),
        }
    }
}

/// Strip ASCII and full-width whitespace, drop empties, dedupe first-seen.
pub(crate) fn clean_urls(raw: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for url in raw {
        // char::is_whitespace covers the full-width space (U+3000) too.
        let cleaned: String = url.chars().filter(|c| !c.is_whitespace()).collect();
        if cleaned.is_empty() || seen.contains(&cleaned) {
            continue;
        }
        seen.push(cleaned);
    }
    seen
}

fn strip_query(url: &str) -> String {
    match url.find('?') {
        Some(idx) => url[..idx].to_string(),
        None => url.to_string(),
    }
}

fn reject(url: &str, kind: RejectKind) -> Rejection {
    let message = match kind {
        RejectKind::UnsupportedSite => format!("This video site is not supported: {url}"),
        RejectKind::DeletedOrUnavailable => {
            format!("This video has been deleted or made private: {url}")
        }
        RejectKind::PremiumOnly => format!("This video is for premium members only: {url}"),
        RejectKind::NoMediaFound => format!("No playable media was found in this post: {url}"),
        RejectKind::ResolutionFailed => format!("Could not verify this URL: {url}"),
    };
    Rejection {
        original: url.to_string(),
        kind,
        message,
    }
}

fn reject_failed(url: &str, err: &crate::error::Error) -> Rejection {
    Rejection {
        original: url.to_string(),
        kind: RejectKind::ResolutionFailed,
        message: format!("Could not verify this URL: {url} ({err})"),
    }
}
