//! Bounded memoization for expensive URL lookups
//!
//! Video-id extraction, premium-gate checks and title/thumbnail lookups all
//! hit the network; results are memoized per URL in strict-LRU maps with a
//! fixed capacity per purpose. Entries carry no TTL: staleness is an
//! accepted trade-off, a stale "playable" entry just fails later at resolve
//! time.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

/// Default capacity for each cache purpose.
pub const DEFAULT_CACHE_CAPACITY: usize = 500;

/// One LRU map per lookup purpose, each independently bounded.
///
/// Insert/evict is atomic per key (plain mutex, no await while held), so
/// capacity accounting cannot race between call sites.
pub struct ResolutionCache {
    premium: Mutex<LruCache<String, bool>>,
    availability: Mutex<LruCache<String, bool>>,
    titles: Mutex<LruCache<String, String>>,
    thumbnails: Mutex<LruCache<String, Option<String>>>,
    probes: Mutex<LruCache<String, Option<String>>>,
}

impl ResolutionCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to >= 1");
        Self {
            premium: Mutex::new(LruCache::new(cap)),
            availability: Mutex::new(LruCache::new(cap)),
            titles: Mutex::new(LruCache::new(cap)),
            thumbnails: Mutex::new(LruCache::new(cap)),
            probes: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn premium(&self, url: &str) -> Option<bool> {
        self.premium.lock().expect("cache lock").get(url).copied()
    }

    pub fn store_premium(&self, url: &str, value: bool) {
        self.premium
            .lock()
            .expect("cache lock")
            .put(url.to_string(), value);
    }

    /// Cached outcome of the thumbnail-endpoint existence probe.
    pub fn availability(&self, video_id: &str) -> Option<bool> {
        self.availability
            .lock()
            .expect("cache lock")
            .get(video_id)
            .copied()
    }

    pub fn store_availability(&self, video_id: &str, value: bool) {
        self.availability
            .lock()
            .expect("cache lock")
            .put(video_id.to_string(), value);
    }

    pub fn title(&self, url: &str) -> Option<String> {
        self.titles.lock().expect("cache lock").get(url).cloned()
    }

    pub fn store_title(&self, url: &str, title: &str) {
        self.titles
            .lock()
            .expect("cache lock")
            .put(url.to_string(), title.to_string());
    }

    /// `Some(None)` means "looked up before, platform has no thumbnail".
    pub fn thumbnail(&self, url: &str) -> Option<Option<String>> {
        self.thumbnails.lock().expect("cache lock").get(url).cloned()
    }

    pub fn store_thumbnail(&self, url: &str, thumbnail: Option<String>) {
        self.thumbnails
            .lock()
            .expect("cache lock")
            .put(url.to_string(), thumbnail);
    }

    /// Cached generic-extractor outcome: `Some(title)` on success, `None`
    /// when the extractor found no media.
    pub fn probe(&self, url: &str) -> Option<Option<String>> {
        self.probes.lock().expect("cache lock").get(url).cloned()
    }

    pub fn store_probe(&self, url: &str, outcome: Option<String>) {
        self.probes
            .lock()
            .expect("cache lock")
            .put(url.to_string(), outcome);
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
