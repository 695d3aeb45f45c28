//! Ordered playback queue
//!
//! FIFO of canonical URLs plus the now-playing pointer. Normal enqueue
//! appends; an interrupt enqueue splices ahead of everything queued but not
//! yet playing. `now_playing` changes only through [`PlayQueue::dequeue_next`]
//! and [`PlayQueue::clear`].

use std::collections::VecDeque;

use tracing::debug;

use crate::error::{Error, Result};
use crate::track::CanonicalUrl;

/// In-memory playback queue (process-lifetime singleton behind the engine).
#[derive(Debug, Default)]
pub struct PlayQueue {
    entries: VecDeque<CanonicalUrl>,
    now_playing: Option<CanonicalUrl>,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append URLs, or splice them to the front when `interrupt` is set.
    pub fn enqueue(&mut self, urls: Vec<CanonicalUrl>, interrupt: bool) {
        if interrupt {
            for url in urls.into_iter().rev() {
                self.entries.push_front(url);
            }
        } else {
            self.entries.extend(urls);
        }
        debug!("Queue after enqueue: {} entries", self.entries.len());
    }

    /// Pop the front entry and record it as now playing.
    pub fn dequeue_next(&mut self) -> Result<CanonicalUrl> {
        let url = self.entries.pop_front().ok_or(Error::EmptyQueue)?;
        self.now_playing = Some(url.clone());
        debug!("Dequeued {url}, {} entries remain", self.entries.len());
        Ok(url)
    }

    /// Drop the first `n` entries; `n >= len` empties the queue entirely
    /// ("skip past the end stops everything" is deliberate policy).
    pub fn skip(&mut self, n: usize) {
        if n >= self.entries.len() {
            self.entries.clear();
        } else {
            self.entries.drain(..n);
        }
        debug!("Queue after skip({n}): {} entries", self.entries.len());
    }

    /// Empty the queue and clear the now-playing pointer.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.now_playing = None;
        debug!("Queue cleared");
    }

    /// Owned snapshot of the queued entries.
    pub fn peek(&self) -> Vec<CanonicalUrl> {
        self.entries.iter().cloned().collect()
    }

    /// The entry that would play next, without dequeuing it.
    pub fn head(&self) -> Option<&CanonicalUrl> {
        self.entries.front()
    }

    pub fn now_playing(&self) -> Option<&CanonicalUrl> {
        self.now_playing.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
