//! File-backed playlist store
//!
//! Playlists are one JSON file per name in a flat directory, plus a single
//! dates file recording the most recent use of each playlist. Stored URLs
//! are raw user input; callers run them through validation before playback.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

const USAGE_FILE: &str = "usage.json";

/// On-disk shape of one playlist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaylistFile {
    /// User ids allowed to modify a locked playlist
    #[serde(default)]
    pub owner: Vec<u64>,
    /// When set, only owners may modify
    #[serde(default)]
    pub locked: bool,
    /// Stored track URLs, unvalidated
    #[serde(default)]
    pub urls: Vec<String>,
}

impl PlaylistFile {
    pub fn new(owner: u64) -> Self {
        Self {
            owner: vec![owner],
            locked: false,
            urls: Vec::new(),
        }
    }
}

/// Directory-backed playlist collection.
pub struct PlaylistStore {
    dir: PathBuf,
}

impl PlaylistStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Raw URLs stored under `name`; the caller validates them.
    pub fn load(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.read(name)?.urls)
    }

    /// Create `name` owned by `owner`, failing if it already exists.
    pub fn create(&self, name: &str, owner: u64) -> Result<()> {
        if self.exists(name) {
            return Err(Error::Playlist(format!("playlist {name} already exists")));
        }
        self.write(name, &PlaylistFile::new(owner))
    }

    /// Append URLs, skipping any already present.
    pub fn add_urls(&self, name: &str, urls: &[String]) -> Result<usize> {
        let mut playlist = self.read(name)?;
        let before = playlist.urls.len();
        for url in urls {
            if !playlist.urls.contains(url) {
                playlist.urls.push(url.clone());
            }
        }
        let added = playlist.urls.len() - before;
        self.write(name, &playlist)?;
        debug!("Added {added} URLs to playlist {name}");
        Ok(added)
    }

    /// Remove the given URLs (used to purge entries that failed validation).
    /// Returns how many were actually removed.
    pub fn remove_urls(&self, name: &str, urls: &[String]) -> Result<usize> {
        let mut playlist = self.read(name)?;
        let before = playlist.urls.len();
        playlist.urls.retain(|url| !urls.contains(url));
        let removed = before - playlist.urls.len();
        self.write(name, &playlist)?;
        debug!("Removed {removed} URLs from playlist {name}");
        Ok(removed)
    }

    /// Whether `user` may modify `name`. Unlocked playlists are open to
    /// everyone; locked ones only to their owners.
    pub fn can_modify(&self, name: &str, user: u64) -> Result<bool> {
        let playlist = self.read(name)?;
        Ok(!playlist.locked || playlist.owner.contains(&user))
    }

    /// Lock or unlock `name` on behalf of `user`.
    pub fn set_locked(&self, name: &str, user: u64, locked: bool) -> Result<()> {
        let mut playlist = self.read(name)?;
        if !playlist.owner.contains(&user) {
            return Err(Error::Playlist(format!(
                "user {user} does not own playlist {name}"
            )));
        }
        playlist.locked = locked;
        self.write(name, &playlist)
    }

    /// Record that `name` was used at `timestamp` (latest use wins).
    pub fn record_usage(&self, name: &str, timestamp: DateTime<Utc>) -> Result<()> {
        let mut usage = self.read_usage();
        usage.insert(name.to_string(), timestamp);
        let path = self.dir.join(USAGE_FILE);
        fs::write(&path, serde_json::to_vec_pretty(&usage)?)?;
        Ok(())
    }

    /// Playlist names ordered by last use, most recent first.
    pub fn recently_used(&self, limit: usize) -> Vec<String> {
        let mut entries: Vec<(String, DateTime<Utc>)> = self.read_usage().into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(limit);
        entries.into_iter().map(|(name, _)| name).collect()
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    fn read(&self, name: &str) -> Result<PlaylistFile> {
        let path = self.path_for(name);
        let bytes = fs::read(&path)
            .map_err(|_| Error::Playlist(format!("no playlist named {name}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write(&self, name: &str, playlist: &PlaylistFile) -> Result<()> {
        let path = self.path_for(name);
        fs::write(&path, serde_json::to_vec_pretty(playlist)?)?;
        Ok(())
    }

    fn read_usage(&self) -> HashMap<String, DateTime<Utc>> {
        let path = self.dir.join(USAGE_FILE);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!("Corrupt usage file {}: {e}", path.display());
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }
}
