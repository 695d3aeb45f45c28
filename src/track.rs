//! Canonical track URLs and the supported-platform set
//!
//! Raw user input is classified exactly once during validation; everything
//! downstream dispatches on the resulting [`Platform`] tag instead of
//! re-matching substrings of the URL.

use serde::{Deserialize, Serialize};
use url::Url;

/// Supported source platform for a track URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// youtube.com / youtu.be (watch, live, shorts, playlist-qualified forms)
    Youtube,
    /// nicovideo.jp / nico.ms
    NicoVideo,
    /// twitter.com / x.com posts
    Twitter,
    /// t.co link shortener; resolved to its target during validation
    Shortener,
    /// Other allowlisted hosts passed through unchanged (soundcloud, CDN links)
    Other,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Youtube => write!(f, "youtube"),
            Platform::NicoVideo => write!(f, "nicovideo"),
            Platform::Twitter => write!(f, "twitter"),
            Platform::Shortener => write!(f, "shortener"),
            Platform::Other => write!(f, "other"),
        }
    }
}

/// Hosts accepted beyond the big three platforms.
const PASSTHROUGH_HOSTS: &[&str] = &["soundcloud.com", "cdn.discordapp.com"];

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

impl Platform {
    /// Classify a URL against the supported-platform allowlist.
    ///
    /// Returns `None` for unparseable URLs and hosts outside the allowlist.
    pub fn classify(raw: &str) -> Option<Platform> {
        let parsed = Url::parse(raw).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();

        if host_matches(&host, "youtube.com") || host_matches(&host, "youtu.be") {
            return Some(Platform::Youtube);
        }
        if host_matches(&host, "nicovideo.jp") || host_matches(&host, "nico.ms") {
            return Some(Platform::NicoVideo);
        }
        if host_matches(&host, "twitter.com") || host_matches(&host, "x.com") {
            return Some(Platform::Twitter);
        }
        if host_matches(&host, "t.co") {
            return Some(Platform::Shortener);
        }
        if PASSTHROUGH_HOSTS.iter().any(|d| host_matches(&host, d)) {
            return Some(Platform::Other);
        }
        None
    }
}

/// A validated, platform-normalized track URL.
///
/// The queue stores only `CanonicalUrl`s; construction normally happens in
/// the validator, never from raw user input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalUrl {
    url: String,
    platform: Platform,
}

impl CanonicalUrl {
    pub(crate) fn new(url: impl Into<String>, platform: Platform) -> Self {
        Self {
            url: url.into(),
            platform,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Extract the platform-native video identifier, if the URL shape has one.
    ///
    /// Covers the observed URL shapes: `youtu.be/<id>`, `/watch?v=<id>`,
    /// `/live/<id>`, `/shorts/<id>`, `/embed/<id>`, NicoVideo `sm`/`nm`/`so`
    /// ids, and the tweet status id.
    pub fn video_id(&self) -> Option<String> {
        video_id_for(&self.url, self.platform)
    }
}

impl std::fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Video-id extraction shared with the validator (which needs ids before a
/// `CanonicalUrl` exists).
pub(crate) fn video_id_for(raw: &str, platform: Platform) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let path = parsed.path();

    match platform {
        Platform::Youtube => {
            if host_matches(&host, "youtu.be") {
                let id = path.trim_start_matches('/');
                return (!id.is_empty()).then(|| id.split('/').next().unwrap_or(id).to_string());
            }
            for prefix in ["/live/", "/shorts/", "/embed/"] {
                if let Some(rest) = path.strip_prefix(prefix) {
                    let id = rest.split('/').next().unwrap_or(rest);
                    return (!id.is_empty()).then(|| id.to_string());
                }
            }
            parsed
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned())
        }
        Platform::NicoVideo => {
            // Ids look like sm12345 / nm12345 / so12345, always the last segment.
            let segment = path.trim_end_matches('/').rsplit('/').next()?;
            ["sm", "nm", "so"]
                .iter()
                .any(|p| segment.starts_with(p))
                .then(|| segment.to_string())
        }
        Platform::Twitter => {
            let mut segments = path.trim_matches('/').split('/');
            // /<user>/status/<id>[/video/<n>]
            segments
                .position(|s| s == "status")
                .and_then(|_| segments.next())
                .map(|id| id.to_string())
        }
        Platform::Shortener | Platform::Other => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_youtube_forms() {
        for raw in [
            "https://www.youtube.com/watch?v=abc123",
            "https://youtu.be/abc123",
            "https://music.youtube.com/watch?v=abc123",
            "https://www.youtube.com/live/abc123",
        ] {
            assert_eq!(Platform::classify(raw), Some(Platform::Youtube), "{raw}");
        }
    }

    #[test]
    fn classify_other_platforms() {
        assert_eq!(
            Platform::classify("https://www.nicovideo.jp/watch/sm9"),
            Some(Platform::NicoVideo)
        );
        assert_eq!(
            Platform::classify("https://nico.ms/sm9"),
            Some(Platform::NicoVideo)
        );
        assert_eq!(
            Platform::classify("https://x.com/user/status/123"),
            Some(Platform::Twitter)
        );
        assert_eq!(
            Platform::classify("https://t.co/abcdef"),
            Some(Platform::Shortener)
        );
        assert_eq!(
            Platform::classify("https://soundcloud.com/artist/track"),
            Some(Platform::Other)
        );
    }

    #[test]
    fn classify_rejects_unknown_hosts() {
        assert_eq!(Platform::classify("https://video.example/watch?v=1"), None);
        assert_eq!(Platform::classify("not a url"), None);
        // Substring lookalikes must not match the allowlist.
        assert_eq!(Platform::classify("https://notyoutube.example/watch"), None);
    }

    #[test]
    fn youtube_video_id_extraction() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://youtu.be/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/live/jfKfPfyJRdk", "jfKfPfyJRdk"),
            ("https://www.youtube.com/shorts/abc", "abc"),
            (
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL123",
                "dQw4w9WgXcQ",
            ),
        ];
        for (raw, want) in cases {
            assert_eq!(
                video_id_for(raw, Platform::Youtube).as_deref(),
                Some(want),
                "{raw}"
            );
        }
    }

    #[test]
    fn nico_video_id_extraction() {
        assert_eq!(
            video_id_for("https://www.nicovideo.jp/watch/sm12345", Platform::NicoVideo).as_deref(),
            Some("sm12345")
        );
        assert_eq!(
            video_id_for("https://www.nicovideo.jp/watch/so999", Platform::NicoVideo).as_deref(),
            Some("so999")
        );
        assert_eq!(
            video_id_for("https://www.nicovideo.jp/ranking", Platform::NicoVideo),
            None
        );
    }

    #[test]
    fn twitter_status_id_extraction() {
        assert_eq!(
            video_id_for(
                "https://twitter.com/user/status/112233/video/1",
                Platform::Twitter
            )
            .as_deref(),
            Some("112233")
        );
        assert_eq!(
            video_id_for("https://x.com/user/status/445566", Platform::Twitter).as_deref(),
            Some("445566")
        );
    }
}
