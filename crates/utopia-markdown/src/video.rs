//! Video URL recognition
//!
//! Recognizes YouTube and Rumble links and converts between the canonical
//! URL stored in markdown, the embed URL loaded in an iframe and the
//! `(provider, video id)` pair held by a video embed node.
//!
//! Accepted forms:
//! - `https://[www.]youtube.com/watch?v=ID[&...][#...]` (ID: 10-12 of `[a-zA-Z0-9_-]`)
//! - `https://youtu.be/ID[?...][#...]`
//! - `https://rumble.com/embed/ID[/...]` (ID: alphanumeric)
//!
//! Anything else, including regular Rumble video pages, is not a video.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static YOUTUBE_LONG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?youtube\.com/watch\?v=([a-zA-Z0-9_-]{10,12})(?:[&#]\S*)?$")
        .expect("youtube watch regex")
});

static YOUTUBE_SHORT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://youtu\.be/([a-zA-Z0-9_-]{10,12})(?:[?#]\S*)?$")
        .expect("youtube short regex")
});

static RUMBLE_EMBED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?rumble\.com/embed/([a-zA-Z0-9]+)(?:/\S*)?$")
        .expect("rumble embed regex")
});

static MARKDOWN_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([^\]\n]*)\]\(([^)\s]+)\)").expect("markdown link regex")
});

static AUTOLINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<(https?://[^>\s]+)>").expect("autolink regex"));

/// Video hosting provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoProvider {
    YouTube,
    Rumble,
}

impl VideoProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoProvider::YouTube => "youtube",
            VideoProvider::Rumble => "rumble",
        }
    }
}

impl fmt::Display for VideoProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youtube" => Ok(VideoProvider::YouTube),
            "rumble" => Ok(VideoProvider::Rumble),
            _ => Err(()),
        }
    }
}

/// A recognized video
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoRef {
    pub provider: VideoProvider,
    pub video_id: String,
}

impl VideoRef {
    pub fn new(provider: VideoProvider, video_id: impl Into<String>) -> Self {
        Self {
            provider,
            video_id: video_id.into(),
        }
    }

    pub fn canonical_url(&self) -> String {
        canonical_url(self.provider, &self.video_id)
    }

    pub fn embed_url(&self) -> String {
        embed_url(self.provider, &self.video_id)
    }
}

/// Strip everything outside `[a-zA-Z0-9_-]` from a video id
pub fn sanitize_video_id(video_id: &str) -> String {
    video_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// URL written to markdown
pub fn canonical_url(provider: VideoProvider, video_id: &str) -> String {
    let id = sanitize_video_id(video_id);
    match provider {
        VideoProvider::YouTube => format!("https://www.youtube.com/watch?v={id}"),
        VideoProvider::Rumble => format!("https://rumble.com/embed/{id}"),
    }
}

/// URL loaded by the iframe
pub fn embed_url(provider: VideoProvider, video_id: &str) -> String {
    let id = sanitize_video_id(video_id);
    match provider {
        VideoProvider::YouTube => format!("https://www.youtube-nocookie.com/embed/{id}"),
        VideoProvider::Rumble => format!("https://rumble.com/embed/{id}/"),
    }
}

/// Recognize a bare video URL
pub fn parse_video_url(url: &str) -> Option<VideoRef> {
    let url = url.trim();
    if let Some(caps) = YOUTUBE_LONG_REGEX.captures(url) {
        return Some(VideoRef::new(VideoProvider::YouTube, &caps[1]));
    }
    if let Some(caps) = YOUTUBE_SHORT_REGEX.captures(url) {
        return Some(VideoRef::new(VideoProvider::YouTube, &caps[1]));
    }
    if let Some(caps) = RUMBLE_EMBED_REGEX.captures(url) {
        return Some(VideoRef::new(VideoProvider::Rumble, &caps[1]));
    }
    None
}

/// Recognize an autolink `<url>` at the start of `src`.
///
/// Returns the video and the number of bytes consumed.
pub fn match_autolink(src: &str) -> Option<(VideoRef, usize)> {
    let caps = AUTOLINK_REGEX.captures(src)?;
    let video = parse_video_url(&caps[1])?;
    Some((video, caps[0].len()))
}

/// Recognize a markdown link `[text](url)` at the start of `src`
pub fn match_markdown_link(src: &str) -> Option<(VideoRef, usize)> {
    let caps = MARKDOWN_LINK_REGEX.captures(src)?;
    let video = parse_video_url(&caps[2])?;
    Some((video, caps[0].len()))
}

/// Recognize pasted text consisting of a single video URL
pub fn match_pasted_text(text: &str) -> Option<VideoRef> {
    let text = text.trim();
    if text.is_empty() || text.contains(char::is_whitespace) {
        return None;
    }
    parse_video_url(text)
}
