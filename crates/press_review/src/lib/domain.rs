use std::{fmt, str::FromStr, sync::LazyLock};

use chrono::{DateTime, TimeDelta, Utc};
use itertools::Itertools;
use regex::Regex;

use crate::error::Error;

static CHANNEL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^UC[0-9A-Za-z_-]{22}$").unwrap());

pub const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch";

/// A YouTube channel identifier, e.g. `UC_x5XG1OV2P6uZZ5FSM9Ttw`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ChannelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if CHANNEL_ID_RE.is_match(s) {
            Ok(ChannelId(s.to_string()))
        } else {
            Err(Error::InvalidChannelId(s.to_string()))
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses a comma separated list of channel ids.
///
/// Blank entries (e.g. a trailing comma) are skipped, any malformed entry
/// fails the whole list.
pub fn parse_channel_ids(raw: &str) -> Result<Vec<ChannelId>, Error> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ChannelId::from_str)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Video {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub channel_id: ChannelId,
}

impl Video {
    pub fn url(&self) -> String {
        watch_url(&self.video_id)
    }

    /// Whether the video was published no longer than `lookback` before `now`.
    /// Timestamps in the future count as recent.
    pub fn is_recent(&self, now: DateTime<Utc>, lookback: TimeDelta) -> bool {
        now.signed_duration_since(self.published_at) <= lookback
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("{YOUTUBE_WATCH_URL}?v={video_id}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSnippet {
    pub text: String,
    /// Offset from the start of the video, in seconds
    pub start: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub video_id: String,
    pub language_code: String,
    pub is_generated: bool,
    pub snippets: Vec<TranscriptSnippet>,
}

impl Transcript {
    /// Snippet texts joined by newlines, without timing information.
    pub fn to_plain_text(&self) -> String {
        self.snippets.iter().map(|s| s.text.as_str()).join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.iter().all(|s| s.text.trim().is_empty())
    }
}
