//! # Yt Parser
//!
//! This module turns raw YouTube payloads into the pipeline's domain types:
//! Data API search results into [`Video`]s, the watch page into the innertube
//! API key, and `json3` timed text into transcript snippets.

use std::{ops::Deref, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::{
    domain::{ChannelId, TranscriptSnippet, Video},
    error::Error,
    types::{CaptionTrack, ListResponse, SearchResult, TimedText},
};

static INNERTUBE_API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).unwrap());

static CONSENT_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="v" value="(.*?)""#).unwrap());

/// Parses the videos out of a `search.list` response.
///
/// # Parameters
/// * `response`: The deserialized search response.
/// * `channel_id`: The channel the search was scoped to.
///
/// # Returns
/// * `Ok(Vec<Video>)` in the order the API returned them (newest first for `order=date`).
/// * `Err(Error)` if a video item carries an unparseable `publishedAt`.
#[tracing::instrument(skip(response), fields(items = response.items.len()))]
pub fn parse_search_results(
    response: ListResponse<SearchResult>,
    channel_id: &ChannelId,
) -> Result<Vec<Video>, Error> {
    let mut videos = Vec::with_capacity(response.items.len());

    for item in response.items {
        // `type=video` should already guarantee this, playlists and channels have no video id
        let Some(video_id) = item.id.video_id else {
            tracing::debug!(kind = %item.id.kind, "Skipping non-video search result");
            continue;
        };

        let published_at = parse_rfc3339(&item.snippet.published_at)?;

        videos.push(Video {
            video_id,
            title: html_escape::decode_html_entities(&item.snippet.title).into_owned(),
            description: html_escape::decode_html_entities(&item.snippet.description)
                .into_owned(),
            published_at,
            channel_id: channel_id.clone(),
        });
    }

    Ok(videos)
}

fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| Error::InvalidTimestamp {
            value: value.to_string(),
            source,
        })
}

/// Picks the caption track to download.
///
/// Languages are tried in preference order; for each language a manually
/// created track wins over an automatically generated one.
pub fn select_caption_track<'a>(
    tracks: &'a [CaptionTrack],
    languages: &[String],
) -> Option<&'a CaptionTrack> {
    languages.iter().find_map(|lang| {
        let mut candidates = tracks.iter().filter(|t| &t.language_code == lang);
        let manual = candidates.clone().find(|t| !t.is_generated());
        manual.or_else(|| candidates.next())
    })
}

/// Flattens `json3` timed text into snippets.
///
/// Events without segments (window/style events) and whitespace-only events
/// are dropped. Newlines inside an event are collapsed to spaces.
pub fn parse_timed_text(timed_text: TimedText) -> Vec<TranscriptSnippet> {
    timed_text
        .events
        .into_iter()
        .filter_map(|event| {
            let text = event
                .segs?
                .into_iter()
                .map(|seg| seg.utf8)
                .collect::<String>()
                .replace('\n', " ");
            let text = text.trim();

            (!text.is_empty()).then(|| TranscriptSnippet {
                text: text.to_string(),
                start: event.t_start_ms as f64 / 1000.0,
                duration: event.d_duration_ms as f64 / 1000.0,
            })
        })
        .collect()
}

/// The HTML of a `youtube.com/watch` page.
pub struct YtHtmlDocument(String);

impl Deref for YtHtmlDocument {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl YtHtmlDocument {
    pub fn new(doc: String) -> Self {
        YtHtmlDocument(doc)
    }

    /// Extracts the innertube API key embedded in the page's `ytcfg`.
    pub fn innertube_api_key(&self) -> Result<&str, Error> {
        INNERTUBE_API_KEY_RE
            .captures(self)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str())
            .ok_or(Error::ParseError(
                "Failed to extract INNERTUBE_API_KEY from the watch page",
            ))
    }

    /// Whether YouTube served the EU cookie consent interstitial instead of the video page.
    pub fn is_consent_page(&self) -> bool {
        self.contains(r#"action="https://consent.youtube.com/s""#)
    }

    /// The value to send back in the `CONSENT` cookie to get past the interstitial.
    pub fn consent_value(&self) -> Result<&str, Error> {
        CONSENT_VALUE_RE
            .captures(self)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str())
            .ok_or(Error::ParseError(
                "Failed to extract consent value from the consent page",
            ))
    }

    /// Whether YouTube answered with a captcha, which means the IP is blocked.
    pub fn is_captcha_page(&self) -> bool {
        self.contains(r#"class="g-recaptcha""#)
    }
}

impl From<String> for YtHtmlDocument {
    fn from(value: String) -> Self {
        YtHtmlDocument(value)
    }
}
