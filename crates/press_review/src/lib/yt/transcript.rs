use std::fmt;

use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;

use crate::{
    domain::Transcript,
    http,
    parser::{parse_timed_text, select_caption_track, YtHtmlDocument},
    types::{
        CaptionTrack, InnertubeClient, InnertubeContext, InnertubePlayerRequest, PlayerResponse,
        TimedText,
    },
    yt::TranscriptFetcher,
};

#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
    #[error("YouTube responded with {status}: {message}")]
    Api { status: u16, message: String },
    #[error(transparent)]
    Parse(#[from] crate::error::Error),
    #[error("YouTube is blocking requests from this IP")]
    IpBlocked,
    #[error("YouTube is asking to confirm this is not a bot")]
    RequestBlocked,
    #[error("Failed to get past the cookie consent page")]
    ConsentRequired,
    #[error("The video is no longer available")]
    VideoUnavailable,
    #[error("The video is age restricted")]
    AgeRestricted,
    #[error("The video is unplayable: {reason}")]
    VideoUnplayable { reason: String },
    #[error("Subtitles are disabled for this video")]
    TranscriptsDisabled,
    #[error("No transcript found for languages {requested:?}, available: {available:?}")]
    NoTranscriptFound {
        requested: Vec<String>,
        available: Vec<String>,
    },
}

/// Credentials for Webshare's rotating residential proxy.
#[derive(Clone)]
pub struct WebshareProxy {
    pub username: String,
    pub password: String,
}

impl WebshareProxy {
    const DOMAIN: &'static str = "p.webshare.io";
    const PORT: u16 = 80;

    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Proxy URL; the `-rotate` suffix makes webshare assign a new exit IP per connection.
    pub fn url(&self) -> String {
        format!(
            "http://{}-rotate:{}@{}:{}",
            self.username,
            self.password,
            Self::DOMAIN,
            Self::PORT
        )
    }
}

impl fmt::Debug for WebshareProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebshareProxy")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Fetches transcripts the way YouTube's own clients do: watch page for the
/// innertube key, `player` endpoint for the caption tracks, then the timed text.
#[derive(Debug, Clone)]
pub struct InnertubeTranscriptClient {
    client: ClientWithMiddleware,
    languages: Vec<String>,
    base_url: String,
}

impl InnertubeTranscriptClient {
    const BASE_URL: &'static str = "https://www.youtube.com";
    const CLIENT_NAME: &'static str = "ANDROID";
    const CLIENT_VERSION: &'static str = "20.10.38";

    pub fn new(client: ClientWithMiddleware, languages: Vec<String>) -> Self {
        Self {
            client,
            languages,
            base_url: Self::BASE_URL.into(),
        }
    }

    /// Routes every transcript request through the rotating proxy.
    pub fn with_proxy(proxy: &WebshareProxy, languages: Vec<String>) -> reqwest::Result<Self> {
        let client = http::client_builder()
            .proxy(reqwest::Proxy::all(proxy.url())?)
            // no pooled connections, so every request gets a fresh exit IP
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self::new(http::with_retries(client), languages))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn get_html(
        &self,
        url: &str,
        cookie: Option<&str>,
    ) -> Result<YtHtmlDocument, TranscriptError> {
        let mut request = self
            .client
            .get(url)
            .header("Accept-Language", "en-US,en;q=0.9");
        if let Some(cookie) = cookie {
            request = request.header("Cookie", cookie);
        }

        let resp = request
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;
        let resp = error_for_status(resp).await?;

        Ok(resp.text().await?.into())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_watch_page(&self, video_id: &str) -> Result<YtHtmlDocument, TranscriptError> {
        let url = format!("{}/watch?v={video_id}", self.base_url);
        let doc = self.get_html(&url, None).await?;
        if !doc.is_consent_page() {
            return Ok(doc);
        }

        tracing::debug!("Hit cookie consent page, retrying with consent cookie");
        let cookie = format!("CONSENT=YES+{}", doc.consent_value()?);
        let doc = self.get_html(&url, Some(&cookie)).await?;
        if doc.is_consent_page() {
            return Err(TranscriptError::ConsentRequired);
        }

        Ok(doc)
    }

    #[tracing::instrument(skip(self, api_key))]
    async fn fetch_player(
        &self,
        video_id: &str,
        api_key: &str,
    ) -> Result<PlayerResponse, TranscriptError> {
        let body = InnertubePlayerRequest {
            context: InnertubeContext {
                client: InnertubeClient {
                    client_name: Self::CLIENT_NAME,
                    client_version: Self::CLIENT_VERSION,
                },
            },
            video_id,
        };

        let resp = self
            .client
            .post(format!("{}/youtubei/v1/player", self.base_url))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;
        let resp = error_for_status(resp).await?;

        Ok(resp.json::<PlayerResponse>().await?)
    }

    #[tracing::instrument(skip_all, fields(language = %track.language_code))]
    async fn fetch_timed_text(&self, track: &CaptionTrack) -> Result<TimedText, TranscriptError> {
        let resp = self
            .client
            .get(timed_text_url(&track.base_url)?)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;
        let resp = error_for_status(resp).await?;

        Ok(resp.json::<TimedText>().await?)
    }
}

impl TranscriptFetcher for InnertubeTranscriptClient {
    type Error = TranscriptError;

    #[tracing::instrument(skip(self))]
    async fn fetch_transcript(&self, video_id: &str) -> Result<Transcript, Self::Error> {
        let watch_page = self.fetch_watch_page(video_id).await?;
        let api_key = match watch_page.innertube_api_key() {
            Ok(key) => key,
            Err(_) if watch_page.is_captcha_page() => return Err(TranscriptError::IpBlocked),
            Err(e) => return Err(e.into()),
        };

        let player = self.fetch_player(video_id, api_key).await?;
        check_playability(&player)?;

        let tracks = caption_tracks(&player)?;
        let track = select_caption_track(tracks, &self.languages).ok_or_else(|| {
            TranscriptError::NoTranscriptFound {
                requested: self.languages.clone(),
                available: tracks.iter().map(|t| t.language_code.clone()).collect(),
            }
        })?;

        let timed_text = self.fetch_timed_text(track).await?;
        let snippets = parse_timed_text(timed_text);
        tracing::debug!(snippets = snippets.len(), "Fetched transcript");

        Ok(Transcript {
            video_id: video_id.to_string(),
            language_code: track.language_code.clone(),
            is_generated: track.is_generated(),
            snippets,
        })
    }
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, TranscriptError> {
    match resp.status() {
        status if status.is_success() => Ok(resp),
        StatusCode::TOO_MANY_REQUESTS => Err(TranscriptError::IpBlocked),
        status => Err(TranscriptError::Api {
            status: status.as_u16(),
            message: resp.text().await.unwrap_or_default(),
        }),
    }
}

fn check_playability(player: &PlayerResponse) -> Result<(), TranscriptError> {
    let Some(status) = &player.playability_status else {
        return Ok(());
    };
    if status.status == "OK" {
        return Ok(());
    }

    let reason = status.reason.clone().unwrap_or_default();
    match status.status.as_str() {
        "LOGIN_REQUIRED" if reason.contains("not a bot") => Err(TranscriptError::RequestBlocked),
        "LOGIN_REQUIRED" if reason.contains("inappropriate") => {
            Err(TranscriptError::AgeRestricted)
        }
        "ERROR" if reason.contains("unavailable") => Err(TranscriptError::VideoUnavailable),
        _ => Err(TranscriptError::VideoUnplayable { reason }),
    }
}

fn caption_tracks(player: &PlayerResponse) -> Result<&[CaptionTrack], TranscriptError> {
    player
        .captions
        .as_ref()
        .and_then(|c| c.player_captions_tracklist_renderer.as_ref())
        .map(|renderer| renderer.caption_tracks.as_slice())
        .filter(|tracks| !tracks.is_empty())
        .ok_or(TranscriptError::TranscriptsDisabled)
}

/// Track URLs come with `fmt=srv3` (XML); ask for `json3` instead.
fn timed_text_url(base_url: &str) -> Result<reqwest::Url, TranscriptError> {
    let mut url = reqwest::Url::parse(base_url)
        .map_err(|_| crate::error::Error::ParseError("Invalid caption track URL"))?;

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "fmt")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("fmt", "json3");

    Ok(url)
}
