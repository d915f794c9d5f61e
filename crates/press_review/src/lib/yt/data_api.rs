use std::fmt;

use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;

use crate::{
    domain::{ChannelId, Video},
    parser::parse_search_results,
    types::{ChannelResource, GoogleApiErrorBody, ListResponse, SearchResult},
    yt::VideoLister,
};

#[derive(Debug, thiserror::Error)]
pub enum YouTubeError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
    #[error("YouTube API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error(transparent)]
    Parse(#[from] crate::error::Error),
}

/// Client for the YouTube Data API v3, authenticated with an API key.
#[derive(Clone)]
pub struct YouTubeDataClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for YouTubeDataClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YouTubeDataClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl YouTubeDataClient {
    pub fn new(client: ClientWithMiddleware, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: Self::BASE_URL.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn get<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, &str)],
    ) -> Result<T, YouTubeError> {
        let resp = self
            .client
            .get(format!("{}/{resource}", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .query(params)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoogleApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(YouTubeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json::<T>().await?)
    }
}

impl VideoLister for YouTubeDataClient {
    const BASE_URL: &'static str = "https://www.googleapis.com/youtube/v3";

    type Error = YouTubeError;

    #[tracing::instrument(skip_all, fields(channel_id = %channel_id, max_results = max_results))]
    async fn latest_videos(
        &self,
        channel_id: &ChannelId,
        max_results: u8,
    ) -> Result<Vec<Video>, Self::Error> {
        let max_results = max_results.to_string();
        let response = self
            .get::<ListResponse<SearchResult>>(
                "search",
                &[
                    ("part", "snippet"),
                    ("channelId", channel_id.as_str()),
                    ("maxResults", max_results.as_str()),
                    ("order", "date"),
                    ("type", "video"),
                ],
            )
            .await?;

        Ok(parse_search_results(response, channel_id)?)
    }

    #[tracing::instrument(skip_all, fields(channel_id = %channel_id))]
    async fn channel_title(&self, channel_id: &ChannelId) -> Result<Option<String>, Self::Error> {
        let response = self
            .get::<ListResponse<ChannelResource>>(
                "channels",
                &[("part", "snippet"), ("id", channel_id.as_str())],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .next()
            .map(|channel| channel.snippet.title))
    }
}
