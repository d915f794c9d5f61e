pub mod data_api;
pub mod transcript;

use std::{fmt::Display, future::Future};

use crate::domain::{ChannelId, Transcript, Video};

/// Lists a channel's uploads.
pub trait VideoLister {
    const BASE_URL: &'static str;

    type Error: Display + Send;

    /// Most recent videos first, at most `max_results` of them.
    fn latest_videos(
        &self,
        channel_id: &ChannelId,
        max_results: u8,
    ) -> impl Future<Output = Result<Vec<Video>, Self::Error>> + Send;

    /// Display name of the channel, `None` when the channel does not exist.
    fn channel_title(
        &self,
        channel_id: &ChannelId,
    ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send;
}

pub trait TranscriptFetcher {
    type Error: Display + Send;

    fn fetch_transcript(
        &self,
        video_id: &str,
    ) -> impl Future<Output = Result<Transcript, Self::Error>> + Send;
}
