use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use press_review::{
    domain::{ChannelId, Video},
    yt::VideoLister,
};

#[derive(Clone, Default)]
pub struct MockVideoLister {
    pub videos: HashMap<String, Vec<Video>>,
    pub failing_channels: HashSet<String>,
    pub channel_title: Option<String>,
    pub title_fails: bool,
    pub calls: Arc<Mutex<Vec<(String, u8)>>>,
}

impl MockVideoLister {
    pub fn new(videos: impl IntoIterator<Item = Video>) -> Self {
        let mut by_channel: HashMap<String, Vec<Video>> = HashMap::new();
        for video in videos {
            by_channel
                .entry(video.channel_id.to_string())
                .or_default()
                .push(video);
        }

        Self {
            videos: by_channel,
            channel_title: Some("Mock Channel".to_string()),
            ..Default::default()
        }
    }

    pub fn failing_for(mut self, channel_id: &str) -> Self {
        self.failing_channels.insert(channel_id.to_string());
        self
    }
}

impl VideoLister for MockVideoLister {
    const BASE_URL: &'static str = "https://youtube.com/mock";

    type Error = anyhow::Error;

    async fn latest_videos(
        &self,
        channel_id: &ChannelId,
        max_results: u8,
    ) -> anyhow::Result<Vec<Video>> {
        self.calls
            .lock()
            .unwrap()
            .push((channel_id.to_string(), max_results));

        if self.failing_channels.contains(channel_id.as_str()) {
            return Err(anyhow::anyhow!("The request cannot be completed because you have exceeded your quota."));
        }

        Ok(self
            .videos
            .get(channel_id.as_str())
            .map(|videos| videos.iter().take(max_results as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn channel_title(&self, _channel_id: &ChannelId) -> anyhow::Result<Option<String>> {
        if self.title_fails {
            return Err(anyhow::anyhow!("channels.list failed"));
        }
        Ok(self.channel_title.clone())
    }
}
