use chrono::TimeDelta;

use crate::{
    domain::ChannelId,
    notify::Notifier,
    yt::{TranscriptFetcher, VideoLister},
    PressReviewProcessor, Summarizer,
};

pub struct PressReviewProcessorBuilder<L = (), T = (), S = (), N = ()> {
    channel_ids: Vec<ChannelId>,
    lister: L,
    transcriber: T,
    summarizer: S,
    notifier: N,
    lookback: TimeDelta,
    max_videos_per_channel: u8,
}

impl PressReviewProcessorBuilder {
    pub const DEFAULT_LOOKBACK_HOURS: i64 = 6;
    pub const DEFAULT_MAX_VIDEOS_PER_CHANNEL: u8 = 1;

    pub fn new(channel_ids: impl IntoIterator<Item = ChannelId>) -> Self {
        Self {
            channel_ids: channel_ids.into_iter().collect(),
            lister: (),
            transcriber: (),
            summarizer: (),
            notifier: (),
            lookback: TimeDelta::hours(Self::DEFAULT_LOOKBACK_HOURS),
            max_videos_per_channel: Self::DEFAULT_MAX_VIDEOS_PER_CHANNEL,
        }
    }
}

impl<L, T, S, N> PressReviewProcessorBuilder<L, T, S, N> {
    pub fn lister<L2: VideoLister + Send + Sync + 'static>(
        self,
        lister: L2,
    ) -> PressReviewProcessorBuilder<L2, T, S, N> {
        PressReviewProcessorBuilder {
            channel_ids: self.channel_ids,
            lister,
            transcriber: self.transcriber,
            summarizer: self.summarizer,
            notifier: self.notifier,
            lookback: self.lookback,
            max_videos_per_channel: self.max_videos_per_channel,
        }
    }

    pub fn transcriber<T2: TranscriptFetcher + Send + Sync + 'static>(
        self,
        transcriber: T2,
    ) -> PressReviewProcessorBuilder<L, T2, S, N> {
        PressReviewProcessorBuilder {
            channel_ids: self.channel_ids,
            lister: self.lister,
            transcriber,
            summarizer: self.summarizer,
            notifier: self.notifier,
            lookback: self.lookback,
            max_videos_per_channel: self.max_videos_per_channel,
        }
    }

    pub fn summarizer<S2: Summarizer + Send + Sync + 'static>(
        self,
        summarizer: S2,
    ) -> PressReviewProcessorBuilder<L, T, S2, N> {
        PressReviewProcessorBuilder {
            channel_ids: self.channel_ids,
            lister: self.lister,
            transcriber: self.transcriber,
            summarizer,
            notifier: self.notifier,
            lookback: self.lookback,
            max_videos_per_channel: self.max_videos_per_channel,
        }
    }

    pub fn notifier<N2: Notifier + Send + Sync + 'static>(
        self,
        notifier: N2,
    ) -> PressReviewProcessorBuilder<L, T, S, N2> {
        PressReviewProcessorBuilder {
            channel_ids: self.channel_ids,
            lister: self.lister,
            transcriber: self.transcriber,
            summarizer: self.summarizer,
            notifier,
            lookback: self.lookback,
            max_videos_per_channel: self.max_videos_per_channel,
        }
    }

    /// How old a video may be and still count as new.
    pub fn lookback(mut self, lookback: TimeDelta) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn max_videos_per_channel(mut self, max_videos_per_channel: u8) -> Self {
        // the search endpoint accepts 0..=50, 0 would never find anything
        self.max_videos_per_channel = max_videos_per_channel.clamp(1, 50);
        self
    }
}

impl<L, T, S, N> PressReviewProcessorBuilder<L, T, S, N>
where
    L: VideoLister + Send + Sync + 'static,
    T: TranscriptFetcher + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
    N: Notifier + Send + Sync + 'static,
{
    pub fn build(self) -> PressReviewProcessor<L, T, S, N> {
        PressReviewProcessor {
            lister: self.lister,
            transcriber: self.transcriber,
            summarizer: self.summarizer,
            notifier: self.notifier,
            channel_ids: self.channel_ids,
            lookback: self.lookback,
            max_videos_per_channel: self.max_videos_per_channel,
        }
    }
}
