pub mod builder;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    domain::{ChannelId, Video},
    notify::{
        message::{error_alert, new_video_alert, ErrorSubject, UNKNOWN_CHANNEL},
        Notifier,
    },
    yt::{TranscriptFetcher, VideoLister},
    Summarizer, SummaryRequest,
};

/// Counters for a single pass over the configured channels.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub channels_checked: usize,
    pub channels_failed: usize,
    pub videos_found: usize,
    pub videos_skipped_stale: usize,
    pub videos_notified: usize,
    pub videos_failed: usize,
}

enum VideoOutcome {
    Notified,
    Failed,
}

// Checks channels for new uploads, summarizes them and posts the summaries
#[derive(Debug)]
pub struct PressReviewProcessor<L, T, S, N>
where
    L: VideoLister + Send + Sync + 'static,
    T: TranscriptFetcher + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
    N: Notifier + Send + Sync + 'static,
{
    lister: L,
    transcriber: T,
    summarizer: S,
    notifier: N,
    channel_ids: Vec<ChannelId>,
    lookback: TimeDelta,
    max_videos_per_channel: u8,
}

impl<L, T, S, N> PressReviewProcessor<L, T, S, N>
where
    L: VideoLister + Send + Sync + 'static,
    T: TranscriptFetcher + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
    N: Notifier + Send + Sync + 'static,
{
    pub fn channel_ids(&self) -> &[ChannelId] {
        &self.channel_ids
    }

    pub async fn run(&self) -> anyhow::Result<RunReport> {
        self.run_at(Utc::now()).await
    }

    /// Runs the pipeline as if the current time were `now`.
    ///
    /// Failures are contained per channel and per video: each one is reported
    /// to the chat and the run moves on. The run itself only fails when not a
    /// single channel could be listed.
    #[tracing::instrument(skip(self), fields(channels = self.channel_ids.len()))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> anyhow::Result<RunReport> {
        let mut report = RunReport::default();

        for channel_id in &self.channel_ids {
            report.channels_checked += 1;

            let Some(videos) = self.list_videos(channel_id).await else {
                report.channels_failed += 1;
                continue;
            };
            if videos.is_empty() {
                tracing::info!(%channel_id, "No videos found for channel");
                continue;
            }
            report.videos_found += videos.len();

            let (recent, stale): (Vec<_>, Vec<_>) = videos
                .into_iter()
                .partition(|video| video.is_recent(now, self.lookback));
            report.videos_skipped_stale += stale.len();
            if recent.is_empty() {
                tracing::info!(
                    %channel_id,
                    lookback_hours = self.lookback.num_hours(),
                    "No new videos within the lookback window"
                );
                continue;
            }

            for video in &recent {
                match self.process_video(video).await {
                    VideoOutcome::Notified => report.videos_notified += 1,
                    VideoOutcome::Failed => report.videos_failed += 1,
                }
            }
        }

        tracing::info!(?report, "Finished checking channels");

        if report.channels_checked > 0 && report.channels_failed == report.channels_checked {
            anyhow::bail!(
                "Failed to list videos for all {} configured channels",
                report.channels_checked
            );
        }

        Ok(report)
    }

    async fn list_videos(&self, channel_id: &ChannelId) -> Option<Vec<Video>> {
        match self
            .lister
            .latest_videos(channel_id, self.max_videos_per_channel)
            .await
        {
            Ok(videos) => Some(videos),
            Err(e) => {
                let error_message =
                    format!("Error getting latest video from channel {channel_id}: {e}");
                tracing::error!(%channel_id, error = %e, "Failed to list channel videos");
                self.send_error_alert(ErrorSubject::Channel(channel_id.as_str()), &error_message)
                    .await;
                None
            }
        }
    }

    #[tracing::instrument(skip_all, fields(video_id = %video.video_id, channel_id = %video.channel_id))]
    async fn process_video(&self, video: &Video) -> VideoOutcome {
        let transcript = match self.transcriber.fetch_transcript(&video.video_id).await {
            Ok(transcript) if !transcript.is_empty() => transcript,
            Ok(_) => {
                tracing::warn!("Transcript is empty");
                return self.fail(video, "No transcription available").await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch transcript");
                let message = format!("Error getting video transcription: {e}");
                return self.fail(video, &message).await;
            }
        };

        let transcript_text = transcript.to_plain_text();
        let request = SummaryRequest::new(video, &transcript_text);
        let summary = match self.summarizer.summarize(&request).await {
            Ok(response) => response.summary,
            Err(e) => {
                tracing::error!(error = %e, "Failed to summarize transcript");
                let message = format!("Error generating summary with Gemini: {e}");
                return self.fail(video, &message).await;
            }
        };

        let channel_name = self.channel_name(&video.channel_id).await;
        let message = new_video_alert(&channel_name, video, &summary);

        match self.notifier.send_message(&message).await {
            Ok(()) => {
                tracing::info!("Video summary sent");
                VideoOutcome::Notified
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to send video summary");
                VideoOutcome::Failed
            }
        }
    }

    async fn channel_name(&self, channel_id: &ChannelId) -> String {
        match self.lister.channel_title(channel_id).await {
            Ok(Some(title)) => title,
            Ok(None) => UNKNOWN_CHANNEL.to_string(),
            Err(e) => {
                tracing::warn!(%channel_id, error = %e, "Failed to look up channel title");
                UNKNOWN_CHANNEL.to_string()
            }
        }
    }

    async fn fail(&self, video: &Video, error_message: &str) -> VideoOutcome {
        self.send_error_alert(ErrorSubject::Video(video), error_message)
            .await;
        VideoOutcome::Failed
    }

    async fn send_error_alert(&self, subject: ErrorSubject<'_>, error_message: &str) {
        let message = error_alert(subject, error_message);
        if let Err(e) = self.notifier.send_message(&message).await {
            tracing::error!(error = %e, "Failed to send error notification");
        }
    }
}
