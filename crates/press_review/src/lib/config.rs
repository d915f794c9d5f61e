use std::fmt;

use anyhow::Context;
use chrono::TimeDelta;

use crate::{
    domain::{parse_channel_ids, ChannelId},
    error::Error,
    http,
    notify::telegram::TelegramClient,
    yt::{
        data_api::YouTubeDataClient,
        transcript::{InnertubeTranscriptClient, WebshareProxy},
    },
    GeminiClient, PressReviewProcessor, PressReviewProcessorBuilder,
};

/// The processor wired to the real YouTube, Gemini and Telegram clients.
pub type DefaultProcessor =
    PressReviewProcessor<YouTubeDataClient, InnertubeTranscriptClient, GeminiClient, TelegramClient>;

/// Pipeline settings, read from flags or the environment.
#[derive(Clone, clap::Args)]
pub struct SettingsArgs {
    /// YouTube Data API v3 key
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    pub youtube_api_key: String,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: String,

    /// Chat the summaries are posted to, group chat ids are negative
    #[arg(long, env = "TELEGRAM_CHAT_ID", allow_hyphen_values = true)]
    pub telegram_chat_id: String,

    /// Comma separated YouTube channel ids
    #[arg(long, env = "YOUTUBE_CHANNEL_IDS")]
    pub youtube_channel_ids: String,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: String,

    /// Gemini model used for summaries
    #[arg(long, env = "GEMINI_MODEL", default_value = GeminiClient::DEFAULT_MODEL)]
    pub gemini_model: String,

    /// Webshare rotating proxy username, transcripts are fetched directly when unset
    #[arg(
        long,
        env = "WEBSHARE_PROXY_USERNAME",
        requires = "webshare_proxy_password"
    )]
    pub webshare_proxy_username: Option<String>,

    /// Webshare rotating proxy password
    #[arg(
        long,
        env = "WEBSHARE_PROXY_PASSWORD",
        requires = "webshare_proxy_username",
        hide_env_values = true
    )]
    pub webshare_proxy_password: Option<String>,

    /// How many hours back a video may have been published to count as new
    #[arg(long, env = "LOOKBACK_HOURS", default_value = "6", value_parser = clap::value_parser!(u32).range(1..))]
    pub lookback_hours: u32,

    /// How many of each channel's latest videos to look at
    #[arg(long, env = "MAX_VIDEOS_PER_CHANNEL", default_value = "1", value_parser = clap::value_parser!(u8).range(1..=50))]
    pub max_videos_per_channel: u8,

    /// Transcript languages in order of preference
    #[arg(
        long,
        env = "TRANSCRIPT_LANGUAGES",
        default_value = "en",
        value_delimiter = ','
    )]
    pub transcript_languages: Vec<String>,
}

#[derive(Clone)]
pub struct Settings {
    pub youtube_api_key: String,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub channel_ids: Vec<ChannelId>,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub proxy: Option<WebshareProxy>,
    pub lookback: TimeDelta,
    pub max_videos_per_channel: u8,
    pub transcript_languages: Vec<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("channel_ids", &self.channel_ids)
            .field("gemini_model", &self.gemini_model)
            .field("proxy", &self.proxy)
            .field("lookback", &self.lookback)
            .field("max_videos_per_channel", &self.max_videos_per_channel)
            .field("transcript_languages", &self.transcript_languages)
            .finish_non_exhaustive()
    }
}

impl TryFrom<SettingsArgs> for Settings {
    type Error = Error;

    fn try_from(args: SettingsArgs) -> Result<Self, Self::Error> {
        let channel_ids = parse_channel_ids(&args.youtube_channel_ids)?;

        let proxy = match (args.webshare_proxy_username, args.webshare_proxy_password) {
            (Some(username), Some(password)) => Some(WebshareProxy::new(username, password)),
            _ => None,
        };

        let transcript_languages = args
            .transcript_languages
            .into_iter()
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty())
            .collect();

        Ok(Settings {
            youtube_api_key: args.youtube_api_key,
            telegram_bot_token: args.telegram_bot_token,
            telegram_chat_id: args.telegram_chat_id,
            channel_ids,
            gemini_api_key: args.gemini_api_key,
            gemini_model: args.gemini_model,
            proxy,
            lookback: TimeDelta::hours(i64::from(args.lookback_hours)),
            max_videos_per_channel: args.max_videos_per_channel,
            transcript_languages,
        })
    }
}

impl Settings {
    /// Wires up the real API clients.
    pub fn build_processor(&self) -> anyhow::Result<DefaultProcessor> {
        let client = http::default_client().context("Failed to build HTTP client")?;
        let telegram_client = http::client_builder()
            .build()
            .context("Failed to build Telegram HTTP client")?;

        let transcriber = match &self.proxy {
            Some(proxy) => {
                tracing::info!(username = %proxy.username, "Fetching transcripts through webshare proxy");
                InnertubeTranscriptClient::with_proxy(proxy, self.transcript_languages.clone())
                    .context("Failed to build proxied HTTP client")?
            }
            None => InnertubeTranscriptClient::new(client.clone(), self.transcript_languages.clone()),
        };

        let processor = PressReviewProcessorBuilder::new(self.channel_ids.iter().cloned())
            .lister(YouTubeDataClient::new(client.clone(), &self.youtube_api_key))
            .transcriber(transcriber)
            .summarizer(
                GeminiClient::new(client, &self.gemini_api_key)
                    .with_model(&self.gemini_model),
            )
            .notifier(TelegramClient::new(
                telegram_client,
                &self.telegram_bot_token,
                &self.telegram_chat_id,
            ))
            .lookback(self.lookback)
            .max_videos_per_channel(self.max_videos_per_channel)
            .build();

        Ok(processor)
    }
}
