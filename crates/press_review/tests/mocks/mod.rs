pub mod notifier;
pub mod summarizer;
pub mod transcriber;
pub mod video_lister;

use chrono::{DateTime, Utc};
use press_review::domain::{ChannelId, Video};

pub const CHANNEL_A: &str = "UC_x5XG1OV2P6uZZ5FSM9Ttw";
pub const CHANNEL_B: &str = "UCVHFbqXqoYvEWM1Ddxl0QDg";

pub fn channel(id: &str) -> ChannelId {
    id.parse().expect("test channel id should be valid")
}

pub fn video(video_id: &str, channel_id: &str, published_at: DateTime<Utc>) -> Video {
    Video {
        video_id: video_id.to_string(),
        title: format!("Title of {video_id}"),
        description: format!("Description of {video_id}"),
        published_at,
        channel_id: channel(channel_id),
    }
}
