//! Message bodies posted to the chat.

use crate::domain::{watch_url, Video};

pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";

/// Announcement for a freshly summarized video.
pub fn new_video_alert(channel_name: &str, video: &Video, summary: &str) -> String {
    format!(
        "🎥 New Video Alert! 🎥\n\n\
         📺 Channel: {channel_name}\n\
         📺 Title: {}\n\
         📝 Summary: {summary}\n\
         🔗 Watch here: {}",
        video.title,
        video.url(),
    )
}

/// What went wrong, and with which video (or channel, when listing failed).
#[derive(Debug, Clone, Copy)]
pub enum ErrorSubject<'a> {
    Video(&'a Video),
    Channel(&'a str),
}

/// Fallback message sent instead of a summary.
pub fn error_alert(subject: ErrorSubject<'_>, error_message: &str) -> String {
    let (title, url) = match subject {
        ErrorSubject::Video(video) => (video.title.clone(), watch_url(&video.video_id)),
        ErrorSubject::Channel(channel_id) => (format!("Channel {channel_id}"), watch_url("N/A")),
    };

    format!(
        "⚠️ Video processing error alert! ⚠️\n\n\
         📺 Video: {title}\n\
         🔗 URL: {url}\n\
         ❌ Error: {error_message}\n\n\
         The video won't be summarized because of the error."
    )
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Splits `text` into parts of at most `limit` UTF-16 code units.
///
/// Parts break after a newline where possible; a single line longer than
/// `limit` is cut between characters. Concatenating the parts yields `text`.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    // any char is at most 2 code units
    let limit = limit.max(2);

    if utf16_len(text) <= limit {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = utf16_len(line);

        if current_len + line_len > limit && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }

        for ch in line.chars() {
            let ch_len = ch.len_utf16();
            if current_len + ch_len > limit && !current.is_empty() {
                parts.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(ch);
            current_len += ch_len;
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}
