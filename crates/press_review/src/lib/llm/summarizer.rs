use std::{fmt::Display, future::Future};

use serde::Deserialize;

use crate::domain::Video;

pub trait Summarizer {
    /// Input budget in tokens, the transcript is truncated to fit.
    const CONTEXT_WINDOW_LIMIT: usize = 128_000 - 18_000;

    type Error: Display + Send;

    fn summarize(
        &self,
        request: &SummaryRequest<'_>,
    ) -> impl Future<Output = Result<SummaryResponse, Self::Error>> + Send;
}

/// What the summarizer gets to see of a video.
#[derive(Debug, Clone, Copy)]
pub struct SummaryRequest<'a> {
    pub video: &'a Video,
    pub transcript: &'a str,
}

impl<'a> SummaryRequest<'a> {
    /// Rough bytes-per-token ratio used to size the transcript budget.
    const BYTES_PER_TOKEN: usize = 4;

    pub fn new(video: &'a Video, transcript: &'a str) -> Self {
        Self { video, transcript }
    }

    /// Renders the user prompt, cutting the transcript down to `token_limit`.
    pub fn to_prompt(&self, token_limit: usize) -> String {
        let max_bytes = token_limit.saturating_mul(Self::BYTES_PER_TOKEN);
        let transcript = truncate_on_char_boundary(self.transcript, max_bytes);
        if transcript.len() < self.transcript.len() {
            tracing::warn!(
                video_id = %self.video.video_id,
                transcript_bytes = self.transcript.len(),
                max_bytes,
                "Transcript exceeds context window, truncating"
            );
        }

        format!(
            "Please analyze this YouTube video and provide a concise summary. Here are the details:\n\n\
             Video Title: {}\n\
             Video Description: {}\n\
             Video URL: {}\n\n\
             Full Transcript:\n{}",
            self.video.title,
            self.video.description,
            self.video.url(),
            transcript,
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}

pub(crate) fn truncate_on_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
