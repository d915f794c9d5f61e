use std::sync::{Arc, Mutex};

use press_review::{Summarizer, SummaryRequest, SummaryResponse};

#[derive(Clone)]
pub struct MockSummarizer {
    pub summary: String,
    /// (video id, transcript) per call
    pub calls: Arc<Mutex<Vec<(String, String)>>>,
    pub fail_with: Option<String>,
}

impl MockSummarizer {
    pub fn new(summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            summary: String::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: Some(msg.to_string()),
        }
    }
}

impl Summarizer for MockSummarizer {
    const CONTEXT_WINDOW_LIMIT: usize = 128_000;

    type Error = anyhow::Error;

    async fn summarize(&self, request: &SummaryRequest<'_>) -> anyhow::Result<SummaryResponse> {
        self.calls.lock().unwrap().push((
            request.video.video_id.clone(),
            request.transcript.to_string(),
        ));
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(SummaryResponse {
            summary: self.summary.clone(),
        })
    }
}
