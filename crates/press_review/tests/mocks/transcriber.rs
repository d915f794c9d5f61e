use std::sync::{Arc, Mutex};

use press_review::{
    domain::{Transcript, TranscriptSnippet},
    yt::TranscriptFetcher,
};

#[derive(Clone)]
pub struct MockTranscriber {
    pub lines: Vec<String>,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
}

impl MockTranscriber {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            lines: Vec::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: Some(msg.to_string()),
        }
    }
}

impl TranscriptFetcher for MockTranscriber {
    type Error = anyhow::Error;

    async fn fetch_transcript(&self, video_id: &str) -> anyhow::Result<Transcript> {
        self.calls.lock().unwrap().push(video_id.to_string());
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }

        let snippets = self
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| TranscriptSnippet {
                text: line.clone(),
                start: i as f64 * 2.0,
                duration: 2.0,
            })
            .collect();

        Ok(Transcript {
            video_id: video_id.to_string(),
            language_code: "en".to_string(),
            is_generated: true,
            snippets,
        })
    }
}
