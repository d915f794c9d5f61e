use std::sync::{Arc, Mutex};

use press_review::notify::Notifier;

#[derive(Clone, Default)]
pub struct MockNotifier {
    pub messages: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
}

impl MockNotifier {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }

    pub fn alerts(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.contains("New Video Alert"))
            .cloned()
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.contains("Video processing error alert"))
            .cloned()
            .collect()
    }
}

impl Notifier for MockNotifier {
    const MAX_MESSAGE_LEN: usize = 4096;

    type Error = anyhow::Error;

    async fn send_message(&self, text: &str) -> anyhow::Result<()> {
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
