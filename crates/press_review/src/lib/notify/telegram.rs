use std::fmt;

use serde::{Deserialize, Serialize};

use crate::notify::{message::split_message, Notifier};

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Telegram API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Bot API client bound to a single chat.
///
/// Uses a plain client without the retry layer: `sendMessage` is not
/// idempotent and a retried timeout would post the message twice.
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
    base_url: String,
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("chat_id", &self.chat_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    pub description: Option<String>,
    pub error_code: Option<u16>,
}

impl TelegramClient {
    const BASE_URL: &'static str = "https://api.telegram.org";

    pub fn new(
        client: reqwest::Client,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            base_url: Self::BASE_URL.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn send_single_message(&self, text: &str) -> Result<(), TelegramError> {
        let body = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            disable_web_page_preview: false,
        };

        // the url carries the bot token, it is stripped from every error
        let resp = self
            .client
            .post(format!("{}/bot{}/sendMessage", self.base_url, self.bot_token))
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        let status = resp.status().as_u16();
        let api_response = resp
            .json::<ApiResponse>()
            .await
            .map_err(reqwest::Error::without_url)?;

        api_response.into_result(status)
    }
}

impl ApiResponse {
    fn into_result(self, status: u16) -> Result<(), TelegramError> {
        if self.ok {
            return Ok(());
        }

        Err(TelegramError::Api {
            status: self.error_code.unwrap_or(status),
            message: self.description.unwrap_or_default(),
        })
    }
}

impl Notifier for TelegramClient {
    const MAX_MESSAGE_LEN: usize = 4096;

    type Error = TelegramError;

    #[tracing::instrument(skip_all, fields(chat_id = %self.chat_id, len = text.len()))]
    async fn send_message(&self, text: &str) -> Result<(), Self::Error> {
        let parts = split_message(text, Self::MAX_MESSAGE_LEN);
        if parts.len() > 1 {
            tracing::debug!(parts = parts.len(), "Message exceeds limit, sending in parts");
        }

        for part in &parts {
            self.send_single_message(part).await?;
        }

        Ok(())
    }
}
