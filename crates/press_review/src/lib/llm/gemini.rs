use std::fmt;

use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};

use crate::{types::GoogleApiErrorBody, Summarizer, SummaryRequest, SummaryResponse};

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
    #[error("Gemini API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Prompt was blocked: {0}")]
    Blocked(String),
    #[error("No content in response")]
    EmptyResponse,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: ClientWithMiddleware,
    api_key: String,
    model: String,
    base_url: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, parts concatenated.
    pub fn into_text(self) -> Result<String, GeminiError> {
        let text = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if !text.trim().is_empty() {
            return Ok(text.trim().to_string());
        }

        match self.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => Err(GeminiError::Blocked(reason)),
            None => Err(GeminiError::EmptyResponse),
        }
    }
}

impl GeminiClient {
    const SYSTEM_PROMPT: &'static str = include_str!("./prompts/system_0.txt");
    const BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";
    pub const DEFAULT_MODEL: &'static str = "gemini-2.0-flash-lite";

    pub fn new(client: ClientWithMiddleware, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.into(),
            base_url: Self::BASE_URL.into(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub async fn send_generate_request(
        &self,
        user_content: &str,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: [Part {
                    text: Self::SYSTEM_PROMPT,
                }],
            },
            contents: [Content {
                role: Some("user"),
                parts: [Part { text: user_content }],
            }],
        };

        let resp = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoogleApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(GeminiError::Api { status, message });
        }

        Ok(resp.json::<GenerateContentResponse>().await?)
    }
}

impl Summarizer for GeminiClient {
    // gemini-2.0-flash-lite accepts ~1M input tokens, keep well clear of it
    const CONTEXT_WINDOW_LIMIT: usize = 900_000;

    type Error = GeminiError;

    #[tracing::instrument(skip_all, fields(video_id = %request.video.video_id, model = %self.model))]
    async fn summarize(&self, request: &SummaryRequest<'_>) -> Result<SummaryResponse, Self::Error> {
        let prompt = request.to_prompt(Self::CONTEXT_WINDOW_LIMIT);

        let summary = self
            .send_generate_request(&prompt)
            .await
            .and_then(GenerateContentResponse::into_text)
            .inspect_err(|e| tracing::error!(error = %e, "Failed to summarize content"))?;

        Ok(SummaryResponse { summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::Video,
        http::testing::{client, serve_local},
    };
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use chrono::Utc;
    use serde_json::{json, Value};

    #[test]
    fn test_request_body_shape() {
        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: [Part { text: "be brief" }],
            },
            contents: [Content {
                role: Some("user"),
                parts: [Part { text: "summarize this" }],
            }],
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "systemInstruction": {"parts": [{"text": "be brief"}]},
                "contents": [{"role": "user", "parts": [{"text": "summarize this"}]}]
            })
        );
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {"parts": [{"text": "First part. "}, {"text": "Second part.\n"}], "role": "model"},
                    "finishReason": "STOP",
                    "avgLogprobs": -0.21
                }],
                "usageMetadata": {"promptTokenCount": 1200, "candidatesTokenCount": 85, "totalTokenCount": 1285},
                "modelVersion": "gemini-2.0-flash-lite"
            }"#,
        )
        .unwrap();

        assert_eq!(response.into_text().unwrap(), "First part. Second part.");
    }

    #[test]
    fn test_blocked_prompt_surfaces_reason() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();

        assert!(matches!(
            response.into_text(),
            Err(GeminiError::Blocked(reason)) if reason == "SAFETY"
        ));
    }

    #[test]
    fn test_empty_candidate_is_an_error() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [], "role": "model"}, "finishReason": "MAX_TOKENS"}]}"#,
        )
        .unwrap();

        assert!(matches!(response.into_text(), Err(GeminiError::EmptyResponse)));
    }

    fn video() -> Video {
        Video {
            video_id: "9pTq1Yg5Rqo".into(),
            title: "What's new in Rust 1.80".into(),
            description: "LazyLock and friends".into(),
            published_at: Utc::now(),
            channel_id: "UC_x5XG1OV2P6uZZ5FSM9Ttw".parse().unwrap(),
        }
    }

    async fn gemini_api() -> GeminiClient {
        let base_url = serve_local(|_| {
            Router::new().route(
                "/models/{call}",
                post(
                    |Path(call): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                        if call != "gemini-2.0-flash-lite:generateContent" {
                            return (StatusCode::NOT_FOUND, Json(json!({})));
                        }
                        if !headers
                            .get("x-goog-api-key")
                            .is_some_and(|key| key == "test-key")
                        {
                            return (
                                StatusCode::BAD_REQUEST,
                                Json(json!({"error": {
                                    "code": 400,
                                    "message": "API key not valid. Please pass a valid API key.",
                                    "status": "INVALID_ARGUMENT"
                                }})),
                            );
                        }

                        let system = body["systemInstruction"]["parts"][0]["text"]
                            .as_str()
                            .unwrap_or_default();
                        let user = body["contents"][0]["parts"][0]["text"]
                            .as_str()
                            .unwrap_or_default();
                        if system.is_empty() || !user.contains("Video Title: What's new in Rust 1.80") {
                            return (StatusCode::BAD_REQUEST, Json(json!({})));
                        }

                        (
                            StatusCode::OK,
                            Json(json!({
                                "candidates": [{
                                    "content": {"parts": [{"text": "Rust 1.80 stabilizes LazyLock."}], "role": "model"},
                                    "finishReason": "STOP"
                                }]
                            })),
                        )
                    },
                ),
            )
        })
        .await;

        GeminiClient::new(client(), "test-key").with_base_url(base_url)
    }

    #[tokio::test]
    async fn test_summarize_over_http() {
        let gemini = gemini_api().await;
        let video = video();

        let response = gemini
            .summarize(&SummaryRequest::new(&video, "line one\nline two"))
            .await
            .unwrap();

        assert_eq!(response.summary, "Rust 1.80 stabilizes LazyLock.");
    }

    #[tokio::test]
    async fn test_api_error_carries_google_message() {
        let gemini = GeminiClient::new(client(), "wrong-key")
            .with_base_url(gemini_api().await.base_url);
        let video = video();

        let err = gemini
            .summarize(&SummaryRequest::new(&video, "transcript"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GeminiError::Api { status: 400, ref message } if message.starts_with("API key not valid")
        ));
    }

    #[tokio::test]
    async fn test_unknown_model_is_an_api_error() {
        let gemini = gemini_api().await.with_model("gemini-0.1-nope");
        let video = video();

        let err = gemini
            .summarize(&SummaryRequest::new(&video, "transcript"))
            .await
            .unwrap_err();

        assert!(matches!(err, GeminiError::Api { status: 404, .. }));
    }
}
