//! Stable text-generation path.
//!
//! One-shot `generateContent` requests against a fixed text-first Gemini
//! model. This is the reliability fallback for the realtime path: slower, but
//! it does not depend on a live session.
//!
//! The request runs on a blocking client inside `spawn_blocking`, so it can
//! never stall the cooperative scheduler while the realtime path is racing
//! alongside it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Production endpoint for the generative-language REST API.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Errors from the text-generation path. The resolver decides disposition;
/// this module just propagates.
#[derive(Debug, Error)]
pub enum TextError {
    /// HTTP transport or status failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The worker task running the blocking request was cancelled or panicked.
    #[error("worker task failed: {0}")]
    Worker(String),
}

/// Result type for text-generation operations.
pub type TextResult<T> = Result<T, TextError>;

/// One-shot prompt+instructions text generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate plain text for `prompt` under the given system `instructions`.
    ///
    /// Returns the trimmed response text, or an empty string when the backend
    /// response carries no text.
    async fn generate(&self, prompt: &str, instructions: &str) -> TextResult<String>;
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: WireContent,
    contents: Vec<WireContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<WireContent>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts, or `None` when the
    /// response carries no text.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let joined: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if joined.is_empty() { None } else { Some(joined) }
    }
}

// =============================================================================
// Gemini client
// =============================================================================

/// Text-generation client for the Gemini `generateContent` REST endpoint.
#[derive(Clone)]
pub struct GeminiTextClient {
    client: Arc<reqwest::blocking::Client>,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiTextClient {
    /// Create a client against the production endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, GEMINI_API_BASE)
    }

    /// Create a client against a custom endpoint (tests).
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Arc::new(reqwest::blocking::Client::new()),
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
        }
    }

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiTextClient {
    async fn generate(&self, prompt: &str, instructions: &str) -> TextResult<String> {
        let url = self.request_url();
        let client = self.client.clone();
        let body = GenerateContentRequest {
            system_instruction: WireContent {
                role: None,
                parts: vec![WirePart {
                    text: Some(instructions.to_string()),
                }],
            },
            contents: vec![WireContent {
                role: Some("user".to_string()),
                parts: vec![WirePart {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        // The blocking client must stay off the async worker threads.
        let response = tokio::task::spawn_blocking(move || -> TextResult<GenerateContentResponse> {
            let resp = client.post(&url).json(&body).send()?.error_for_status()?;
            Ok(resp.json()?)
        })
        .await
        .map_err(|e| TextError::Worker(e.to_string()))??;

        Ok(response
            .text()
            .map(|t| t.trim().to_string())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_request_url_contains_model_and_key() {
        let client = GeminiTextClient::with_base_url("k123", "gemini-1.5-flash", "http://host/v1");
        assert_eq!(
            client.request_url(),
            "http://host/v1/models/gemini-1.5-flash:generateContent?key=k123"
        );
    }

    #[test]
    fn test_response_text_joins_parts() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "role": "model", "parts": [
                { "text": "Hello " }, { "text": "coach." }
            ]}}]
        }))
        .unwrap();
        assert_eq!(resp.text(), Some("Hello coach.".to_string()));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(resp.text(), None);
    }

    #[tokio::test]
    async fn test_generate_returns_trimmed_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .and(query_param("key", "test_key"))
            .and(body_partial_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hi" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "  reply text\n" }] } }]
            })))
            .mount(&server)
            .await;

        let client =
            GeminiTextClient::with_base_url("test_key", "gemini-1.5-flash", server.uri());
        let text = client.generate("hi", "be brief").await.unwrap();
        assert_eq!(text, "reply text");
    }

    #[tokio::test]
    async fn test_generate_empty_when_no_text_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [] } }]
            })))
            .mount(&server)
            .await;

        let client = GeminiTextClient::with_base_url("k", "gemini-1.5-flash", server.uri());
        let text = client.generate("hi", "sys").await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_generate_propagates_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = GeminiTextClient::with_base_url("k", "gemini-1.5-flash", server.uri());
        let result = client.generate("hi", "sys").await;
        assert!(matches!(result, Err(TextError::Request(_))));
    }
}
