//! Gemini API client for text replies.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Shown in place of a reply when generation fails.
pub const GENERATION_FAILED: &str = "Sorry, there was an issue generating a response.";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Gemini error: {0}")]
    Gemini(String),
    #[error("no text in response")]
    Empty,
}

/// A service that turns a prompt into a reply.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GeminiError>;
}

pub struct GeminiClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: String,
}

#[derive(Deserialize, Debug)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, GeminiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            model,
            client,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
        let preview: String = prompt.chars().take(100).collect();
        info!("💬 Generating reply ({}): {}", self.model, preview);

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        debug!("Gemini response status: {status}");

        if !status.is_success() {
            return Err(GeminiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let text = parse_response(&body)?;
        info!("💬 Reply generated: {} chars", text.chars().count());
        Ok(text)
    }
}

/// Join the text parts of the first candidate.
fn parse_response(body: &str) -> Result<String, GeminiError> {
    let parsed: GenerateResponse = serde_json::from_str(body)?;

    if let Some(error) = parsed.error {
        return Err(GeminiError::Gemini(error.message));
    }

    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GeminiError::Gemini(format!("prompt blocked: {reason}")));
    }

    let candidates = parsed.candidates.unwrap_or_default();
    let content = candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or(GeminiError::Empty)?;

    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();

    if text.trim().is_empty() {
        return Err(GeminiError::Empty);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_parts() {
        let body = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "Hello"}, {"text": ", world!"}]
                },
                "finishReason": "STOP"
            }]
        }"#;
        assert_eq!(parse_response(body).unwrap(), "Hello, world!");
    }

    #[test]
    fn test_parse_error_object() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid"}}"#;
        let err = parse_response(body).unwrap_err();
        assert!(matches!(err, GeminiError::Gemini(ref m) if m == "API key not valid"));
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = parse_response(body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_parse_no_candidates() {
        assert!(matches!(parse_response("{}"), Err(GeminiError::Empty)));
        assert!(matches!(
            parse_response(r#"{"candidates": [{"content": {"parts": []}}]}"#),
            Err(GeminiError::Empty)
        ));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_response("not json"), Err(GeminiError::Parse(_))));
    }
}
