/// LLM Client: the single point of entry for all Gemini API calls.
///
/// No other module may call the Gemini API directly. The analyzer depends on
/// the `ContentGenerator` trait, so tests can swap in a fake generator.
///
/// Calls are one-shot: no client timeout, no retry, no streaming.
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Prompt blocked by the model: {reason}")]
    Blocked { reason: String },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// One part of a generation request.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    InlineImage { mime_type: String, data: Vec<u8> },
}

#[cfg(test)]
impl Part {
    pub fn text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text.as_str()),
            Part::InlineImage { .. } => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Part::InlineImage { .. })
    }
}

/// Anything that can turn a list of request parts into response text.
///
/// Carried by the analyzer as `Arc<dyn ContentGenerator>`.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, parts: &[Part]) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

impl<'a> From<&'a Part> for RequestPart<'a> {
    fn from(part: &'a Part) -> Self {
        match part {
            Part::Text(text) => RequestPart::Text {
                text: text.as_str(),
            },
            Part::InlineImage { mime_type, data } => RequestPart::InlineData {
                inline_data: InlineData {
                    mime_type: mime_type.as_str(),
                    data: STANDARD.encode(data),
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub usage_metadata: Option<UsageMetadata>,
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
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GenerateContentResponse {
    /// Concatenates the text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: String, api_base: &str, model: String) -> Self {
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            api_base.trim_end_matches('/'),
            model
        );
        Self {
            client: Client::new(),
            api_key,
            endpoint,
            model,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.gemini_api_key.clone(),
            &config.gemini_api_base,
            config.gemini_model.clone(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Makes a raw call to the Gemini API, returning the full response object.
    pub async fn call(&self, parts: &[Part]) -> Result<GenerateContentResponse, LlmError> {
        let request_body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: parts.iter().map(RequestPart::from).collect(),
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "LLM call succeeded: model={}, prompt_tokens={}, output_tokens={}",
                self.model, usage.prompt_token_count, usage.candidates_token_count
            );
        }

        Ok(parsed)
    }
}

#[async_trait]
impl ContentGenerator for LlmClient {
    async fn generate(&self, parts: &[Part]) -> Result<String, LlmError> {
        let response = self.call(parts).await?;

        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Err(LlmError::Blocked { reason });
        }

        response.text().ok_or_else(|| {
            let finish_reason = response
                .candidates
                .first()
                .and_then(|c| c.finish_reason.as_deref())
                .unwrap_or("none");
            warn!("LLM returned no text (finish_reason: {finish_reason})");
            LlmError::EmptyContent
        })
    }
}
