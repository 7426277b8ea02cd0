//! VLM backend adapters.
//!
//! Each adapter performs exactly one outbound call per `extract` invocation
//! and classifies failures into the retry taxonomy; the pipeline owns the
//! retry loop. Backends are selected by tagged dispatch on the configured
//! [`Provider`] value.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Provider, VlmConfig};
use crate::error::{Result, VlmExtractError};

mod localai;
mod ollama;
mod openai;

pub use localai::LocalAiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

/// Same instruction across backends: the model should return text only.
pub const EXTRACTION_PROMPT: &str = "Extract and return all the text visible in this image. \
     Return only the text content, no explanations.";

#[async_trait]
pub trait VlmProvider: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// One network call: send image bytes, get text back.
    async fn extract(&self, image: &[u8]) -> Result<String>;

    /// Cheap reachability probe, used by the CLI for remediation hints.
    async fn health_check(&self) -> bool;
}

/// Construct the configured backend. Fails fast on configuration that makes
/// every request impossible (missing API key, missing base URL).
pub fn build_provider(config: &VlmConfig) -> Result<Arc<dyn VlmProvider>> {
    let provider: Arc<dyn VlmProvider> = match config.provider {
        Provider::Ollama => Arc::new(OllamaClient::new(config)?),
        Provider::OpenAi => Arc::new(OpenAiClient::new(config)?),
        Provider::LocalAi => Arc::new(LocalAiClient::new(config)?),
    };

    tracing::info!(
        provider = provider.name(),
        model = %config.model,
        "VLM provider initialized"
    );

    Ok(provider)
}

/// Data URL for an image payload, with the mime sniffed from the bytes.
pub(crate) fn image_data_url(image: &[u8]) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine};

    let mime = infer::get(image)
        .map(|t| t.mime_type())
        .unwrap_or("image/png");
    format!("data:{mime};base64,{}", STANDARD.encode(image))
}

// OpenAI-style chat-completions wire types, shared by the OpenAI and
// LocalAI adapters.

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub(crate) enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub(crate) struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatMessageResponse {
    pub content: String,
}

/// Map a non-success HTTP status onto the retry taxonomy. 401/403 means the
/// key is bad; 404/400 means the model (or the request shape it implies)
/// cannot be served; 408/429/5xx are worth another attempt.
pub(crate) fn classify_http_failure(
    provider: &str,
    status: reqwest::StatusCode,
    body: &str,
) -> VlmExtractError {
    use reqwest::StatusCode;

    let detail = truncate_body(body);

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        VlmExtractError::Auth(format!(
            "{provider} rejected the API key ({status}): {detail}"
        ))
    } else if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
        VlmExtractError::UnsupportedModel(format!(
            "{provider} cannot serve this model request ({status}): {detail}"
        ))
    } else {
        VlmExtractError::Transient(format!("{provider} returned {status}: {detail}"))
    }
}

/// Parse a chat-completions body into plain text.
pub(crate) async fn parse_chat_response(
    provider: &str,
    response: reqwest::Response,
) -> Result<String> {
    let parsed: ChatResponse = response.json().await.map_err(|e| {
        VlmExtractError::MalformedResponse(format!("Failed to parse {provider} response: {e}"))
    })?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .unwrap_or_default();

    let text = content.trim();
    if text.is_empty() {
        return Err(VlmExtractError::MalformedResponse(format!(
            "{provider} response contained no text"
        )));
    }

    Ok(text.to_string())
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    trimmed.chars().take(200).collect()
}

impl ChatRequest {
    pub(crate) fn for_image(model: &str, image: &[u8]) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: EXTRACTION_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image_data_url(image),
                        },
                    },
                ],
            }],
            max_tokens: 4096,
        }
    }
}
