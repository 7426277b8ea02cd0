use base64::{engine::general_purpose::STANDARD, Engine};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::VlmConfig;
use crate::error::{Result, VlmExtractError};

use super::{classify_http_failure, VlmProvider, EXTRACTION_PROMPT};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Client for Ollama's native generate API.
#[derive(Clone, Debug)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaClient {
    pub fn new(config: &VlmConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        if base_url.is_empty() {
            return Err(VlmExtractError::Config(
                "VLM_BASE_URL must not be empty for the Ollama provider".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| VlmExtractError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl VlmProvider for OllamaClient {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn extract(&self, image: &[u8]) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: EXTRACTION_PROMPT,
            images: vec![STANDARD.encode(image)],
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| VlmExtractError::Transient(format!("Ollama request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::NOT_FOUND {
                return Err(VlmExtractError::UnsupportedModel(format!(
                    "Model '{}' not found. Pull it first: ollama pull {}",
                    self.model, self.model
                )));
            }
            return Err(classify_http_failure("Ollama", status, &body));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            VlmExtractError::MalformedResponse(format!("Failed to parse Ollama response: {e}"))
        })?;

        let text = parsed.response.trim();
        if text.is_empty() {
            return Err(VlmExtractError::MalformedResponse(
                "Ollama response contained no text".to_string(),
            ));
        }

        Ok(text.to_string())
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
