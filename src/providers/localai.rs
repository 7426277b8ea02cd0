use async_trait::async_trait;
use reqwest::Client;

use crate::config::VlmConfig;
use crate::error::{Result, VlmExtractError};

use super::{classify_http_failure, parse_chat_response, ChatRequest, VlmProvider};

const DEFAULT_BASE_URL: &str = "http://localhost:8080/v1";

/// Client for self-hosted LocalAI, which speaks the OpenAI chat-completions
/// dialect but does not require an API key.
#[derive(Clone, Debug)]
pub struct LocalAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl LocalAiClient {
    pub fn new(config: &VlmConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        if base_url.is_empty() {
            return Err(VlmExtractError::Config(
                "VLM_BASE_URL must not be empty for the LocalAI provider".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| VlmExtractError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl VlmProvider for LocalAiClient {
    fn name(&self) -> &'static str {
        "localai"
    }

    async fn extract(&self, image: &[u8]) -> Result<String> {
        let request = ChatRequest::for_image(&self.model, image);

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| VlmExtractError::Transient(format!("LocalAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_failure("LocalAI", status, &body));
        }

        parse_chat_response("LocalAI", response).await
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/models", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
