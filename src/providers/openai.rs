use async_trait::async_trait;
use reqwest::Client;

use crate::config::VlmConfig;
use crate::error::{Result, VlmExtractError};

use super::{classify_http_failure, parse_chat_response, ChatRequest, VlmProvider};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for the OpenAI vision chat-completions API.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &VlmConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            VlmExtractError::Config(
                "OpenAI provider requires an API key. Set VLM_API_KEY.".to_string(),
            )
        })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| VlmExtractError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl VlmProvider for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn extract(&self, image: &[u8]) -> Result<String> {
        let request = ChatRequest::for_image(&self.model, image);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VlmExtractError::Transient(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_failure("OpenAI", status, &body));
        }

        parse_chat_response("OpenAI", response).await
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
