use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, VlmExtractError};

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_bool_or(var: &str, default: bool) -> bool {
    match env::var(var) {
        Ok(val) => match val.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            other => {
                tracing::warn!(
                    "Invalid value '{}' for {}: expected a boolean. Using default.",
                    other,
                    var
                );
                default
            }
        },
        Err(_) => default,
    }
}

/// Supported VLM backends. Resolved once per request and immutable after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ollama,
    OpenAi,
    LocalAi,
}

impl Provider {
    /// Cloud backends require an API key; self-hosted ones require a
    /// reachable base URL instead.
    pub fn requires_api_key(self) -> bool {
        matches!(self, Provider::OpenAi)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Ollama => "ollama",
            Provider::OpenAi => "openai",
            Provider::LocalAi => "localai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = VlmExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama),
            "openai" => Ok(Provider::OpenAi),
            "localai" => Ok(Provider::LocalAi),
            other => Err(VlmExtractError::Config(format!(
                "Unsupported provider: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub vlm: VlmConfig,
    pub pdf: PdfConfig,
    pub file: FileConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VlmConfig {
    pub provider: Provider,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl VlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PdfConfig {
    pub text_extraction_enabled: bool,
    pub min_text_ratio: f64,
    pub fallback_to_vlm: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    pub max_file_size_mb: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    pub max_concurrent: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vlm: VlmConfig {
                provider: env::var("VLM_PROVIDER")
                    .ok()
                    .and_then(|v| match v.parse() {
                        Ok(p) => Some(p),
                        Err(e) => {
                            tracing::warn!("{e}. Using default provider.");
                            None
                        }
                    })
                    .unwrap_or(Provider::Ollama),
                base_url: env::var("VLM_BASE_URL").ok(),
                api_key: env::var("VLM_API_KEY").ok().filter(|k| !k.is_empty()),
                model: env::var("VLM_MODEL").unwrap_or_else(|_| "llava".to_string()),
                timeout_secs: parse_env_or("VLM_TIMEOUT", 30),
                max_retries: parse_env_or("VLM_MAX_RETRIES", 3),
            },
            pdf: PdfConfig {
                text_extraction_enabled: parse_env_bool_or("PDF_TEXT_EXTRACTION_ENABLED", true),
                min_text_ratio: parse_env_or("PDF_MIN_TEXT_RATIO", 0.1),
                fallback_to_vlm: parse_env_bool_or("PDF_FALLBACK_TO_VLM", true),
            },
            file: FileConfig {
                max_file_size_mb: parse_env_or("MAX_FILE_SIZE_MB", 50),
            },
            batch: BatchConfig {
                max_concurrent: parse_env_or("BATCH_SIZE", 5),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Reject configurations that make every request impossible. Runs once
    /// before any per-file work so batch callers get a single early error
    /// instead of N identical failures.
    pub fn validate(&self) -> Result<()> {
        if self.vlm.timeout_secs == 0 {
            return Err(VlmExtractError::Config(
                "VLM_TIMEOUT must be a positive number of seconds".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.pdf.min_text_ratio) {
            return Err(VlmExtractError::Config(format!(
                "PDF_MIN_TEXT_RATIO must be within [0, 1], got {}",
                self.pdf.min_text_ratio
            )));
        }

        if self.batch.max_concurrent == 0 {
            return Err(VlmExtractError::Config(
                "BATCH_SIZE must be greater than zero".to_string(),
            ));
        }

        if self.vlm.provider.requires_api_key() && self.vlm.api_key.is_none() {
            return Err(VlmExtractError::Config(format!(
                "Provider '{}' requires an API key. Set VLM_API_KEY.",
                self.vlm.provider
            )));
        }

        Ok(())
    }

    /// Copy of this config with the provider swapped, for per-call overrides.
    pub fn with_provider(&self, provider: Provider) -> Self {
        let mut config = self.clone();
        config.vlm.provider = provider;
        config
    }
}
