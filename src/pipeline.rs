//! Single-file extraction pipeline.
//!
//! Flow per file: validate → classify → fast path (text-native PDFs) or VLM
//! path → normalized result. The retry loop lives here, not in the provider
//! adapters: an adapter does exactly one call, the pipeline decides whether
//! that call is worth repeating. The whole execution, retries and backoff
//! included, is bounded by the configured per-file timeout.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{ErrorKind, Result, VlmExtractError};
use crate::format::{self, FileFormat};
use crate::pdf;
use crate::providers::{build_provider, VlmProvider};
use crate::render;

/// How the text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    Vlm,
    PdfText,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::Vlm => f.write_str("vlm"),
            ExtractionMethod::PdfText => f.write_str("pdf-text"),
        }
    }
}

#[derive(Debug)]
pub enum ExtractionOutcome {
    Succeeded {
        text: String,
        method: ExtractionMethod,
    },
    Failed {
        error: VlmExtractError,
    },
}

/// One result per input file, success or not.
#[derive(Debug)]
pub struct ExtractionResult {
    pub source: String,
    pub outcome: ExtractionOutcome,
}

impl ExtractionResult {
    pub fn succeeded(source: String, text: String, method: ExtractionMethod) -> Self {
        Self {
            source,
            outcome: ExtractionOutcome::Succeeded { text, method },
        }
    }

    pub fn failed(source: String, error: VlmExtractError) -> Self {
        Self {
            source,
            outcome: ExtractionOutcome::Failed { error },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ExtractionOutcome::Succeeded { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.outcome {
            ExtractionOutcome::Succeeded { text, .. } => Some(text),
            ExtractionOutcome::Failed { .. } => None,
        }
    }

    pub fn method(&self) -> Option<ExtractionMethod> {
        match &self.outcome {
            ExtractionOutcome::Succeeded { method, .. } => Some(*method),
            ExtractionOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&VlmExtractError> {
        match &self.outcome {
            ExtractionOutcome::Succeeded { .. } => None,
            ExtractionOutcome::Failed { error } => Some(error),
        }
    }

    /// Move the text out, or the terminal error for failed extractions.
    pub fn into_text(self) -> Result<String> {
        match self.outcome {
            ExtractionOutcome::Succeeded { text, .. } => Ok(text),
            ExtractionOutcome::Failed { error } => Err(error),
        }
    }
}

pub struct ExtractionPipeline {
    config: Config,
    provider: Arc<dyn VlmProvider>,
}

impl ExtractionPipeline {
    /// Validates shared setup and constructs the configured provider.
    /// Fails here, before any per-file work, for configurations that make
    /// every request impossible.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let provider = build_provider(&config.vlm)?;
        Ok(Self {
            config: config.clone(),
            provider,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn VlmProvider> {
        &self.provider
    }

    /// Run the full pipeline for one file. Always produces a result; errors
    /// become the `Failed` outcome. Total wall-clock, retries included, is
    /// bounded by the configured timeout, and hitting it drops any in-flight
    /// provider call.
    pub async fn extract(&self, path: impl AsRef<Path>) -> ExtractionResult {
        let path = path.as_ref();
        let source = path.display().to_string();

        match tokio::time::timeout(self.config.vlm.timeout(), self.run(path)).await {
            Ok(Ok((text, method))) => {
                tracing::info!(source = %source, method = %method, "Extraction succeeded");
                ExtractionResult::succeeded(source, text, method)
            }
            Ok(Err(error)) => {
                tracing::warn!(source = %source, error = %error, "Extraction failed");
                ExtractionResult::failed(source, error)
            }
            Err(_) => {
                let error = VlmExtractError::Timeout(self.config.vlm.timeout_secs);
                tracing::warn!(source = %source, error = %error, "Extraction timed out");
                ExtractionResult::failed(source, error)
            }
        }
    }

    async fn run(&self, path: &Path) -> Result<(String, ExtractionMethod)> {
        let bytes = self.read_validated(path).await?;

        match format::classify(path, &bytes) {
            FileFormat::Image(_) => {
                let text = self.vlm_with_retry(&bytes).await?;
                Ok((text, ExtractionMethod::Vlm))
            }
            FileFormat::Pdf => self.extract_pdf(&bytes).await,
            FileFormat::Document(kind) => {
                tracing::debug!(kind = ?kind, "Converting document before VLM extraction");
                let pdf_bytes = render::document_to_pdf(kind, path).await?;
                let text = self.vlm_pdf_pages(&pdf_bytes).await?;
                Ok((text, ExtractionMethod::Vlm))
            }
            FileFormat::Unsupported => {
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("<none>");
                Err(VlmExtractError::UnsupportedFormat(format!(
                    "No recognized extension or signature for '{}' (extension: {ext})",
                    path.display()
                )))
            }
        }
    }

    async fn read_validated(&self, path: &Path) -> Result<Vec<u8>> {
        let metadata = tokio::fs::metadata(path).await?;

        let limit_bytes = self.config.file.max_file_size_mb * 1024 * 1024;
        if metadata.len() > limit_bytes {
            return Err(VlmExtractError::FileTooLarge {
                path: path.display().to_string(),
                size_mb: metadata.len().div_ceil(1024 * 1024),
                limit_mb: self.config.file.max_file_size_mb,
            });
        }

        Ok(tokio::fs::read(path).await?)
    }

    /// Decide text-vs-image for a PDF, run the chosen path, and demote
    /// fast-path failures to the VLM path when fallback is enabled.
    async fn extract_pdf(&self, bytes: &[u8]) -> Result<(String, ExtractionMethod)> {
        let classification = pdf::classify_pdf(bytes, &self.config.pdf);
        tracing::debug!(
            text_ratio = classification.text_ratio,
            text_native = classification.text_native,
            "Classified PDF"
        );

        if classification.text_native {
            match pdf::extract_text(bytes) {
                Ok(text) => return Ok((text, ExtractionMethod::PdfText)),
                Err(error) if self.config.pdf.fallback_to_vlm => {
                    tracing::warn!(error = %error, "PDF fast path failed, falling back to VLM");
                }
                Err(error) => return Err(error),
            }
        }

        let text = self.vlm_pdf_pages(bytes).await?;
        Ok((text, ExtractionMethod::Vlm))
    }

    /// Rasterize a PDF and extract each page through the provider. Per-page
    /// failures in multi-page documents are recorded inline; errors that
    /// would repeat identically on every page abort the file.
    async fn vlm_pdf_pages(&self, pdf_bytes: &[u8]) -> Result<String> {
        let pages = render::pdf_to_page_images(pdf_bytes).await?;

        if pages.len() == 1 {
            return self.vlm_with_retry(&pages[0]).await;
        }

        let mut sections = Vec::with_capacity(pages.len());
        let mut succeeded = 0usize;
        let mut first_error = None;

        for (index, page) in pages.iter().enumerate() {
            let page_number = index + 1;
            match self.vlm_with_retry(page).await {
                Ok(text) => {
                    succeeded += 1;
                    if !text.trim().is_empty() {
                        sections.push(format!("Page {page_number}:\n{}", text.trim()));
                    }
                }
                Err(error) => {
                    if matches!(error.kind(), ErrorKind::Auth | ErrorKind::UnsupportedModel) {
                        return Err(error);
                    }
                    tracing::warn!(page = page_number, error = %error, "Page extraction failed");
                    sections.push(format!("Page {page_number}: extraction failed - {error}"));
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }

        if succeeded == 0 {
            if let Some(error) = first_error {
                return Err(error);
            }
        }

        Ok(sections.join("\n\n"))
    }

    /// Explicit retry loop: exponential backoff, `max_retries + 1` attempts
    /// for transient failures, a single re-attempt for malformed responses,
    /// immediate abort for auth and model errors.
    async fn vlm_with_retry(&self, image: &[u8]) -> Result<String> {
        let max_retries = self.config.vlm.max_retries;
        let mut malformed_retried = false;
        let mut last_error: Option<VlmExtractError> = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(100 * 2_u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }

            match self.provider.extract(image).await {
                Ok(text) => return Ok(text),
                Err(error) => {
                    if !error.is_retryable() {
                        return Err(error);
                    }

                    if matches!(error.kind(), ErrorKind::MalformedResponse) {
                        if malformed_retried {
                            return Err(error);
                        }
                        malformed_retried = true;
                    }

                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = max_retries + 1,
                        error = %error,
                        "Provider call failed"
                    );
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            VlmExtractError::Transient("Provider call failed after retries".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BatchConfig, FileConfig, PdfConfig, Provider, VlmConfig};

    fn test_config() -> Config {
        Config {
            vlm: VlmConfig {
                provider: Provider::Ollama,
                base_url: Some("http://localhost:11434".to_string()),
                api_key: None,
                model: "llava".to_string(),
                timeout_secs: 30,
                max_retries: 3,
            },
            pdf: PdfConfig {
                text_extraction_enabled: true,
                min_text_ratio: 0.1,
                fallback_to_vlm: true,
            },
            file: FileConfig {
                max_file_size_mb: 50,
            },
            batch: BatchConfig { max_concurrent: 5 },
        }
    }

    #[test]
    fn test_method_display() {
        assert_eq!(ExtractionMethod::Vlm.to_string(), "vlm");
        assert_eq!(ExtractionMethod::PdfText.to_string(), "pdf-text");
    }

    #[test]
    fn test_result_accessors() {
        let ok = ExtractionResult::succeeded(
            "a.png".to_string(),
            "hello".to_string(),
            ExtractionMethod::Vlm,
        );
        assert!(ok.is_success());
        assert_eq!(ok.text(), Some("hello"));
        assert_eq!(ok.method(), Some(ExtractionMethod::Vlm));
        assert!(ok.error().is_none());

        let failed = ExtractionResult::failed(
            "b.xyz".to_string(),
            VlmExtractError::UnsupportedFormat("xyz".to_string()),
        );
        assert!(!failed.is_success());
        assert!(failed.text().is_none());
        assert_eq!(failed.error().unwrap().kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_into_text_propagates_error() {
        let failed = ExtractionResult::failed("x".to_string(), VlmExtractError::Timeout(30));
        assert!(matches!(
            failed.into_text(),
            Err(VlmExtractError::Timeout(30))
        ));
    }

    #[tokio::test]
    async fn test_missing_file_yields_failed_result() {
        let pipeline = ExtractionPipeline::new(&test_config()).unwrap();
        let result = pipeline.extract("/definitely/not/here.png").await;
        assert!(!result.is_success());
        assert_eq!(result.error().unwrap().kind(), ErrorKind::Io);
    }

    #[tokio::test]
    async fn test_unsupported_extension_yields_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xyz");
        std::fs::write(&path, b"\x00\x01\x02\x03").unwrap();

        let pipeline = ExtractionPipeline::new(&test_config()).unwrap();
        let result = pipeline.extract(&path).await;
        assert!(!result.is_success());
        assert_eq!(
            result.error().unwrap().kind(),
            ErrorKind::UnsupportedFormat
        );
    }

    #[tokio::test]
    async fn test_oversized_file_rejected_before_classification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        std::fs::write(&path, vec![0u8; 2 * 1024 * 1024]).unwrap();

        let mut config = test_config();
        config.file.max_file_size_mb = 1;

        let pipeline = ExtractionPipeline::new(&config).unwrap();
        let result = pipeline.extract(&path).await;
        assert_eq!(result.error().unwrap().kind(), ErrorKind::FileTooLarge);
    }
}
