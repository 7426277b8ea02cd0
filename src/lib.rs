//! Text extraction from images and documents via Vision Language Models.
//!
//! Files are classified up front: images go straight to the configured VLM
//! backend, text-native PDFs take a fast path through their embedded text
//! layer, and everything else is converted to images first. Provider calls
//! are retried with exponential backoff under a per-file timeout, and batch
//! extraction isolates per-file failures while preserving input order.
//!
//! # Usage
//!
//! ```rust,ignore
//! let config = vlm_extract::Config::from_env();
//! let text = vlm_extract::extract_text("invoice.png", &config).await?;
//!
//! let results = vlm_extract::extract_text_batch(vec!["a.png", "b.pdf"], &config).await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod batch;
pub mod config;
pub mod error;
pub mod format;
pub mod pdf;
pub mod pipeline;
pub mod providers;
pub mod render;

pub use config::{Config, Provider};
pub use error::{ErrorKind, Result, VlmExtractError};
pub use pipeline::{ExtractionMethod, ExtractionOutcome, ExtractionPipeline, ExtractionResult};

/// Extract text from a single file, returning the text or the terminal
/// pipeline error.
pub async fn extract_text(path: impl AsRef<Path>, config: &Config) -> Result<String> {
    let pipeline = ExtractionPipeline::new(config)?;
    pipeline.extract(path).await.into_text()
}

/// Like [`extract_text`], with the provider overridden for this call only.
pub async fn extract_text_with_provider(
    path: impl AsRef<Path>,
    config: &Config,
    provider: Provider,
) -> Result<String> {
    extract_text(path, &config.with_provider(provider)).await
}

/// Extract text from many files concurrently. The output has one entry per
/// input, in input order; individual failures are carried as `Failed`
/// outcomes rather than aborting the batch.
pub async fn extract_text_batch(
    paths: Vec<impl Into<PathBuf>>,
    config: &Config,
) -> Result<Vec<ExtractionResult>> {
    let pipeline = Arc::new(ExtractionPipeline::new(config)?);
    let paths = paths.into_iter().map(Into::into).collect();
    batch::extract_batch(pipeline, paths).await
}
