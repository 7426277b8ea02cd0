//! Batch orchestration.
//!
//! Each file runs its own independent pipeline task; a semaphore caps how
//! many are in flight so a large batch cannot open unbounded outbound
//! connections. Results are written into pre-sized slots by input index, so
//! output order matches input order no matter how completion interleaves.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::{Result, VlmExtractError};
use crate::pipeline::{ExtractionPipeline, ExtractionResult};

/// Extract every file in `paths`, preserving order and isolating failures.
/// The returned vector always has the same length as the input; per-file
/// errors are carried in the corresponding result's `Failed` outcome.
///
/// Only shared-setup problems (configuration that makes every request
/// impossible) error out of this function itself.
pub async fn extract_batch(
    pipeline: Arc<ExtractionPipeline>,
    paths: Vec<PathBuf>,
) -> Result<Vec<ExtractionResult>> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }

    let max_concurrent = pipeline.config().batch.max_concurrent;
    let semaphore = Arc::new(Semaphore::new(max_concurrent));

    tracing::info!(
        files = paths.len(),
        max_concurrent,
        "Starting batch extraction"
    );

    let mut tasks = JoinSet::new();
    for (index, path) in paths.iter().enumerate() {
        let pipeline = Arc::clone(&pipeline);
        let semaphore = Arc::clone(&semaphore);
        let path = path.clone();

        tasks.spawn(async move {
            // Closed only if the orchestrator is dropped mid-flight.
            let _permit = semaphore.acquire().await;
            (index, pipeline.extract(&path).await)
        });
    }

    let mut results: Vec<Option<ExtractionResult>> = Vec::with_capacity(paths.len());
    results.resize_with(paths.len(), || None);

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => {
                results[index] = Some(result);
            }
            Err(join_error) => {
                // A panicked task loses its index; fill the gap below so the
                // length invariant still holds.
                tracing::error!(error = %join_error, "Extraction task panicked");
            }
        }
    }

    let results = results
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                ExtractionResult::failed(
                    paths[index].display().to_string(),
                    VlmExtractError::Transient("Extraction task panicked".to_string()),
                )
            })
        })
        .collect();

    Ok(results)
}
