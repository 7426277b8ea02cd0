//! PDF analysis: text-vs-image classification and fast-path extraction.
//!
//! A page counts as text-native when its embedded text layer yields at least
//! [`MIN_CHARS_PER_TEXT_PAGE`] characters. The ratio of such pages to total
//! pages drives the fast-path decision; unparseable or encrypted PDFs get a
//! ratio of 0.0 and flow to the VLM path, where rasterization either works
//! or produces the real error.

use lopdf::Document;

use crate::config::PdfConfig;
use crate::error::{Result, VlmExtractError};

/// Minimum extractable characters for a page to count as text-native.
/// Below this a page is assumed to be scanned or graphical.
pub const MIN_CHARS_PER_TEXT_PAGE: usize = 25;

/// Ephemeral per-document decision. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfClassification {
    pub text_ratio: f64,
    pub text_native: bool,
}

/// Compute the fraction of pages carrying a native text layer.
/// Deterministic for a given input; always within [0.0, 1.0].
pub fn text_ratio(bytes: &[u8]) -> f64 {
    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!("PDF parse failed during classification: {e}");
            return 0.0;
        }
    };

    if doc.is_encrypted() {
        return 0.0;
    }

    let pages = doc.get_pages();
    if pages.is_empty() {
        return 0.0;
    }

    let text_pages = pages
        .keys()
        .filter(|&&page| {
            let text = doc.extract_text(&[page]).unwrap_or_default();
            text.split_whitespace().map(str::len).sum::<usize>() >= MIN_CHARS_PER_TEXT_PAGE
        })
        .count();

    text_pages as f64 / pages.len() as f64
}

/// Classify a PDF against the configured threshold.
pub fn classify_pdf(bytes: &[u8], config: &PdfConfig) -> PdfClassification {
    let ratio = text_ratio(bytes);
    PdfClassification {
        text_ratio: ratio,
        text_native: config.text_extraction_enabled && ratio >= config.min_text_ratio,
    }
}

/// Fast-path extraction of the embedded text layer for the whole document.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| VlmExtractError::PdfExtraction(format!("PDF extraction failed: {e}")))?;

    if text.trim().is_empty() {
        return Err(VlmExtractError::PdfExtraction(
            "PDF text layer produced no text".to_string(),
        ));
    }

    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_config(enabled: bool, threshold: f64) -> PdfConfig {
        PdfConfig {
            text_extraction_enabled: enabled,
            min_text_ratio: threshold,
            fallback_to_vlm: true,
        }
    }

    #[test]
    fn test_ratio_of_garbage_is_zero() {
        assert_eq!(text_ratio(b"not a pdf at all"), 0.0);
        assert_eq!(text_ratio(&[]), 0.0);
        // Valid header, truncated body.
        assert_eq!(text_ratio(b"%PDF-1.7\n"), 0.0);
    }

    #[test]
    fn test_classification_respects_threshold() {
        // Garbage ratio is 0.0, so only a zero threshold selects the fast path.
        let classification = classify_pdf(b"junk", &pdf_config(true, 0.0));
        assert!(classification.text_native);
        assert_eq!(classification.text_ratio, 0.0);

        let classification = classify_pdf(b"junk", &pdf_config(true, 0.1));
        assert!(!classification.text_native);
    }

    #[test]
    fn test_classification_disabled_never_selects_fast_path() {
        let classification = classify_pdf(b"junk", &pdf_config(false, 0.0));
        assert!(!classification.text_native);
    }

    #[test]
    fn test_fast_path_rejects_garbage() {
        let err = extract_text(b"not a pdf").unwrap_err();
        assert!(matches!(err, VlmExtractError::PdfExtraction(_)));
    }
}
