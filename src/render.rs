//! External-tool conversions.
//!
//! Rasterization and office-format conversion are delegated to the same
//! tools the wider ecosystem leans on: poppler's `pdftoppm` for PDF pages,
//! `libreoffice` for OOXML, `ebook-convert` for EPUB and `wkhtmltopdf` for
//! HTML. A missing binary surfaces as a `Render` error naming the package
//! to install.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::process::Command;

use crate::error::{Result, VlmExtractError};
use crate::format::DocumentKind;

/// Raster resolution for VLM input pages.
const RASTER_DPI: u32 = 200;

/// Rasterize every page of a PDF to PNG bytes, in page order.
pub async fn pdf_to_page_images(pdf_bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
    let scratch = TempDir::new()?;
    let pdf_path = scratch.path().join("input.pdf");
    tokio::fs::write(&pdf_path, pdf_bytes).await?;

    let prefix = scratch.path().join("page");
    let output = Command::new("pdftoppm")
        .arg("-png")
        .arg("-r")
        .arg(RASTER_DPI.to_string())
        .arg(&pdf_path)
        .arg(&prefix)
        .output()
        .await
        .map_err(|e| tool_error("pdftoppm", "poppler-utils", e))?;

    if !output.status.success() {
        return Err(VlmExtractError::Render(format!(
            "pdftoppm failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(scratch.path())?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let number = page_number(&path)?;
            Some((number, path))
        })
        .collect();

    if pages.is_empty() {
        return Err(VlmExtractError::Render(
            "pdftoppm produced no pages".to_string(),
        ));
    }

    // pdftoppm pads page numbers based on page count; sort numerically so
    // a 10+ page document cannot interleave.
    pages.sort_by_key(|(number, _)| *number);

    let mut images = Vec::with_capacity(pages.len());
    for (_, path) in pages {
        images.push(tokio::fs::read(&path).await?);
    }

    tracing::debug!(pages = images.len(), "Rasterized PDF for VLM input");
    Ok(images)
}

/// Convert a DOCX/PPTX/XLSX/EPUB/HTML document to PDF bytes.
pub async fn document_to_pdf(kind: DocumentKind, input: &Path) -> Result<Vec<u8>> {
    match kind {
        DocumentKind::Docx | DocumentKind::Pptx | DocumentKind::Xlsx => {
            libreoffice_to_pdf(input).await
        }
        DocumentKind::Epub => ebook_convert_to_pdf(input).await,
        DocumentKind::Html => wkhtmltopdf_to_pdf(input).await,
    }
}

async fn libreoffice_to_pdf(input: &Path) -> Result<Vec<u8>> {
    let scratch = TempDir::new()?;

    let output = Command::new("libreoffice")
        .arg("--headless")
        .arg("--convert-to")
        .arg("pdf")
        .arg("--outdir")
        .arg(scratch.path())
        .arg(input)
        .output()
        .await
        .map_err(|e| tool_error("libreoffice", "libreoffice", e))?;

    if !output.status.success() {
        return Err(VlmExtractError::Render(format!(
            "libreoffice conversion failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let stem = input
        .file_stem()
        .ok_or_else(|| VlmExtractError::Render("Input file has no name".to_string()))?;
    let pdf_path = scratch.path().join(stem).with_extension("pdf");
    read_converted(&pdf_path, "libreoffice").await
}

async fn ebook_convert_to_pdf(input: &Path) -> Result<Vec<u8>> {
    let scratch = TempDir::new()?;
    let pdf_path = scratch.path().join("output.pdf");

    let output = Command::new("ebook-convert")
        .arg(input)
        .arg(&pdf_path)
        .output()
        .await
        .map_err(|e| tool_error("ebook-convert", "calibre", e))?;

    if !output.status.success() {
        return Err(VlmExtractError::Render(format!(
            "ebook-convert failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    read_converted(&pdf_path, "ebook-convert").await
}

async fn wkhtmltopdf_to_pdf(input: &Path) -> Result<Vec<u8>> {
    let scratch = TempDir::new()?;
    let pdf_path = scratch.path().join("output.pdf");

    let output = Command::new("wkhtmltopdf")
        .arg("--quiet")
        .arg(input)
        .arg(&pdf_path)
        .output()
        .await
        .map_err(|e| tool_error("wkhtmltopdf", "wkhtmltopdf", e))?;

    if !output.status.success() {
        return Err(VlmExtractError::Render(format!(
            "wkhtmltopdf failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    read_converted(&pdf_path, "wkhtmltopdf").await
}

async fn read_converted(pdf_path: &Path, tool: &str) -> Result<Vec<u8>> {
    if !pdf_path.exists() {
        return Err(VlmExtractError::Render(format!(
            "{tool} reported success but produced no PDF"
        )));
    }
    Ok(tokio::fs::read(pdf_path).await?)
}

fn tool_error(tool: &str, package: &str, error: std::io::Error) -> VlmExtractError {
    if error.kind() == std::io::ErrorKind::NotFound {
        VlmExtractError::Render(format!(
            "{tool} not found. Install {package} to process this format."
        ))
    } else {
        VlmExtractError::Render(format!("Failed to run {tool}: {error}"))
    }
}

/// Parse the page number out of a `prefix-NN.png` path.
fn page_number(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(".png")?;
    let digits = stem.rsplit('-').next()?;
    digits.parse().ok()
}
