//! File format classification.
//!
//! Extension-only decisions never touch file content; ambiguous or unknown
//! extensions fall back to signature sniffing. OOXML containers (DOCX, PPTX,
//! XLSX) and EPUB all share the PK zip signature and are told apart by their
//! member names.

use std::io::Cursor;
use std::path::Path;

/// Image formats the VLM path accepts directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Bmp,
    WebP,
    Tiff,
    Heic,
}

/// Document formats that require conversion before the VLM path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Docx,
    Pptx,
    Xlsx,
    Epub,
    Html,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Image(ImageKind),
    Pdf,
    Document(DocumentKind),
    Unsupported,
}

impl FileFormat {
    pub fn is_supported(self) -> bool {
        !matches!(self, FileFormat::Unsupported)
    }
}

/// Classify by extension alone. Does not read the file.
pub fn classify_path(path: &Path) -> FileFormat {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return FileFormat::Unsupported;
    };

    match ext.to_lowercase().as_str() {
        "png" => FileFormat::Image(ImageKind::Png),
        "jpg" | "jpeg" => FileFormat::Image(ImageKind::Jpeg),
        "gif" => FileFormat::Image(ImageKind::Gif),
        "bmp" => FileFormat::Image(ImageKind::Bmp),
        "webp" => FileFormat::Image(ImageKind::WebP),
        "tif" | "tiff" => FileFormat::Image(ImageKind::Tiff),
        "heic" | "heif" => FileFormat::Image(ImageKind::Heic),
        "pdf" => FileFormat::Pdf,
        "docx" => FileFormat::Document(DocumentKind::Docx),
        "pptx" => FileFormat::Document(DocumentKind::Pptx),
        "xlsx" => FileFormat::Document(DocumentKind::Xlsx),
        "epub" => FileFormat::Document(DocumentKind::Epub),
        "html" | "htm" => FileFormat::Document(DocumentKind::Html),
        _ => FileFormat::Unsupported,
    }
}

/// Classify by content signature.
pub fn classify_bytes(bytes: &[u8]) -> FileFormat {
    if bytes.starts_with(b"%PDF") {
        return FileFormat::Pdf;
    }

    if let Some(kind) = infer::get(bytes).and_then(|t| image_kind_from_mime(t.mime_type())) {
        return FileFormat::Image(kind);
    }

    // PK container: DOCX/PPTX/XLSX/EPUB all start 50 4B 03 04.
    if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
        if let Some(kind) = classify_zip_container(bytes) {
            return FileFormat::Document(kind);
        }
        return FileFormat::Unsupported;
    }

    if looks_like_html(bytes) {
        return FileFormat::Document(DocumentKind::Html);
    }

    FileFormat::Unsupported
}

/// Classify using the extension first, falling back to the signature when
/// the extension is missing or unrecognized.
pub fn classify(path: &Path, bytes: &[u8]) -> FileFormat {
    match classify_path(path) {
        FileFormat::Unsupported => classify_bytes(bytes),
        format => format,
    }
}

fn image_kind_from_mime(mime: &str) -> Option<ImageKind> {
    match mime {
        "image/png" => Some(ImageKind::Png),
        "image/jpeg" => Some(ImageKind::Jpeg),
        "image/gif" => Some(ImageKind::Gif),
        "image/bmp" => Some(ImageKind::Bmp),
        "image/webp" => Some(ImageKind::WebP),
        "image/tiff" => Some(ImageKind::Tiff),
        "image/heif" | "image/heic" => Some(ImageKind::Heic),
        _ => None,
    }
}

fn classify_zip_container(bytes: &[u8]) -> Option<DocumentKind> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).ok()?;

    if archive.by_name("word/document.xml").is_ok() {
        return Some(DocumentKind::Docx);
    }
    if archive.by_name("ppt/presentation.xml").is_ok() {
        return Some(DocumentKind::Pptx);
    }
    if archive.by_name("xl/workbook.xml").is_ok() {
        return Some(DocumentKind::Xlsx);
    }
    if archive.by_name("META-INF/container.xml").is_ok() || archive.by_name("mimetype").is_ok() {
        return Some(DocumentKind::Epub);
    }

    None
}

fn looks_like_html(bytes: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return false;
    };
    let lower = text.trim_start().to_lowercase();
    lower.starts_with("<!doctype") || lower.starts_with("<html") || lower.starts_with("<head")
}
