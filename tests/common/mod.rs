//! Shared test fixtures.
//!
//! PDF fixtures are assembled programmatically with offsets computed at
//! build time, so the xref table is correct by construction and both lopdf
//! and pdf-extract parse them deterministically.

use std::fmt::Write as _;
use std::io::Cursor;

/// A sentence comfortably above the per-page text floor used by the
/// text-ratio heuristic.
pub const SAMPLE_SENTENCE: &str =
    "The quick brown fox jumps over the lazy dog near the riverbank.";

/// Build a PDF with one page per entry. `Some(text)` produces a page with a
/// native text layer; `None` produces a content-free page, standing in for
/// a scanned image page.
pub fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
    assert!(!pages.is_empty(), "a PDF needs at least one page");

    let page_count = pages.len();
    let font_obj = 3 + 2 * page_count;

    let mut objects: Vec<(usize, Vec<u8>)> = Vec::new();

    objects.push((
        1,
        b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n".to_vec(),
    ));

    let kids = (0..page_count)
        .map(|i| format!("{} 0 R", 3 + 2 * i))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push((
        2,
        format!("2 0 obj\n<< /Type /Pages /Kids [{kids}] /Count {page_count} >>\nendobj\n")
            .into_bytes(),
    ));

    for (i, page) in pages.iter().enumerate() {
        let page_obj = 3 + 2 * i;
        let content_obj = page_obj + 1;

        objects.push((
            page_obj,
            format!(
                "{page_obj} 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 {font_obj} 0 R >> >> /Contents {content_obj} 0 R >>\nendobj\n"
            )
            .into_bytes(),
        ));

        let stream = match page {
            Some(text) => format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", escape_pdf_string(text)),
            None => String::new(),
        };
        objects.push((
            content_obj,
            format!(
                "{content_obj} 0 obj\n<< /Length {} >>\nstream\n{}\nendstream\nendobj\n",
                stream.len(),
                stream
            )
            .into_bytes(),
        ));
    }

    objects.push((
        font_obj,
        format!(
            "{font_obj} 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>\nendobj\n"
        )
        .into_bytes(),
    ));

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    let object_count = font_obj + 1;
    let mut offsets = vec![0usize; object_count];
    for (number, bytes) in &objects {
        offsets[*number] = out.len();
        out.extend_from_slice(bytes);
    }

    let xref_offset = out.len();
    let mut tail = String::new();
    write!(tail, "xref\n0 {object_count}\n").unwrap();
    tail.push_str("0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        write!(tail, "{offset:010} 00000 n \n").unwrap();
    }
    write!(
        tail,
        "trailer\n<< /Size {object_count} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
    )
    .unwrap();
    out.extend_from_slice(tail.as_bytes());

    out
}

/// Single-page PDF with a native text layer.
pub fn text_pdf(text: &str) -> Vec<u8> {
    build_pdf(&[Some(text)])
}

/// PDF whose pages carry no text layer at all, like a scan.
pub fn scanned_pdf(pages: usize) -> Vec<u8> {
    build_pdf(&vec![None; pages])
}

fn escape_pdf_string(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Small valid PNG, enough for signature detection and provider payloads.
pub fn png_bytes() -> Vec<u8> {
    use image::{DynamicImage, ImageFormat};

    let img = DynamicImage::new_rgb8(64, 64);
    let mut output = Vec::new();
    img.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
        .expect("Failed to encode fixture PNG");
    output
}
