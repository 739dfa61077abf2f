//! Text extraction for uploaded documents.
//!
//! Plain-text formats are read as UTF-8 (invalid sequences are replaced);
//! PDFs are extracted page by page and joined with newlines.

use std::path::Path;

/// Extensions accepted for upload.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf"];

/// Extraction error. Callers skip the file and keep going.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedExtension(String),
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Extract the text of the file at `path`, dispatching on its extension.
pub fn extract_file(path: &Path) -> Result<String, ExtractError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ExtractError::UnsupportedExtension(ext));
    }
    let bytes = std::fs::read(path)?;
    extract_bytes(&bytes, &ext)
}

/// Extract text from raw bytes given a lower-case file extension.
pub fn extract_bytes(bytes: &[u8], extension: &str) -> Result<String, ExtractError> {
    match extension {
        "txt" | "md" => Ok(String::from_utf8_lossy(bytes).into_owned()),
        "pdf" => extract_pdf(bytes),
        other => Err(ExtractError::UnsupportedExtension(other.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages.join("\n"))
}

/// True if `path` has an extension we know how to extract.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_string_lossy().to_lowercase().as_str()))
        .unwrap_or(false)
}
