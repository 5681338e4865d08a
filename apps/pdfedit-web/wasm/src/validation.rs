//! Upload checks and document summaries
//!
//! Cheap header/trailer checks run before a file is handed to the editor, so
//! obviously wrong files get a clear message instead of a parser error.

use lopdf::Document;
use pdfedit_core::{PageInfo, PdfEditError};
use serde::Serialize;

/// What the UI shows about a loaded document
#[derive(Debug, Clone, Serialize, Default)]
pub struct DocumentSummary {
    pub page_count: u32,
    /// PDF version string (e.g., "1.7")
    pub version: String,
    pub encrypted: bool,
    pub size_bytes: usize,
    pub pages: Vec<PageInfo>,
}

/// Parse `bytes` and describe the document and each of its pages
pub fn summarize(bytes: &[u8]) -> Result<DocumentSummary, PdfEditError> {
    quick_validate(bytes)?;

    let document =
        Document::load_mem(bytes).map_err(|e| PdfEditError::DocumentLoad(e.to_string()))?;
    let pages = PageInfo::all_from_document(&document)
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DocumentSummary {
        page_count: pages.len() as u32,
        version: document.version.clone(),
        encrypted: document.is_encrypted(),
        size_bytes: bytes.len(),
        pages,
    })
}

/// Header and trailer checks without a full parse
pub fn quick_validate(bytes: &[u8]) -> Result<(), PdfEditError> {
    if bytes.len() < 8 {
        return Err(PdfEditError::DocumentLoad(
            "File too small to be a valid PDF".into(),
        ));
    }

    if !bytes.starts_with(b"%PDF-") {
        return Err(PdfEditError::DocumentLoad(
            "Not a valid PDF file (missing %PDF- header)".into(),
        ));
    }

    // %%EOF should be near the end
    let tail = &bytes[bytes.len().saturating_sub(1024)..];
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(PdfEditError::DocumentLoad(
            "PDF appears truncated (missing %%EOF marker)".into(),
        ));
    }

    Ok(())
}
