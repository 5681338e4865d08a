use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PdfEditError {
    #[error("Failed to load PDF: {0}")]
    DocumentLoad(String),

    #[error("Page index {index} is out of range (document has {page_count} pages)")]
    InvalidPageIndex { index: u32, page_count: u32 },

    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("Unsupported image kind: {0}")]
    UnsupportedImageKind(String),

    #[error("Canvas has a degenerate size ({width}x{height})")]
    DegenerateViewport { width: f64, height: f64 },

    #[error("PDF operation failed: {0}")]
    Operation(String),

    #[error("Render failed: {0}")]
    Render(String),
}

impl PdfEditError {
    pub(crate) fn load(err: impl std::fmt::Display) -> Self {
        PdfEditError::DocumentLoad(err.to_string())
    }

    pub(crate) fn operation(err: impl std::fmt::Display) -> Self {
        PdfEditError::Operation(err.to_string())
    }
}
