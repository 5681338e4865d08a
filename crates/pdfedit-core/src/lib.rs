//! PDF viewing and editing
//!
//! Load a PDF, render its pages through a pluggable rasterizer, place text and
//! images at canvas clicks, merge and split documents. Document mutation is
//! done with lopdf; every mutation returns a new buffer and leaves its input
//! untouched.
//!
//! [`Editor`] ties the pieces together as a small state machine. The free
//! functions can be used on their own.

pub mod buffer;
pub mod config;
pub mod coords;
pub mod edit;
pub mod editor;
pub mod error;
pub mod image;
pub mod merge;
pub mod page_info;
#[cfg(feature = "pdfium")]
pub mod pdfium;
pub mod render;
pub mod split;
pub mod store;

pub use buffer::{BufferId, PdfBuffer};
pub use config::EditorConfig;
pub use coords::{CoordinateMapper, PdfPoint, ScreenPoint, ScreenRect};
pub use edit::{add_image, add_image_sized, add_text, add_text_styled, Rgb, TextStyle};
pub use editor::{
    Download, Editor, EditorState, PendingPlacement, PickedImage, PlacementPrompt, RefreshTicket,
    Tool, ViewKey,
};
pub use error::PdfEditError;
pub use image::ImageKind;
pub use merge::merge_documents;
pub use page_info::{PageInfo, PageSize};
#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumRasterizer;
pub use render::{render_page, Rasterizer, RenderSurface, RgbaSurface, Viewport};
pub use split::{extract_pages, parse_ranges, split_document, PageRange};
pub use store::DocumentStore;

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PdfEditError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(PdfEditError::load)?;
    Ok(doc.get_pages().len() as u32)
}
