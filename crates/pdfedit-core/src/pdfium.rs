//! PDFium-backed rasterizer for native builds

use crate::error::PdfEditError;
use crate::render::{Rasterizer, RenderSurface, Viewport};
use pdfium_render::prelude::*;
use std::path::Path;

pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    /// Bind to a PDFium library in `dir`, falling back to the system library
    pub fn bind(dir: impl AsRef<Path>) -> Result<Self, PdfEditError> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
            dir.as_ref(),
        ))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| PdfEditError::Render(format!("Failed to bind PDFium: {}", e)))?;

        tracing::debug!("PDFium bound");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    /// Bind to the system PDFium library
    pub fn system() -> Result<Self, PdfEditError> {
        Self::bind("./")
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn page_count(&self, pdf: &[u8]) -> Result<u32, PdfEditError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(PdfEditError::load)?;
        Ok(document.pages().len() as u32)
    }

    fn rasterize(
        &self,
        pdf: &[u8],
        page_number: u32,
        viewport: &Viewport,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), PdfEditError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(PdfEditError::load)?;

        let index = u16::try_from(page_number.saturating_sub(1))
            .map_err(|_| PdfEditError::Render(format!("Page {} out of range", page_number)))?;
        let page = document
            .pages()
            .get(index)
            .map_err(|e| PdfEditError::Render(e.to_string()))?;

        let config = PdfRenderConfig::new()
            .set_target_width(viewport.width as i32)
            .set_target_height(viewport.height as i32);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| PdfEditError::Render(e.to_string()))?;

        let rgba = bitmap.as_image().to_rgba8();
        let (width, height) = (rgba.width(), rgba.height());
        surface.draw_rgba(width, height, rgba.as_raw())
    }
}
