//! Page counting and rasterization
//!
//! Pixel work is delegated to a [`Rasterizer`]; this module decides what to
//! draw and how big. Every call opens its own handle on the bytes it is given,
//! so concurrent count and render requests against the same snapshot never
//! share state.

use crate::error::PdfEditError;
use crate::page_info::PageInfo;
use lopdf::Document;

/// Pixel dimensions of a rendered page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
}

impl Viewport {
    /// Viewport for a page of `info` at `scale` (1.0 = one pixel per point)
    pub fn for_page(info: &PageInfo, scale: f32) -> Self {
        let size = info.display_size();
        Self {
            width: (size.width * scale as f64).floor() as u32,
            height: (size.height * scale as f64).floor() as u32,
            scale,
        }
    }
}

/// Drawing target for a rasterized page
pub trait RenderSurface {
    /// Resize before drawing; previous contents may be discarded
    fn resize(&mut self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);

    /// Copy tightly packed RGBA pixels onto the surface
    fn draw_rgba(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<(), PdfEditError>;
}

/// Renders pages of a PDF to pixels
pub trait Rasterizer {
    /// Number of pages in `pdf`.
    ///
    /// The default opens the document with lopdf; backends that already parse
    /// the file can override it.
    fn page_count(&self, pdf: &[u8]) -> Result<u32, PdfEditError> {
        crate::get_page_count(pdf)
    }

    /// Draw page `page_number` (1-based) at `viewport` onto `surface`.
    /// The surface has already been resized to the viewport.
    fn rasterize(
        &self,
        pdf: &[u8],
        page_number: u32,
        viewport: &Viewport,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), PdfEditError>;
}

/// Page count as reported by the rasterizer; failures are returned, never defaulted
pub fn get_page_count(rasterizer: &dyn Rasterizer, pdf: &[u8]) -> Result<u32, PdfEditError> {
    rasterizer.page_count(pdf)
}

/// Render page `page_number` (1-based) of `pdf` at `scale` onto `surface`
pub fn render_page(
    rasterizer: &dyn Rasterizer,
    pdf: &[u8],
    page_number: u32,
    surface: &mut dyn RenderSurface,
    scale: f32,
) -> Result<Viewport, PdfEditError> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(PdfEditError::Render(format!("Invalid scale {}", scale)));
    }

    let doc = Document::load_mem(pdf).map_err(PdfEditError::load)?;
    let page_count = doc.get_pages().len() as u32;
    if page_number == 0 || page_number > page_count {
        return Err(PdfEditError::InvalidPageIndex {
            index: page_number.saturating_sub(1),
            page_count,
        });
    }

    let info = PageInfo::from_document(&doc, page_number)?;
    let viewport = Viewport::for_page(&info, scale);

    surface.resize(viewport.width, viewport.height);
    rasterizer.rasterize(pdf, page_number, &viewport, surface)?;
    Ok(viewport)
}

/// In-memory RGBA surface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RgbaSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RgbaSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Encode the surface as a PNG image
    pub fn to_png(&self) -> Result<Vec<u8>, PdfEditError> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .map_err(|e| PdfEditError::Render(e.to_string()))?;
            writer
                .write_image_data(&self.pixels)
                .map_err(|e| PdfEditError::Render(e.to_string()))?;
        }
        Ok(out)
    }
}

impl RenderSurface for RgbaSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![255; width as usize * height as usize * 4];
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn draw_rgba(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<(), PdfEditError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(PdfEditError::Render(format!(
                "Expected {} bytes of RGBA data, got {}",
                expected,
                pixels.len()
            )));
        }
        if (width, height) != (self.width, self.height) {
            self.resize(width, height);
        }
        self.pixels.copy_from_slice(pixels);
        Ok(())
    }
}
