//! Coordinate transformation between canvas and PDF coordinate systems
//!
//! Screen space is canvas pixels with the origin at the top-left; PDF space is
//! page points with the origin at the bottom-left.

use crate::error::PdfEditError;
use crate::page_info::PageSize;

/// Vertical compensation applied to clicks, in screen pixels.
///
/// Matches the toolbar height of the editor layout the placement behaviour was
/// tuned against. Configurable through `EditorConfig::vertical_offset`.
pub const DEFAULT_VERTICAL_OFFSET: f64 = 225.0;

/// A point in screen space (pixels, origin top-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// The rendered canvas rectangle in screen space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// A point in PDF space (points, origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    vertical_offset: f64,
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self::new(DEFAULT_VERTICAL_OFFSET)
    }
}

impl CoordinateMapper {
    pub fn new(vertical_offset: f64) -> Self {
        Self { vertical_offset }
    }

    pub fn vertical_offset(&self) -> f64 {
        self.vertical_offset
    }

    /// Convert a click on the canvas to a point on the page.
    ///
    /// Clicks outside `rect` are mapped linearly, not clamped.
    pub fn screen_to_pdf(
        &self,
        click: ScreenPoint,
        rect: ScreenRect,
        page: PageSize,
    ) -> Result<PdfPoint, PdfEditError> {
        check_rect(rect)?;

        let from_bottom = rect.height - (click.y - rect.top) + self.vertical_offset;
        Ok(PdfPoint {
            x: (click.x - rect.left) * page.width / rect.width,
            y: from_bottom * page.height / rect.height,
        })
    }

    /// Inverse of [`screen_to_pdf`](Self::screen_to_pdf), for positioning overlays
    pub fn pdf_to_screen(
        &self,
        point: PdfPoint,
        rect: ScreenRect,
        page: PageSize,
    ) -> Result<ScreenPoint, PdfEditError> {
        check_rect(rect)?;
        if page.width == 0.0 || page.height == 0.0 {
            return Err(PdfEditError::DegenerateViewport {
                width: page.width,
                height: page.height,
            });
        }

        let from_bottom = point.y * rect.height / page.height;
        Ok(ScreenPoint {
            x: rect.left + point.x * rect.width / page.width,
            y: rect.top + rect.height - from_bottom + self.vertical_offset,
        })
    }
}

fn check_rect(rect: ScreenRect) -> Result<(), PdfEditError> {
    let usable = |v: f64| v.is_finite() && v != 0.0;
    if usable(rect.width) && usable(rect.height) {
        Ok(())
    } else {
        Err(PdfEditError::DegenerateViewport {
            width: rect.width,
            height: rect.height,
        })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = f64> {
        1.0f64..2000.0
    }

    fn percentage() -> impl Strategy<Value = f64> {
        0.0f64..=1.0
    }

    proptest! {
        /// Screen -> PDF -> screen returns the original click
        #[test]
        fn roundtrip_screen_to_pdf_to_screen(
            rect_w in dimension(),
            rect_h in dimension(),
            page_w in dimension(),
            page_h in dimension(),
            x_pct in percentage(),
            y_pct in percentage(),
            offset in 0.0f64..400.0,
        ) {
            let mapper = CoordinateMapper::new(offset);
            let rect = ScreenRect { left: 10.0, top: 20.0, width: rect_w, height: rect_h };
            let page = PageSize { width: page_w, height: page_h };
            let click = ScreenPoint { x: rect.left + x_pct * rect_w, y: rect.top + y_pct * rect_h };

            let pdf = mapper.screen_to_pdf(click, rect, page).unwrap();
            let back = mapper.pdf_to_screen(pdf, rect, page).unwrap();

            prop_assert!((back.x - click.x).abs() < 1e-6);
            prop_assert!((back.y - click.y).abs() < 1e-6);
        }

        /// Mapping is linear: equal screen steps give equal PDF steps
        #[test]
        fn mapping_is_linear_in_x(
            rect_w in dimension(),
            page_w in dimension(),
            step in 0.0f64..500.0,
        ) {
            let mapper = CoordinateMapper::default();
            let rect = ScreenRect { left: 0.0, top: 0.0, width: rect_w, height: 100.0 };
            let page = PageSize { width: page_w, height: 100.0 };

            let a = mapper.screen_to_pdf(ScreenPoint { x: 0.0, y: 0.0 }, rect, page).unwrap();
            let b = mapper.screen_to_pdf(ScreenPoint { x: step, y: 0.0 }, rect, page).unwrap();

            prop_assert!((b.x - a.x - step * page_w / rect_w).abs() < 1e-6);
            prop_assert_eq!(a.y, b.y);
        }
    }
}
