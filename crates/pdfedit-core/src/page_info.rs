//! Page-level information extraction
//!
//! Reads the intrinsic size and rotation of individual pages. Both can be
//! inherited from ancestor `/Pages` nodes, so lookups walk up the page tree.

use crate::error::PdfEditError;
use lopdf::{Dictionary, Document, Object};
use serde::Serialize;

/// Guard against cyclic `/Parent` chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

/// Fallback when no `/MediaBox` exists anywhere in the tree (US Letter)
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Intrinsic size of a page in PDF points
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Information about a single PDF page
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    /// Page number (1-indexed)
    pub page_num: u32,
    /// Page width in points (1 point = 1/72 inch)
    pub width: f64,
    /// Page height in points
    pub height: f64,
    /// Page rotation in degrees (0, 90, 180, 270)
    pub rotation: i32,
    /// Whether the page has a content stream (not blank)
    pub has_content: bool,
    /// Estimated orientation based on dimensions
    pub orientation: PageOrientation,
}

/// Page orientation
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub enum PageOrientation {
    Portrait,
    Landscape,
    Square,
}

impl PageInfo {
    /// Extract page info from a document
    pub fn from_document(doc: &Document, page_num: u32) -> Result<Self, PdfEditError> {
        let page_dict = page_dictionary(doc, page_num)?;

        let media_box = media_box(doc, page_dict)?;
        let (width, height) = (media_box[2] - media_box[0], media_box[3] - media_box[1]);
        let rotation = rotation(doc, page_dict);
        let has_content = page_dict.get(b"Contents").is_ok();

        let (effective_width, effective_height) = if rotation == 90 || rotation == 270 {
            (height, width)
        } else {
            (width, height)
        };

        let orientation = if (effective_width - effective_height).abs() < 1.0 {
            PageOrientation::Square
        } else if effective_width > effective_height {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        };

        Ok(Self {
            page_num,
            width: width.abs(),
            height: height.abs(),
            rotation,
            has_content,
            orientation,
        })
    }

    /// Get all page infos for a document
    pub fn all_from_document(doc: &Document) -> Vec<Result<Self, PdfEditError>> {
        let count = doc.get_pages().len() as u32;
        (1..=count)
            .map(|page_num| Self::from_document(doc, page_num))
            .collect()
    }

    /// Parse `bytes` and return info for every page
    pub fn all_from_bytes(bytes: &[u8]) -> Result<Vec<Self>, PdfEditError> {
        let doc = Document::load_mem(bytes).map_err(PdfEditError::load)?;
        Self::all_from_document(&doc).into_iter().collect()
    }

    /// Unrotated size, the frame that PDF-space coordinates refer to
    pub fn size(&self) -> PageSize {
        PageSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Size as displayed, with `/Rotate` applied
    pub fn display_size(&self) -> PageSize {
        if self.rotation == 90 || self.rotation == 270 {
            PageSize {
                width: self.height,
                height: self.width,
            }
        } else {
            self.size()
        }
    }
}

/// Intrinsic size of a page (1-indexed)
pub fn page_size(doc: &Document, page_num: u32) -> Result<PageSize, PdfEditError> {
    PageInfo::from_document(doc, page_num).map(|info| info.size())
}

fn page_dictionary(doc: &Document, page_num: u32) -> Result<&Dictionary, PdfEditError> {
    let pages = doc.get_pages();
    let page_id = pages
        .get(&page_num)
        .ok_or(PdfEditError::InvalidPageIndex {
            index: page_num.saturating_sub(1),
            page_count: pages.len() as u32,
        })?;

    doc.get_object(*page_id)
        .and_then(Object::as_dict)
        .map_err(|_| PdfEditError::Operation(format!("Page {} is not a dictionary", page_num)))
}

/// Look up a page attribute, falling back to ancestor `/Pages` nodes
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_dict;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_object(parent_id).and_then(Object::as_dict).ok()?;
    }
    None
}

/// Get MediaBox from page, inheriting from ancestors if necessary
fn media_box(doc: &Document, page_dict: &Dictionary) -> Result<[f64; 4], PdfEditError> {
    let Some(value) = inherited_attribute(doc, page_dict, b"MediaBox") else {
        return Ok(DEFAULT_MEDIA_BOX);
    };

    // The box itself may be stored as an indirect object
    let value = match value {
        Object::Reference(id) => doc.get_object(*id).map_err(PdfEditError::operation)?,
        other => other,
    };

    let array = value
        .as_array()
        .map_err(|_| PdfEditError::Operation("MediaBox is not an array".to_string()))?;
    parse_box_array(array)
}

/// Parse a box array [x1, y1, x2, y2]
fn parse_box_array(array: &[Object]) -> Result<[f64; 4], PdfEditError> {
    if array.len() != 4 {
        return Err(PdfEditError::Operation(
            "MediaBox must have 4 elements".to_string(),
        ));
    }

    let mut result = [0.0; 4];
    for (i, obj) in array.iter().enumerate() {
        result[i] = match obj {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => {
                return Err(PdfEditError::Operation(format!(
                    "MediaBox element {} is not a number",
                    i
                )))
            }
        };
    }

    Ok(result)
}

fn rotation(doc: &Document, page_dict: &Dictionary) -> i32 {
    inherited_attribute(doc, page_dict, b"Rotate")
        .and_then(|value| value.as_i64().ok())
        .map(|angle| normalize_rotation(angle as i32))
        .unwrap_or(0)
}

/// Normalize rotation to 0, 90, 180, or 270
fn normalize_rotation(angle: i32) -> i32 {
    angle.rem_euclid(360)
}
