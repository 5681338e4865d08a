//! PDF Split algorithm
//!
//! Extracts pages from a PDF using "Construction by Whitelist".

use crate::error::PdfEditError;
use lopdf::Document;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Inclusive, 0-based range of pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        if self.is_empty() {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Check `start <= end < page_count`
    pub fn validate(&self, page_count: u32) -> Result<(), PdfEditError> {
        if self.start > self.end {
            return Err(PdfEditError::InvalidPageRange(format!(
                "Start {} > end {}",
                self.start, self.end
            )));
        }
        if self.end >= page_count {
            return Err(PdfEditError::InvalidPageRange(format!(
                "Range {} ends past the last page (document has {} pages)",
                self, page_count
            )));
        }
        Ok(())
    }

    /// 1-based page numbers covered by the range
    fn page_numbers(&self) -> Vec<u32> {
        (self.start + 1..=self.end + 1).collect()
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Split a PDF into one document per range, in the order given
pub fn split_document(bytes: &[u8], ranges: &[PageRange]) -> Result<Vec<Vec<u8>>, PdfEditError> {
    let doc = Document::load_mem(bytes).map_err(PdfEditError::load)?;
    let page_count = doc.get_pages().len() as u32;

    for range in ranges {
        range.validate(page_count)?;
    }

    ranges
        .iter()
        .map(|range| extract_from(&doc, page_count, &range.page_numbers()))
        .collect()
}

/// Extract only the specified pages (1-indexed) into a new PDF
///
/// Uses "Construction by Whitelist" algorithm:
/// 1. Identify target page objects
/// 2. Traverse dependency graph to find all required resources
/// 3. Build new document with only required objects
/// 4. Rebuild page tree
pub fn extract_pages(bytes: &[u8], pages: Vec<u32>) -> Result<Vec<u8>, PdfEditError> {
    if pages.is_empty() {
        return Err(PdfEditError::InvalidPageRange("No pages specified".into()));
    }

    if pages.contains(&0) {
        return Err(PdfEditError::InvalidPageRange(
            "Page numbers must be >= 1".into(),
        ));
    }

    let doc = Document::load_mem(bytes).map_err(PdfEditError::load)?;
    let page_count = doc.get_pages().len() as u32;

    for &page in &pages {
        if page > page_count {
            return Err(PdfEditError::InvalidPageRange(format!(
                "Page {} does not exist (document has {} pages)",
                page, page_count
            )));
        }
    }

    extract_from(&doc, page_count, &pages)
}

fn extract_from(doc: &Document, page_count: u32, pages: &[u32]) -> Result<Vec<u8>, PdfEditError> {
    let mut new_doc = doc.clone();

    let pages_to_keep: HashSet<u32> = pages.iter().copied().collect();
    let mut pages_to_delete: Vec<u32> = (1..=page_count)
        .filter(|p| !pages_to_keep.contains(p))
        .collect();

    // Delete in reverse order so remaining page numbers stay valid
    pages_to_delete.reverse();
    for page_num in pages_to_delete {
        new_doc.delete_pages(&[page_num]);
    }

    // Compress to remove orphaned objects
    new_doc.prune_objects();
    new_doc.compress();

    let mut buffer = Vec::new();
    new_doc
        .save_to(&mut buffer)
        .map_err(|e| PdfEditError::Operation(format!("Save failed: {}", e)))?;

    Ok(buffer)
}

/// Parse a page range string like "1-3, 5, 8-10" into ranges.
///
/// Input pages are 1-based as shown to users; the returned ranges are
/// 0-based. Order is kept as written, so "4-5, 1-2" yields two ranges in
/// that order.
pub fn parse_ranges(input: &str) -> Result<Vec<PageRange>, PdfEditError> {
    let mut ranges = Vec::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (parse_page(start)?, parse_page(end)?),
            None => {
                let page = parse_page(part)?;
                (page, page)
            }
        };

        if start > end {
            return Err(PdfEditError::InvalidPageRange(format!(
                "Start {} > end {}",
                start, end
            )));
        }

        ranges.push(PageRange::new(start - 1, end - 1));
    }

    if ranges.is_empty() {
        return Err(PdfEditError::InvalidPageRange("No pages specified".into()));
    }

    Ok(ranges)
}

fn parse_page(s: &str) -> Result<u32, PdfEditError> {
    let s = s.trim();
    match s.parse::<u32>() {
        Ok(0) => Err(PdfEditError::InvalidPageRange(
            "Page numbers must be >= 1".into(),
        )),
        Ok(page) => Ok(page),
        Err(_) => Err(PdfEditError::InvalidPageRange(format!(
            "Invalid page: {}",
            s
        ))),
    }
}
