//! Property-based tests for document operations
//!
//! PDF generation is slow-ish, so case counts are kept low.

mod common;

use common::{create_labeled_pdf, page_count, page_label};
use pdfedit_core::{
    add_text, get_page_count, merge_documents, split_document, CoordinateMapper, PageRange,
    PageSize, PdfPoint, ScreenPoint, ScreenRect,
};
use proptest::prelude::*;

/// A page count and a list of cut points splitting it into contiguous ranges
fn pages_and_ranges() -> impl Strategy<Value = (u32, Vec<PageRange>)> {
    (1u32..=8).prop_flat_map(|pages| {
        prop::collection::vec(any::<bool>(), pages as usize).prop_map(move |cuts| {
            let mut ranges = Vec::new();
            let mut start = 0;
            for page in 0..pages {
                let last = page + 1 == pages;
                if last || cuts[page as usize] {
                    ranges.push(PageRange::new(start, page));
                    start = page + 1;
                }
            }
            (pages, ranges)
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn page_count_matches_construction(pages in 1u32..=12) {
        let pdf = create_labeled_pdf(pages, "P");
        prop_assert_eq!(get_page_count(&pdf).unwrap(), pages);
    }

    #[test]
    fn merge_count_is_sum(sizes in prop::collection::vec(1u32..=4, 1..=4)) {
        let inputs: Vec<Vec<u8>> = sizes
            .iter()
            .enumerate()
            .map(|(i, &n)| create_labeled_pdf(n, &format!("D{}", i)))
            .collect();
        let merged = merge_documents(&inputs).unwrap();

        prop_assert_eq!(page_count(&merged), sizes.iter().sum::<u32>());

        let mut page = 1;
        for (i, &n) in sizes.iter().enumerate() {
            for k in 1..=n {
                prop_assert_eq!(page_label(&merged, page), format!("D{} Page {}", i, k));
                page += 1;
            }
        }
    }

    #[test]
    fn split_then_merge_restores_pages((pages, ranges) in pages_and_ranges()) {
        let pdf = create_labeled_pdf(pages, "R");
        let parts = split_document(&pdf, &ranges).unwrap();
        prop_assert_eq!(parts.len(), ranges.len());

        for (part, range) in parts.iter().zip(&ranges) {
            prop_assert_eq!(page_count(part), range.len());
        }

        let merged = merge_documents(&parts).unwrap();
        prop_assert_eq!(page_count(&merged), pages);
        for page in 1..=pages {
            prop_assert_eq!(page_label(&merged, page), format!("R Page {}", page));
        }
    }

    #[test]
    fn text_keeps_page_count(
        pages in 1u32..=5,
        target in 0u32..5,
        x in 0.0f64..612.0,
        y in 0.0f64..792.0,
    ) {
        let target = target % pages;
        let pdf = create_labeled_pdf(pages, "T");
        let edited = add_text(&pdf, "note", PdfPoint { x, y }, target).unwrap();
        prop_assert_eq!(page_count(&edited), pages);
    }

    #[test]
    fn bottom_left_click_maps_to_offset_only(
        left in -500.0f64..500.0,
        top in -500.0f64..500.0,
        width in 1.0f64..2000.0,
        height in 1.0f64..2000.0,
    ) {
        let mapper = CoordinateMapper::new(0.0);
        let rect = ScreenRect { left, top, width, height };
        let page = PageSize { width: 612.0, height: 792.0 };

        let point = mapper
            .screen_to_pdf(ScreenPoint { x: left, y: top + height }, rect, page)
            .unwrap();
        prop_assert!(point.x.abs() < 1e-9);
        prop_assert!(point.y.abs() < 1e-6);
    }
}
