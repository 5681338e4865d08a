//! Shared fixtures for pdfedit-core integration tests

#![allow(dead_code)]

use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, Stream};
use pdfedit_core::{PdfEditError, Rasterizer, RenderSurface, Viewport};

/// Create a PDF whose pages each draw the label "`prefix` Page `n`"
pub fn create_labeled_pdf(num_pages: u32, prefix: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();

    for i in 0..num_pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
                ),
                Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("{} Page {}", prefix, i + 1).into_bytes(),
                        lopdf::StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(num_pages as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

pub fn page_count(pdf: &[u8]) -> u32 {
    Document::load_mem(pdf).unwrap().get_pages().len() as u32
}

/// Every string shown with `Tj` on page `page_num` (1-based), in order
pub fn page_strings(pdf: &[u8], page_num: u32) -> Vec<String> {
    let doc = Document::load_mem(pdf).unwrap();
    let page_id = doc.get_pages()[&page_num];
    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
    content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| match op.operands.first() {
            Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        })
        .collect()
}

/// Label of page `page_num`, as drawn by [`create_labeled_pdf`]
pub fn page_label(pdf: &[u8], page_num: u32) -> String {
    page_strings(pdf, page_num)
        .into_iter()
        .next()
        .unwrap_or_default()
}

/// Fills the surface with white; enough to exercise the render path
#[derive(Debug, Clone, Copy, Default)]
pub struct BlankRasterizer;

impl Rasterizer for BlankRasterizer {
    fn rasterize(
        &self,
        _pdf: &[u8],
        _page_number: u32,
        viewport: &Viewport,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), PdfEditError> {
        let pixels = vec![255u8; viewport.width as usize * viewport.height as usize * 4];
        surface.draw_rgba(viewport.width, viewport.height, &pixels)
    }
}
