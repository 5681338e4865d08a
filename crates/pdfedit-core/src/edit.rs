//! Drawing text and images onto existing pages
//!
//! Every function here loads its own copy of the input bytes and returns a
//! freshly serialized document; the input is never modified.
//!
//! New drawing is appended as an extra content stream. The page's existing
//! content is bracketed with `q`/`Q` first so that any graphics state it
//! leaves behind (transforms, colours) cannot leak into the overlay.

use crate::coords::PdfPoint;
use crate::error::PdfEditError;
use crate::image::{embed_image, ImageKind};
use crate::page_info::inherited_attribute;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

/// Size used by [`add_text`]
pub const DEFAULT_FONT_SIZE: f64 = 12.0;

/// Box used by [`add_image`], in points
pub const DEFAULT_IMAGE_SIZE: (f64, f64) = (100.0, 100.0);

/// Line spacing for multi-line text, as a multiple of the font size
const LINE_HEIGHT: f64 = 1.2;

const STANDARD_FONT: &[u8] = b"Helvetica";
const WIN_ANSI: &[u8] = b"WinAnsiEncoding";

/// RGB colour with components in 0..=1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    /// Parse hex color string (e.g., "#FF0000" or "FF0000"), black if malformed
    pub fn from_hex(color: &str) -> Self {
        let hex = color.trim_start_matches('#');
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .map(|v| v as f64 / 255.0)
        };
        match (channel(0..2), channel(2..4), channel(4..6)) {
            (Some(r), Some(g), Some(b)) => Rgb { r, g, b },
            _ => Rgb::BLACK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    pub color: Rgb,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            color: Rgb::BLACK,
        }
    }
}

/// Draw `text` at `point` on the page at `page_index` (0-based), 12pt black Helvetica
pub fn add_text(
    pdf_bytes: &[u8],
    text: &str,
    point: PdfPoint,
    page_index: u32,
) -> Result<Vec<u8>, PdfEditError> {
    add_text_styled(pdf_bytes, text, point, page_index, &TextStyle::default())
}

pub fn add_text_styled(
    pdf_bytes: &[u8],
    text: &str,
    point: PdfPoint,
    page_index: u32,
    style: &TextStyle,
) -> Result<Vec<u8>, PdfEditError> {
    let mut doc = Document::load_mem(pdf_bytes).map_err(PdfEditError::load)?;
    let page_id = page_id(&doc, page_index)?;

    let font_name = ensure_standard_font(&mut doc, page_id)?;

    let leading = style.font_size * LINE_HEIGHT;
    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "rg",
            vec![
                real(style.color.r),
                real(style.color.g),
                real(style.color.b),
            ],
        ),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(font_name.clone()), real(style.font_size)],
        ),
        Operation::new("TL", vec![real(leading)]),
        Operation::new(
            "Tm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                real(point.x),
                real(point.y),
            ],
        ),
    ];
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            ops.push(Operation::new("T*", vec![]));
        }
        let encoded = encode_win_ansi(line.trim_end_matches('\r'));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encoded, StringFormat::Hexadecimal)],
        ));
    }
    ops.push(Operation::new("ET", vec![]));
    ops.push(Operation::new("Q", vec![]));

    append_content(&mut doc, page_id, ops)?;
    debug!(page_index, chars = text.chars().count(), "drew text");
    save(&mut doc)
}

/// Draw an image at `point` on the page at `page_index` (0-based) in a 100x100 box
pub fn add_image(
    pdf_bytes: &[u8],
    image_bytes: &[u8],
    point: PdfPoint,
    page_index: u32,
    kind: ImageKind,
) -> Result<Vec<u8>, PdfEditError> {
    add_image_sized(
        pdf_bytes,
        image_bytes,
        point,
        page_index,
        kind,
        DEFAULT_IMAGE_SIZE,
    )
}

pub fn add_image_sized(
    pdf_bytes: &[u8],
    image_bytes: &[u8],
    point: PdfPoint,
    page_index: u32,
    kind: ImageKind,
    (width, height): (f64, f64),
) -> Result<Vec<u8>, PdfEditError> {
    let mut doc = Document::load_mem(pdf_bytes).map_err(PdfEditError::load)?;
    let page_id = page_id(&doc, page_index)?;

    let image_id = embed_image(&mut doc, image_bytes, kind)?;

    let mut xobjects = resource_category(&mut doc, page_id, b"XObject")?;
    let name = unused_name(&xobjects, "Im");
    xobjects.set(name.clone(), Object::Reference(image_id));
    set_resource_category(&mut doc, page_id, b"XObject", xobjects)?;

    let ops = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                real(width),
                0.into(),
                0.into(),
                real(height),
                real(point.x),
                real(point.y),
            ],
        ),
        Operation::new("Do", vec![Object::Name(name)]),
        Operation::new("Q", vec![]),
    ];

    append_content(&mut doc, page_id, ops)?;
    debug!(page_index, ?kind, "drew image");
    save(&mut doc)
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn page_id(doc: &Document, page_index: u32) -> Result<ObjectId, PdfEditError> {
    let pages = doc.get_pages();
    page_index
        .checked_add(1)
        .and_then(|page_num| pages.get(&page_num))
        .copied()
        .ok_or(PdfEditError::InvalidPageIndex {
            index: page_index,
            page_count: pages.len() as u32,
        })
}

fn save(doc: &mut Document) -> Result<Vec<u8>, PdfEditError> {
    let mut output = Vec::new();
    doc.save_to(&mut output).map_err(PdfEditError::operation)?;
    Ok(output)
}

/// Find a Helvetica font in the page resources, adding one if missing.
/// Returns the resource name to select it with.
fn ensure_standard_font(doc: &mut Document, page_id: ObjectId) -> Result<Vec<u8>, PdfEditError> {
    let mut fonts = resource_category(doc, page_id, b"Font")?;

    let existing = fonts.iter().find_map(|(name, value)| {
        let font = match value {
            Object::Reference(id) => doc.get_object(*id).and_then(Object::as_dict).ok(),
            Object::Dictionary(d) => Some(d),
            _ => None,
        }?;
        let base = font.get(b"BaseFont").and_then(Object::as_name).ok()?;
        let encoding = font.get(b"Encoding").and_then(Object::as_name).ok()?;
        (base == STANDARD_FONT && encoding == WIN_ANSI).then(|| name.clone())
    });
    if let Some(name) = existing {
        return Ok(name);
    }

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(STANDARD_FONT.to_vec()),
        "Encoding" => "WinAnsiEncoding",
    });
    let name = unused_name(&fonts, "F");
    fonts.set(name.clone(), Object::Reference(font_id));
    set_resource_category(doc, page_id, b"Font", fonts)?;
    Ok(name)
}

/// Return the page's own `/Resources` dictionary, materialising it inline.
///
/// Resources that are indirect or inherited from a `/Pages` ancestor may be
/// shared with other pages, so they are copied onto the page before any
/// change is made.
fn page_resources_mut(
    doc: &mut Document,
    page_id: ObjectId,
) -> Result<&mut Dictionary, PdfEditError> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(PdfEditError::operation)?;

    let inline_copy = if matches!(page.get(b"Resources"), Ok(Object::Dictionary(_))) {
        None
    } else {
        match inherited_attribute(doc, page, b"Resources") {
            Some(Object::Dictionary(d)) => Some(d.clone()),
            Some(Object::Reference(id)) => Some(
                doc.get_object(*id)
                    .and_then(Object::as_dict)
                    .cloned()
                    .map_err(PdfEditError::operation)?,
            ),
            _ => Some(Dictionary::new()),
        }
    };

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(PdfEditError::operation)?;
    if let Some(resources) = inline_copy {
        page.set("Resources", Object::Dictionary(resources));
    }

    page.get_mut(b"Resources")
        .and_then(Object::as_dict_mut)
        .map_err(PdfEditError::operation)
}

/// Copy of a resource category (`/Font`, `/XObject`) with indirection resolved
fn resource_category(
    doc: &mut Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Dictionary, PdfEditError> {
    let category = page_resources_mut(doc, page_id)?.get(key).ok().cloned();
    Ok(match category {
        Some(Object::Dictionary(d)) => d,
        Some(Object::Reference(id)) => doc
            .get_object(id)
            .and_then(Object::as_dict)
            .cloned()
            .unwrap_or_else(|_| Dictionary::new()),
        _ => Dictionary::new(),
    })
}

fn set_resource_category(
    doc: &mut Document,
    page_id: ObjectId,
    key: &[u8],
    value: Dictionary,
) -> Result<(), PdfEditError> {
    let resources = page_resources_mut(doc, page_id)?;
    resources.set(key.to_vec(), Object::Dictionary(value));
    Ok(())
}

/// First `{prefix}{n}` not already used as a key
fn unused_name(dict: &Dictionary, prefix: &str) -> Vec<u8> {
    (1..)
        .map(|n| format!("{}{}", prefix, n).into_bytes())
        .find(|name| !dict.has(name))
        .unwrap_or_else(|| prefix.as_bytes().to_vec())
}

/// Wrap the page's existing content in `q`/`Q` and append `ops` after it
fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    ops: Vec<Operation>,
) -> Result<(), PdfEditError> {
    let overlay = Content { operations: ops }
        .encode()
        .map_err(PdfEditError::operation)?;

    let existing = {
        let page = doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(PdfEditError::operation)?;
        match page.get(b"Contents") {
            // An indirect array of content streams, not a stream itself
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(refs)) => refs.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(refs)) => refs.clone(),
            _ => Vec::new(),
        }
    };

    let mut contents = Vec::with_capacity(existing.len() + 2);
    if !existing.is_empty() {
        let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        contents.push(Object::Reference(open_id));
        contents.extend(existing);
    }

    let mut closing = if contents.is_empty() {
        Vec::new()
    } else {
        b"Q\n".to_vec()
    };
    closing.extend(overlay);
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), closing));
    contents.push(Object::Reference(overlay_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(PdfEditError::operation)?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// Encode text for a WinAnsiEncoding simple font; unmappable characters become `?`
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::fixtures::{jpeg_header_only, rgba_png};

    fn create_test_pdf(num_pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for i in 0..num_pages {
            let content = format!("BT /F1 12 Tf 50 700 Td (Page-{}) Tj ET", i + 1);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => Object::Reference(content_id),
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => num_pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn page_content(pdf: &[u8], page_num: u32) -> String {
        let doc = Document::load_mem(pdf).unwrap();
        let page_id = doc.get_pages()[&page_num];
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let refs = match page.get(b"Contents").unwrap() {
            Object::Array(refs) => refs.clone(),
            other => vec![other.clone()],
        };
        let mut out = Vec::new();
        for r in refs {
            let stream = doc
                .get_object(r.as_reference().unwrap())
                .unwrap()
                .as_stream()
                .unwrap();
            out.extend(
                stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone()),
            );
            out.push(b'\n');
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    fn page_resources(pdf: &[u8], page_num: u32) -> (Document, Dictionary) {
        let doc = Document::load_mem(pdf).unwrap();
        let page_id = doc.get_pages()[&page_num];
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap().clone();
        (doc, resources)
    }

    #[test]
    fn test_add_text_draws_on_requested_page_only() {
        let pdf = create_test_pdf(3);
        let out = add_text(&pdf, "Hello", PdfPoint { x: 72.0, y: 500.0 }, 2).unwrap();

        assert!(out.starts_with(b"%PDF-"));
        let doc = Document::load_mem(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 3);

        let third = page_content(&out, 3);
        assert!(third.contains("Tj"));
        assert!(third.to_uppercase().contains("<48656C6C6F>"));
        assert!(third.contains("Page-3"));
        assert!(!page_content(&out, 1).to_uppercase().contains("<48656C6C6F>"));
    }

    #[test]
    fn test_add_text_leaves_input_untouched() {
        let pdf = create_test_pdf(1);
        let before = pdf.clone();
        let out = add_text(&pdf, "x", PdfPoint { x: 0.0, y: 0.0 }, 0).unwrap();
        assert_eq!(pdf, before);
        assert_ne!(out, pdf);
    }

    #[test]
    fn test_add_text_embeds_helvetica_once() {
        let pdf = create_test_pdf(1);
        let once = add_text(&pdf, "one", PdfPoint { x: 10.0, y: 10.0 }, 0).unwrap();
        let twice = add_text(&once, "two", PdfPoint { x: 10.0, y: 30.0 }, 0).unwrap();

        let (doc, resources) = page_resources(&twice, 1);
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert_eq!(fonts.len(), 1);
        let (_, font_ref) = fonts.iter().next().unwrap();
        let font = doc
            .get_object(font_ref.as_reference().unwrap())
            .unwrap()
            .as_dict()
            .unwrap();
        assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
    }

    /// One page whose `/Contents` points at an indirect array of streams,
    /// with an optional font already in its resources
    fn create_indirect_contents_pdf(font: Option<Dictionary>) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let stream_id = doc.add_object(Stream::new(
            Dictionary::new(),
            b"BT /F1 12 Tf 50 700 Td (Alpha) Tj ET".to_vec(),
        ));
        let array_id = doc.add_object(Object::Array(vec![Object::Reference(stream_id)]));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => Object::Reference(array_id),
        };
        if let Some(font) = font {
            let font_id = doc.add_object(font);
            page.set(
                "Resources",
                dictionary! { "Font" => dictionary! { "F1" => Object::Reference(font_id) } },
            );
        }
        let page_id = doc.add_object(page);
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_add_text_keeps_indirect_content_array() {
        let pdf = create_indirect_contents_pdf(None);
        let out = add_text(&pdf, "Hello", PdfPoint { x: 72.0, y: 500.0 }, 0).unwrap();

        let content = page_content(&out, 1).to_uppercase();
        let original = content.find("(ALPHA) TJ").unwrap();
        let overlay = content.find("<48656C6C6F>").unwrap();
        assert!(original < overlay);
    }

    #[test]
    fn test_add_text_skips_helvetica_with_other_encoding() {
        let mac_roman = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "MacRomanEncoding",
        };
        let pdf = create_indirect_contents_pdf(Some(mac_roman));
        let out = add_text(&pdf, "café", PdfPoint { x: 10.0, y: 10.0 }, 0).unwrap();

        let (doc, resources) = page_resources(&out, 1);
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert_eq!(fonts.len(), 2);
        let added = fonts.get(b"F2").unwrap().as_reference().unwrap();
        let font = doc.get_object(added).unwrap().as_dict().unwrap();
        assert_eq!(
            font.get(b"Encoding").unwrap().as_name().unwrap(),
            b"WinAnsiEncoding"
        );
        assert!(page_content(&out, 1).contains("/F2"));
    }

    #[test]
    fn test_add_text_multiline_uses_leading() {
        let pdf = create_test_pdf(1);
        let out = add_text(&pdf, "a\nb", PdfPoint { x: 10.0, y: 10.0 }, 0).unwrap();
        let content = page_content(&out, 1);
        assert!(content.contains("T*"));
        assert!(content.contains("TL"));
    }

    #[test]
    fn test_add_text_out_of_range_page() {
        let pdf = create_test_pdf(2);
        let err = add_text(&pdf, "x", PdfPoint { x: 0.0, y: 0.0 }, 2).unwrap_err();
        assert_eq!(
            err,
            PdfEditError::InvalidPageIndex {
                index: 2,
                page_count: 2
            }
        );
    }

    #[test]
    fn test_add_text_malformed_pdf() {
        let err = add_text(b"not a pdf", "x", PdfPoint { x: 0.0, y: 0.0 }, 0).unwrap_err();
        assert!(matches!(err, PdfEditError::DocumentLoad(_)));
    }

    #[test]
    fn test_add_image_png_draws_xobject() {
        let pdf = create_test_pdf(2);
        let out = add_image(
            &pdf,
            &rgba_png(3, 3),
            PdfPoint { x: 50.0, y: 60.0 },
            0,
            ImageKind::Png,
        )
        .unwrap();

        let doc = Document::load_mem(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
        let content = page_content(&out, 1);
        assert!(content.contains("Do"));
        assert!(content.contains(" cm"));

        let (_, resources) = page_resources(&out, 1);
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        assert!(xobjects.has(b"Im1"));
    }

    #[test]
    fn test_add_image_twice_uses_distinct_names() {
        let pdf = create_test_pdf(1);
        let jpeg = jpeg_header_only(4, 4, 3);
        let p = PdfPoint { x: 0.0, y: 0.0 };
        let once = add_image(&pdf, &jpeg, p, 0, ImageKind::Jpeg).unwrap();
        let twice = add_image(&once, &jpeg, p, 0, ImageKind::Jpeg).unwrap();

        let (_, resources) = page_resources(&twice, 1);
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        assert!(xobjects.has(b"Im1"));
        assert!(xobjects.has(b"Im2"));
    }

    #[test]
    fn test_add_image_bad_bytes() {
        let pdf = create_test_pdf(1);
        let err = add_image(
            &pdf,
            b"garbage",
            PdfPoint { x: 0.0, y: 0.0 },
            0,
            ImageKind::Png,
        )
        .unwrap_err();
        assert!(matches!(err, PdfEditError::ImageDecode(_)));
    }

    #[test]
    fn test_rgb_from_hex() {
        assert_eq!(Rgb::from_hex("#000000"), Rgb::BLACK);
        assert_eq!(Rgb::from_hex("FF0000"), Rgb { r: 1.0, g: 0.0, b: 0.0 });
        assert_eq!(Rgb::from_hex("#12"), Rgb::BLACK);
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Hi!"), b"Hi!".to_vec());
        assert_eq!(encode_win_ansi("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("€ 日"), vec![0x80, b' ', b'?']);
    }
}
