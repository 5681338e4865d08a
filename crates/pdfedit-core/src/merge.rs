//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document.

use crate::error::PdfEditError;
use crate::page_info::inherited_attribute;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;
use tracing::debug;

/// Page attributes a page may inherit from its `/Pages` ancestors
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Merge multiple PDFs into one
///
/// The algorithm:
/// 1. If empty, return error
/// 2. Load every input (inputs are only read, never modified)
/// 3. Use the first document as the destination
/// 4. For each further source document:
///    a. Pin inherited attributes onto its pages
///    b. Import all objects with IDs shifted past the destination's
///    c. Append its pages to the destination page list
/// 5. Re-parent every page directly under the root `/Pages` node, drop the
///    now unreachable source catalogs and page trees, compress and save
pub fn merge_documents<B: AsRef<[u8]>>(documents: &[B]) -> Result<Vec<u8>, PdfEditError> {
    if documents.is_empty() {
        return Err(PdfEditError::Operation("No documents to merge".into()));
    }

    let mut loaded_docs = Vec::with_capacity(documents.len());
    for (i, doc_bytes) in documents.iter().enumerate() {
        let doc = Document::load_mem(doc_bytes.as_ref()).map_err(|e| {
            PdfEditError::DocumentLoad(format!("Failed to load document {}: {}", i, e))
        })?;
        loaded_docs.push(doc);
    }

    let mut dest = loaded_docs.remove(0);
    pin_inherited_attributes(&mut dest);
    let mut dest_max_id = dest.max_id;
    let mut dest_page_refs = get_page_references(&dest);

    for mut source in loaded_docs.into_iter() {
        pin_inherited_attributes(&mut source);
        let source_pages = get_page_references(&source);

        // Shift object IDs to avoid conflicts
        let id_offset = dest_max_id;

        let mut remapped_objects = BTreeMap::new();
        for (old_id, object) in source.objects.into_iter() {
            let new_id = (old_id.0 + id_offset, old_id.1);
            remapped_objects.insert(new_id, remap_object_refs(object, id_offset));
        }
        dest.objects.extend(remapped_objects);

        dest_page_refs.extend(
            source_pages
                .into_iter()
                .map(|old_ref| (old_ref.0 + id_offset, old_ref.1)),
        );

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
    }

    dest.max_id = dest_max_id;
    let page_count = dest_page_refs.len();
    update_page_tree(&mut dest, dest_page_refs)?;

    dest.prune_objects();
    dest.compress();

    let mut buffer = Vec::new();
    dest.save_to(&mut buffer).map_err(|e| {
        PdfEditError::Operation(format!("Failed to save merged PDF: {}", e))
    })?;

    debug!(
        inputs = documents.len(),
        pages = page_count,
        bytes = buffer.len(),
        "merged documents"
    );
    Ok(buffer)
}

/// Get all page object references from a document, in page order
fn get_page_references(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

/// Copy inheritable attributes from ancestors onto each page, so that pages
/// keep their size and resources once they are moved to a different parent
fn pin_inherited_attributes(doc: &mut Document) {
    let mut pinned: Vec<(ObjectId, &[u8], Object)> = Vec::new();

    for page_id in get_page_references(doc) {
        let Ok(page) = doc.get_object(page_id).and_then(Object::as_dict) else {
            continue;
        };
        for key in INHERITABLE {
            if page.has(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(doc, page, key) {
                pinned.push((page_id, key, value.clone()));
            }
        }
    }

    for (page_id, key, value) in pinned {
        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            page.set(key.to_vec(), value);
        }
    }
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Make `page_refs` the only kids of the destination's root `/Pages` node
fn update_page_tree(doc: &mut Document, page_refs: Vec<ObjectId>) -> Result<(), PdfEditError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| PdfEditError::Operation("Root is not a reference".into()))?;

    let pages_id = doc
        .get_object(catalog_id)
        .and_then(Object::as_dict)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| PdfEditError::Operation("No Pages in catalog".into()))?;

    for &page_id in &page_refs {
        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    if let Some(Object::Dictionary(ref mut pages_dict)) = doc.objects.get_mut(&pages_id) {
        let count = page_refs.len() as i64;
        let kids = page_refs.into_iter().map(Object::Reference).collect();
        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Count", Object::Integer(count));
    } else {
        return Err(PdfEditError::Operation("Invalid pages dictionary".into()));
    }

    Ok(())
}
