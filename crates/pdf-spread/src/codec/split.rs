//! Splitting a document into single-page units

use super::canvas::install_page_tree;
use super::xobject::copy_object_deep;
use crate::constants::PDF_VERSION;
use crate::types::{Result, SpreadError};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

/// Attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Page keys that point back into the source document's page structure
const SKIPPED_KEYS: [&[u8]; 3] = [b"Parent", b"Annots", b"B"];

/// Action types that jump to a page of the source document
const INTERNAL_ACTIONS: [&[u8]; 1] = [b"GoTo"];

/// Guard against malformed page trees whose Parent chain loops
const MAX_TREE_DEPTH: usize = 64;

/// Decode `bytes` and split it into one document per page, in page order.
pub fn decode(bytes: &[u8]) -> Result<Vec<Document>> {
    let source = Document::load_mem(bytes).map_err(|e| SpreadError::Decode(e.to_string()))?;

    source
        .get_pages()
        .into_values()
        .enumerate()
        .map(|(index, page_id)| {
            extract_page(&source, page_id).map_err(|e| {
                SpreadError::Decode(format!("page {} could not be split: {}", index + 1, e))
            })
        })
        .collect()
}

/// Copy one page, and everything it references, into a new document.
fn extract_page(source: &Document, page_id: ObjectId) -> Result<Document> {
    let page_dict = source.get_dictionary(page_id)?;

    let mut unit = Document::with_version(PDF_VERSION);
    let pages_id = unit.new_object_id();
    let new_page_id = unit.new_object_id();

    // References back to the page itself, such as an annotation's /P
    let mut cache = HashMap::from([(page_id, new_page_id)]);

    let mut new_page = Dictionary::new();
    for (key, value) in page_dict.iter() {
        if SKIPPED_KEYS.contains(&key.as_slice()) {
            continue;
        }
        new_page.set(
            key.clone(),
            copy_object_deep(&mut unit, source, value, &mut cache)?,
        );
    }

    for key in INHERITABLE_KEYS {
        if new_page.get(key).is_ok() {
            continue;
        }
        if let Some(value) = inherited_attribute(source, page_dict, key) {
            new_page.set(key, copy_object_deep(&mut unit, source, value, &mut cache)?);
        }
    }

    if let Ok(annots) = page_dict.get(b"Annots") {
        let carried = carried_annotations(source, annots);
        if !carried.is_empty() {
            let annots = copy_object_deep(&mut unit, source, &Object::Array(carried), &mut cache)?;
            new_page.set("Annots", annots);
        }
    }

    new_page.set("Parent", Object::Reference(pages_id));
    unit.objects.insert(new_page_id, Object::Dictionary(new_page));

    install_page_tree(&mut unit, pages_id, &[new_page_id]);
    Ok(unit)
}

/// Annotations that stay valid on a single-page unit.
///
/// Links into other pages of the source are dropped; their targets do not
/// exist in the unit.
fn carried_annotations(source: &Document, annots: &Object) -> Vec<Object> {
    let Ok(entries) = deref(source, annots).as_array() else {
        return Vec::new();
    };

    let (carried, dropped): (Vec<Object>, Vec<Object>) = entries
        .iter()
        .cloned()
        .partition(|entry| !links_into_source(source, entry));
    if !dropped.is_empty() {
        log::debug!("Dropped {} internal link annotation(s)", dropped.len());
    }
    carried
}

fn links_into_source(source: &Document, annot: &Object) -> bool {
    let Ok(dict) = deref(source, annot).as_dict() else {
        return false;
    };
    if dict.has(b"Dest") {
        return true;
    }

    dict.get(b"A")
        .ok()
        .and_then(|action| deref(source, action).as_dict().ok())
        .and_then(|action| action.get(b"S").and_then(Object::as_name).ok())
        .is_some_and(|kind| INTERNAL_ACTIONS.contains(&kind))
}

fn deref<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Look up `key` on the page's ancestors
fn inherited_attribute<'a>(
    doc: &'a Document,
    page_dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = page_dict;
    for _ in 0..MAX_TREE_DEPTH {
        let parent_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
    }
    None
}
