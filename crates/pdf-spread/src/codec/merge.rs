//! Merging page units into the output document
//!
//! Each unit's objects are imported with their IDs offset past everything
//! already in the destination, and its page is re-parented under a single
//! page tree in sequence order.

use super::canvas::install_page_tree;
use super::xobject::single_page_id;
use crate::constants::PDF_VERSION;
use crate::types::{DocumentInfo, Result, SpreadError};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use std::collections::HashSet;

/// Merge single-page units, in order, into one document carrying `info`.
pub fn merge_all(units: Vec<Document>, info: &DocumentInfo) -> Result<Document> {
    if units.is_empty() {
        return Err(SpreadError::NoPages);
    }

    let mut dest = Document::with_version(PDF_VERSION);
    let pages_id = dest.new_object_id();
    let mut page_ids = Vec::with_capacity(units.len());

    for (index, unit) in units.into_iter().enumerate() {
        let merge_error =
            |e: SpreadError| SpreadError::Merge(format!("page {}: {}", index + 1, e));

        let page_id = single_page_id(&unit).map_err(merge_error)?;
        let skipped = page_tree_ids(&unit);
        let id_offset = dest.max_id;
        let unit_max_id = unit.max_id;

        for (old_id, object) in unit.objects {
            if skipped.contains(&old_id) {
                continue;
            }
            dest.objects
                .insert(offset_id(old_id, id_offset), remap_object_refs(object, id_offset));
        }
        dest.max_id = id_offset + unit_max_id;

        let new_page_id = offset_id(page_id, id_offset);
        match dest.objects.get_mut(&new_page_id) {
            Some(Object::Dictionary(page_dict)) => {
                page_dict.set("Parent", Object::Reference(pages_id));
            }
            _ => {
                return Err(merge_error(SpreadError::CorruptPage(
                    "page is not a dictionary".to_string(),
                )));
            }
        }
        page_ids.push(new_page_id);
    }

    install_page_tree(&mut dest, pages_id, &page_ids);

    let info_id = dest.add_object(Dictionary::from_iter(vec![
        ("Author", text_string(&info.author)),
        ("Creator", text_string(&info.creator)),
        ("Producer", text_string(&info.producer)),
    ]));
    dest.trailer.set("Info", Object::Reference(info_id));

    dest.compress();
    Ok(dest)
}

/// IDs of a unit's Catalog and Pages root, which the merged tree replaces
fn page_tree_ids(doc: &Document) -> HashSet<ObjectId> {
    let mut ids = HashSet::new();
    if let Ok(catalog_id) = doc.trailer.get(b"Root").and_then(Object::as_reference) {
        ids.insert(catalog_id);
        if let Ok(pages_id) = doc
            .get_dictionary(catalog_id)
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
        {
            ids.insert(pages_id);
        }
    }
    ids
}

fn offset_id(id: ObjectId, offset: u32) -> ObjectId {
    (id.0 + offset, id.1)
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference(offset_id(id, offset)),
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

/// A PDF text string: literal for ASCII, UTF-16BE with byte order mark otherwise
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
