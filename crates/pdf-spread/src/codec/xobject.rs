//! XObject creation for page embedding
//!
//! This module handles creating Form XObjects from single-page units,
//! which are then drawn onto new pages with a transformation.

use crate::geometry::{Affine, PageRect, rotation_transform};
use crate::types::{Result, SpreadError, TurnDirection};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

// =============================================================================
// XObject Creation
// =============================================================================

/// Create a Form XObject from a source page.
///
/// The form's BBox is the page's MediaBox. The form `Matrix` moves the box
/// to the origin and applies the page's `/Rotate`, so callers can treat
/// every page as spanning `0,0 .. w,h` of its displayed size.
///
/// # Arguments
/// * `output` - The document to add the XObject to
/// * `source` - The document containing the page
/// * `page_id` - The object ID of the source page
/// * `cache` - Objects already copied from `source`
pub(crate) fn create_page_xobject(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<ObjectId> {
    let page_dict = source.get_dictionary(page_id)?;
    let [llx, lly, urx, ury] = media_box(source, page_dict)?;

    let content_data = get_page_content(source, page_dict)?;

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("FormType", Object::Integer(1));
    xobject_dict.set(
        "BBox",
        Object::Array(vec![
            Object::Real(llx),
            Object::Real(lly),
            Object::Real(urx),
            Object::Real(ury),
        ]),
    );
    let matrix = display_matrix([llx, lly, urx, ury], page_rotation(source, page_dict));
    if !matrix.is_identity() {
        xobject_dict.set(
            "Matrix",
            Object::Array(matrix.to_array().into_iter().map(Object::Real).collect()),
        );
    }

    if let Ok(resources) = page_dict.get(b"Resources") {
        xobject_dict.set(
            "Resources",
            copy_object_deep(output, source, resources, cache)?,
        );
    }

    Ok(output.add_object(Stream::new(xobject_dict, content_data)))
}

// =============================================================================
// Page Content Extraction
// =============================================================================

/// Get the content stream data from a page.
fn get_page_content(doc: &Document, page_dict: &Dictionary) -> Result<Vec<u8>> {
    let contents = match page_dict.get(b"Contents") {
        Ok(c) => c,
        Err(_) => return Ok(Vec::new()), // No content = blank page
    };

    match contents {
        Object::Reference(id) => match doc.get_object(*id)? {
            Object::Array(arr) => get_concatenated_content_streams(doc, arr),
            Object::Stream(stream) => Ok(stream_data(stream)),
            _ => Ok(Vec::new()),
        },
        Object::Array(arr) => get_concatenated_content_streams(doc, arr),
        _ => Ok(Vec::new()),
    }
}

/// Concatenate multiple content streams
fn get_concatenated_content_streams(doc: &Document, refs: &[Object]) -> Result<Vec<u8>> {
    let mut result = Vec::new();

    for obj in refs {
        if let Object::Reference(id) = obj {
            if let Ok(stream) = doc.get_object(*id)?.as_stream() {
                result.extend_from_slice(&stream_data(stream));
                result.push(b'\n');
            }
        }
    }

    Ok(result)
}

fn stream_data(stream: &Stream) -> Vec<u8> {
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

// =============================================================================
// Deep Copy
// =============================================================================

/// Deep copy an object from source to output document, following references.
///
/// Each referenced object is copied once per cache. The target id is reserved
/// before descending, so reference cycles terminate.
pub fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            let new_id = output.new_object_id();
            cache.insert(*id, new_id);

            let referenced = source.get_object(*id)?;
            let copied = copy_object_deep(output, source, referenced, cache)?;
            output.objects.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(arr) => {
            let new_arr: Result<Vec<_>> = arr
                .iter()
                .map(|item| copy_object_deep(output, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Stream(Stream {
                dict: new_dict,
                content: stream.content.clone(),
                allows_compression: stream.allows_compression,
                start_position: None,
            }))
        }
        _ => Ok(obj.clone()),
    }
}

// =============================================================================
// Page Dimensions
// =============================================================================

/// The object ID of a unit's only page
pub fn single_page_id(doc: &Document) -> Result<ObjectId> {
    doc.get_pages()
        .values()
        .next()
        .copied()
        .ok_or_else(|| SpreadError::CorruptPage("unit has no page".to_string()))
}

/// Size of a unit's page in points, as displayed.
///
/// Width and height are exchanged for a page with `/Rotate` 90 or 270.
pub fn page_rect(doc: &Document) -> Result<PageRect> {
    let page_id = single_page_id(doc)?;
    let page_dict = doc
        .get_dictionary(page_id)
        .map_err(|e| SpreadError::CorruptPage(e.to_string()))?;
    let [llx, lly, urx, ury] = media_box(doc, page_dict)?;

    let rect = PageRect::new(urx - llx, ury - lly);
    match page_rotation(doc, page_dict) {
        90 | 270 => Ok(rect.swapped()),
        _ => Ok(rect),
    }
}

/// The page's `/Rotate` as one of 0, 90, 180 or 270
pub fn page_rotation(doc: &Document, page_dict: &Dictionary) -> i64 {
    let Some(degrees) = page_dict
        .get(b"Rotate")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_i64().ok())
    else {
        return 0;
    };

    let normalized = degrees.rem_euclid(360);
    if normalized % 90 != 0 {
        log::warn!("Ignoring /Rotate {} (not a multiple of 90)", degrees);
        return 0;
    }
    normalized
}

/// Map a MediaBox to `0,0 .. w,h` of the page as displayed.
///
/// `/Rotate` turns the page clockwise for display.
fn display_matrix(media_box: [f32; 4], rotation: i64) -> Affine {
    let [llx, lly, urx, ury] = media_box;
    let rect = PageRect::new(urx - llx, ury - lly);
    let to_origin = Affine::translate(-llx, -lly);

    let turn = match rotation {
        90 => rotation_transform(rect, TurnDirection::Right).transform,
        180 => Affine::new(-1.0, 0.0, 0.0, -1.0, rect.width, rect.height),
        270 => rotation_transform(rect, TurnDirection::Left).transform,
        _ => Affine::IDENTITY,
    };
    to_origin.then(turn)
}

fn media_box(doc: &Document, page_dict: &Dictionary) -> Result<[f32; 4]> {
    let corrupt = |reason: &str| SpreadError::CorruptPage(format!("MediaBox {}", reason));

    let mb = page_dict
        .get(b"MediaBox")
        .map_err(|_| corrupt("is missing"))?;
    let mb = resolve(doc, mb)
        .as_array()
        .map_err(|_| corrupt("is not an array"))?;
    if mb.len() != 4 {
        return Err(corrupt("does not have four entries"));
    }

    let mut values = [0.0; 4];
    for (value, obj) in values.iter_mut().zip(mb) {
        *value = extract_number(resolve(doc, obj)).ok_or_else(|| corrupt("is not numeric"))?;
    }

    // Normalize corner order
    let [x0, y0, x1, y1] = values;
    let normalized = [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)];
    if normalized[2] - normalized[0] <= 0.0 || normalized[3] - normalized[1] <= 0.0 {
        return Err(corrupt("is empty"));
    }

    Ok(normalized)
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Extract numeric value from a PDF object
fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
