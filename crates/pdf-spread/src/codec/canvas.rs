//! Single-page output documents

use super::xobject::{create_page_xobject, single_page_id};
use crate::constants::PDF_VERSION;
use crate::geometry::{Affine, PageRect};
use crate::types::{Result, SpreadError};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

/// A fresh one-page document that other pages are drawn into.
///
/// Each embedded page becomes its own Form XObject layer, painted in
/// the order it was added.
pub struct PageCanvas {
    doc: Document,
    pages_id: ObjectId,
    rect: PageRect,
    xobjects: Dictionary,
    content_ops: Vec<String>,
}

impl PageCanvas {
    pub fn new(rect: PageRect) -> Self {
        let mut doc = Document::with_version(PDF_VERSION);
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            rect,
            xobjects: Dictionary::new(),
            content_ops: Vec::new(),
        }
    }

    pub fn rect(&self) -> PageRect {
        self.rect
    }

    /// Draw the page of `source` under `transform`.
    pub fn embed_layer(&mut self, source: &Document, transform: Affine) -> Result<()> {
        let layer_name = format!("L{}", self.content_ops.len());
        let embed_error = |e: SpreadError| SpreadError::Embed(format!("{}: {}", layer_name, e));

        let page_id = single_page_id(source).map_err(embed_error)?;
        let mut cache = HashMap::new();
        let xobject_id = create_page_xobject(&mut self.doc, source, page_id, &mut cache)
            .map_err(embed_error)?;

        self.xobjects
            .set(layer_name.as_bytes(), Object::Reference(xobject_id));
        self.content_ops.push(format!(
            "q {} /{} Do Q\n",
            transform.to_cm(),
            layer_name
        ));
        Ok(())
    }

    /// Finish the page and return the document holding it.
    pub fn finish(self) -> Document {
        let PageCanvas {
            mut doc,
            pages_id,
            rect,
            xobjects,
            content_ops,
        } = self;

        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let content = content_ops.join("");
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(rect.width),
                Object::Real(rect.height),
            ]),
        );
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources));
        let page_id = doc.add_object(page_dict);

        install_page_tree(&mut doc, pages_id, &[page_id]);
        doc
    }
}

/// Write the Pages node and Catalog for `page_ids` and point the trailer at them
pub(crate) fn install_page_tree(doc: &mut Document, pages_id: ObjectId, page_ids: &[ObjectId]) {
    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(page_ids.len() as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));

    doc.trailer.set("Root", catalog_id);
}
