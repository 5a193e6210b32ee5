//! Transform execution
//!
//! Applies geometry decisions to page units through the codec.
//! Rotate and resize rewrite a unit's file in place; a spread is written
//! to a brand-new unit and leaves its two inputs untouched. [`redraw`]
//! works purely in memory.

use crate::codec::{self, PageCanvas};
use crate::geometry::{SpreadLayout, TransformDecision};
use crate::types::Result;
use crate::unit::PageUnit;
use lopdf::Document;
use std::path::Path;

/// Draw `source` onto a new page of `decision.target`.
pub fn redraw(source: &Document, decision: &TransformDecision) -> Result<Document> {
    let mut canvas = PageCanvas::new(decision.target);
    canvas.embed_layer(source, decision.transform)?;
    Ok(canvas.finish())
}

/// Redraw `source` onto a page of `decision.target` and save it over `path`.
pub fn rewrite_unit(path: &Path, source: &Document, decision: &TransformDecision) -> Result<()> {
    let mut doc = redraw(source, decision)?;
    codec::persist(&mut doc, path)
}

/// Draw `left` and `right` side by side into a new unit.
pub fn compose_spread(left: &Document, right: &Document, layout: &SpreadLayout) -> Result<PageUnit> {
    let mut canvas = PageCanvas::new(layout.spread);
    canvas.embed_layer(left, layout.left)?;
    canvas.embed_layer(right, layout.right)?;
    let mut doc = canvas.finish();
    PageUnit::create(&mut doc)
}
