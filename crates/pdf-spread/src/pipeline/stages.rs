//! Per-page and per-pair work
//!
//! These run on the blocking pool, one call per page (rotate, resize) or
//! per pair (combine). Rotate and resize rewrite only the file they are
//! given; combine reads its two files and writes a new one.

use crate::codec;
use crate::executor;
use crate::geometry::{
    PageRect, TransformDecision, decide_rotation, fit_transform, pair_layout, rotation_transform,
};
use crate::types::*;
use crate::unit::PageUnit;
use lopdf::Document;
use std::path::{Path, PathBuf};

/// Quarter-turn the unit at `path` if it does not have the wanted orientation.
///
/// Returns whether the unit was rewritten.
pub(crate) fn rotate_page(
    path: &Path,
    wanted: Orientation,
    direction: TurnDirection,
) -> Result<bool> {
    let source = open_unit(path)?;
    let Some(decision) = turn_decision(&source, wanted, direction)? else {
        return Ok(false);
    };

    executor::rewrite_unit(path, &source, &decision)?;
    log::debug!(
        "Turned {} {:?} to {}x{}",
        path.display(),
        direction,
        decision.target.width,
        decision.target.height
    );
    Ok(true)
}

/// Fit the unit at `path` into `target`.
///
/// Returns whether the unit was rewritten; an exact size match is left
/// byte-for-byte untouched.
pub(crate) fn resize_page(path: &Path, target: PageRect) -> Result<bool> {
    let source = open_unit(path)?;
    let Some(decision) = fit_decision(&source, target)? else {
        return Ok(false);
    };

    executor::rewrite_unit(path, &source, &decision)?;
    log::debug!(
        "Fitted {} to {}x{} ({})",
        path.display(),
        decision.target.width,
        decision.target.height,
        decision.transform.to_cm()
    );
    Ok(true)
}

/// Result of pairing two pages
pub(crate) struct PairOutcome {
    pub spread: PageUnit,
    /// Normalization steps that failed; the spread was still built
    pub failures: Vec<PageFailure>,
}

/// Build a spread from the units at `left` and `right`.
///
/// `first_index` is the left page's position in the sequence. Steps run in a
/// fixed order: turn left upright, turn right upright, fit right to left,
/// lay out. Normalization happens in memory, so neither input file changes.
/// A failed normalization step is recorded and the pair carries on; failing
/// to read either page or to compose the spread is an error.
pub(crate) fn combine_pair(
    first_index: usize,
    (left, right): (PathBuf, PathBuf),
    direction: TurnDirection,
) -> Result<PairOutcome> {
    let mut failures = Vec::new();
    let mut note = |index: usize, error: SpreadError| {
        log::warn!(
            "combine: page {} not normalized, pairing as is: {}",
            index + 1,
            error
        );
        failures.push(PageFailure {
            index,
            stage: Stage::Combine,
            error,
        });
    };

    let mut left_doc = open_unit(&left)?;
    match redrawn(&left_doc, turn_decision(&left_doc, Orientation::Portrait, direction)) {
        Ok(Some(turned)) => left_doc = turned,
        Ok(None) => {}
        Err(e) => note(first_index, e),
    }
    let left_rect = codec::page_rect(&left_doc)?;

    let mut right_doc = open_unit(&right)?;
    match redrawn(&right_doc, turn_decision(&right_doc, Orientation::Portrait, direction)) {
        Ok(Some(turned)) => right_doc = turned,
        Ok(None) => {}
        Err(e) => note(first_index + 1, e),
    }
    match redrawn(&right_doc, fit_decision(&right_doc, left_rect)) {
        Ok(Some(fitted)) => right_doc = fitted,
        Ok(None) => {}
        Err(e) => note(first_index + 1, e),
    }

    let layout = pair_layout(left_rect);
    let spread = executor::compose_spread(&left_doc, &right_doc, &layout)?;
    log::debug!(
        "Paired pages {} and {} into {}x{}",
        first_index + 1,
        first_index + 2,
        layout.spread.width,
        layout.spread.height
    );

    Ok(PairOutcome { spread, failures })
}

/// The quarter turn giving the page the wanted orientation, if it needs one
fn turn_decision(
    source: &Document,
    wanted: Orientation,
    direction: TurnDirection,
) -> Result<Option<TransformDecision>> {
    let rect = codec::page_rect(source)?;
    Ok(decide_rotation(rect, wanted, direction).map(|turn| rotation_transform(rect, turn)))
}

/// The transform fitting the page into `target`, unless it already matches
fn fit_decision(source: &Document, target: PageRect) -> Result<Option<TransformDecision>> {
    let rect = codec::page_rect(source)?;
    Ok(fit_transform(rect, target))
}

/// Apply `decision` in memory
fn redrawn(
    source: &Document,
    decision: Result<Option<TransformDecision>>,
) -> Result<Option<Document>> {
    decision?
        .map(|decision| executor::redraw(source, &decision))
        .transpose()
}

fn open_unit(path: &Path) -> Result<Document> {
    codec::load_unit(path).map_err(|e| SpreadError::CorruptPage(e.to_string()))
}
