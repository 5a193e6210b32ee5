//! Fit-to-rectangle scaling
//!
//! Content keeps its aspect ratio. When source and target ratios differ the
//! content is centred, leaving bars left and right (pillarbox) or top and
//! bottom (letterbox).

use super::{Affine, PageRect, TransformDecision};

/// Compute how to fit `source` into `target`.
///
/// Returns `None` when `source == target`: the page is left untouched.
///
/// If the orientations differ, the target is first swapped so that the
/// output page keeps the source's orientation. The returned decision's
/// `target` is that possibly-swapped rectangle.
pub fn fit_transform(source: PageRect, target: PageRect) -> Option<TransformDecision> {
    if source == target {
        return None;
    }

    let target = if source.is_landscape() == target.is_landscape() {
        target
    } else {
        target.swapped()
    };

    let scale_h = target.height / source.height;
    let scale_w = target.width / source.width;
    let old_aspect = source.aspect();
    let new_aspect = target.aspect();

    let transform = if old_aspect == new_aspect {
        Affine::scale(scale_h)
    } else if old_aspect > new_aspect {
        // Relatively taller: full height, centred horizontally
        let tx = (target.width - source.width * scale_h) / 2.0;
        Affine::scale(scale_h).then(Affine::translate(tx, 0.0))
    } else {
        // Relatively wider: full width, centred vertically
        let ty = (target.height - source.height * scale_w) / 2.0;
        Affine::scale(scale_w).then(Affine::translate(0.0, ty))
    };

    Some(TransformDecision { target, transform })
}
