//! Quarter-turn decisions

use super::{Affine, PageRect, TransformDecision};
use crate::types::{Orientation, TurnDirection};

/// Decide whether a page must turn to satisfy `wanted`.
///
/// Returns `None` when the page already matches. Portrait accepts
/// `height >= width`, landscape accepts `height <= width`, so a square
/// page never turns. When a turn is needed the caller's `direction` is
/// returned as-is.
pub fn decide_rotation(
    rect: PageRect,
    wanted: Orientation,
    direction: TurnDirection,
) -> Option<TurnDirection> {
    let matches = match wanted {
        Orientation::Portrait => rect.height >= rect.width,
        Orientation::Landscape => rect.height <= rect.width,
    };

    if matches { None } else { Some(direction) }
}

/// Quarter-turn a page.
///
/// The target swaps width and height. A left turn (+90°) pivots about
/// `(h/2, h/2)` and a right turn (-90°) about `(w/2, w/2)`, which lands
/// the rotated content exactly inside the new page with no extra
/// translation.
pub fn rotation_transform(rect: PageRect, direction: TurnDirection) -> TransformDecision {
    let transform = match direction {
        TurnDirection::Left => {
            let pivot = rect.height / 2.0;
            Affine::rotate_about(1.0, 0.0, pivot, pivot)
        }
        TurnDirection::Right => {
            let pivot = rect.width / 2.0;
            Affine::rotate_about(-1.0, 0.0, pivot, pivot)
        }
    };

    TransformDecision {
        target: rect.swapped(),
        transform,
    }
}
