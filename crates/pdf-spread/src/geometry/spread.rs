//! Two-up spread layout

use super::{Affine, PageRect, SpreadLayout};

/// Lay out a spread for a left page of size `left`.
///
/// The right page is expected to already match `left`; it is shifted right
/// by the left page's width.
pub fn pair_layout(left: PageRect) -> SpreadLayout {
    SpreadLayout {
        spread: PageRect::new(left.width * 2.0, left.height),
        left: Affine::IDENTITY,
        right: Affine::translate(left.width, 0.0),
    }
}
