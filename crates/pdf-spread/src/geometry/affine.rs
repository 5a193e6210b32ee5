//! 2D affine transforms in PDF matrix order

use super::PageRect;

/// An affine transform `[a b c d e f]` as used by the PDF `cm` operator.
///
/// A point maps as `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Uniform scale about the origin
    pub fn scale(s: f32) -> Self {
        Self::new(s, 0.0, 0.0, s, 0.0, 0.0)
    }

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Rotation about a pivot given the sine and cosine of the angle.
    ///
    /// Callers pass exact values for quarter turns so that no
    /// `cos(90°)` residue leaks into the matrix.
    pub fn rotate_about(sin: f32, cos: f32, px: f32, py: f32) -> Self {
        Self::new(
            cos,
            sin,
            -sin,
            cos,
            px - cos * px + sin * py,
            py - sin * px - cos * py,
        )
    }

    /// `self` followed by `next`
    pub fn then(self, next: Affine) -> Self {
        Self::new(
            self.a * next.a + self.b * next.c,
            self.a * next.b + self.b * next.d,
            self.c * next.a + self.d * next.c,
            self.c * next.b + self.d * next.d,
            self.e * next.a + self.f * next.c + next.e,
            self.e * next.b + self.f * next.d + next.f,
        )
    }

    pub fn apply(self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn is_identity(self) -> bool {
        self == Self::IDENTITY
    }

    /// The four corners of `rect` (origin at 0,0) after the transform
    pub fn map_corners(self, rect: PageRect) -> [(f32, f32); 4] {
        [
            self.apply(0.0, 0.0),
            self.apply(rect.width, 0.0),
            self.apply(0.0, rect.height),
            self.apply(rect.width, rect.height),
        ]
    }

    /// Matrix as a six-element array
    pub fn to_array(self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Content stream operands for `cm`, e.g. `"0 1 -1 0 600 0 cm"`
    pub fn to_cm(self) -> String {
        let [a, b, c, d, e, f] = self.to_array().map(normalize_zero);
        format!("{} {} {} {} {} {} cm", a, b, c, d, e, f)
    }
}

/// `-0` prints as "-0", which is valid PDF but noisy
fn normalize_zero(v: f32) -> f32 {
    if v == 0.0 { 0.0 } else { v }
}
