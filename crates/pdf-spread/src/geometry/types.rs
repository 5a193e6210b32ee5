//! Geometry data types
//!
//! These types carry decisions from the geometry engine to the
//! transform executor.

use super::Affine;

/// A page size in points
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PageRect {
    pub width: f32,
    pub height: f32,
}

impl PageRect {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width and height exchanged
    pub fn swapped(self) -> Self {
        Self::new(self.height, self.width)
    }

    /// Strictly wider than tall
    pub fn is_landscape(self) -> bool {
        self.width > self.height
    }

    /// Height over width
    pub fn aspect(self) -> f32 {
        self.height / self.width
    }
}

/// Target page size plus the transform that maps source content into it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformDecision {
    pub target: PageRect,
    pub transform: Affine,
}

/// Placement of two pages on one double-wide page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadLayout {
    /// Size of the spread page
    pub spread: PageRect,
    /// Transform for the left page content
    pub left: Affine,
    /// Transform for the right page content
    pub right: Affine,
}
