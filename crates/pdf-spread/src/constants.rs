//! Shared constants for page normalization
//!
//! This module centralizes magic numbers and names used throughout
//! the pipeline.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 72.0 / 25.4; // ≈ 2.83465

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

/// Convert points to millimeters
#[inline]
pub fn pt_to_mm(pt: f32) -> f32 {
    pt / POINTS_PER_MM
}

// =============================================================================
// Document Metadata
// =============================================================================

/// Product name written as the default creator and producer
pub const PRODUCT_NAME: &str = "pdf-spread";

pub const DEFAULT_CREATOR: &str = PRODUCT_NAME;

pub const DEFAULT_PRODUCER: &str = PRODUCT_NAME;

// =============================================================================
// Scratch Storage
// =============================================================================

/// Directory under the system temp dir holding page units
pub const SCRATCH_DIR_NAME: &str = "pdf-spread";

pub const UNIT_FILE_PREFIX: &str = "pdf-spread-";

pub const UNIT_FILE_SUFFIX: &str = ".tmp.pdf";

// =============================================================================
// Output
// =============================================================================

/// PDF version of every document the codec creates
pub const PDF_VERSION: &str = "1.7";
