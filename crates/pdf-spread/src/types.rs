use crate::constants::{DEFAULT_CREATOR, DEFAULT_PRODUCER, mm_to_pt};
use crate::geometry::PageRect;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpreadError {
    #[error("Failed to decode document: {0}")]
    Decode(String),
    #[error("Corrupt page: {0}")]
    CorruptPage(String),
    #[error("Failed to embed page: {0}")]
    Embed(String),
    #[error("Failed to merge pages: {0}")]
    Merge(String),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("No pages to build")]
    NoPages,
}

pub type Result<T> = std::result::Result<T, SpreadError>;

/// Page orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// Portrait: height >= width
    #[default]
    Portrait,
    /// Landscape: width >= height
    Landscape,
}

/// Direction of a quarter turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TurnDirection {
    /// Counter-clockwise, +90°
    #[default]
    Left,
    /// Clockwise, -90°
    Right,
}

/// Standard paper sizes
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaperSize {
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    Letter,
    Legal,
    Tabloid,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    /// Get base dimensions (always portrait: width < height for standard sizes)
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PaperSize::A0 => (841.0, 1189.0),
            PaperSize::A1 => (594.0, 841.0),
            PaperSize::A2 => (420.0, 594.0),
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::A6 => (105.0, 148.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
            PaperSize::Tabloid => (279.4, 431.8),
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }

    /// Page rectangle in points
    pub fn to_rect(self) -> PageRect {
        let (w, h) = self.dimensions_mm();
        PageRect::new(mm_to_pt(w), mm_to_pt(h))
    }
}

/// Metadata stamped onto the built document
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DocumentInfo {
    pub author: String,
    pub creator: String,
    pub producer: String,
}

impl Default for DocumentInfo {
    fn default() -> Self {
        Self {
            author: String::new(),
            creator: DEFAULT_CREATOR.to_string(),
            producer: DEFAULT_PRODUCER.to_string(),
        }
    }
}

/// Pipeline stage a page failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Rotate,
    Resize,
    Combine,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Rotate => "rotate",
            Stage::Resize => "resize",
            Stage::Combine => "combine",
        };
        f.write_str(name)
    }
}

/// A page that kept its previous content because a transform failed.
///
/// `index` is the page's position in the sequence the stage ran over.
#[derive(Debug)]
pub struct PageFailure {
    pub index: usize,
    pub stage: Stage,
    pub error: SpreadError,
}

/// Predicted shape of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadStatistics {
    /// Total number of source pages
    pub source_pages: usize,
    /// Output page count
    pub output_pages: usize,
    /// Number of double-wide spreads produced by combine
    pub spreads: usize,
    /// Pages carried through combine without a partner
    pub unpaired_pages: usize,
    /// Size every page is fitted to, if resizing
    pub target_rect: Option<PageRect>,
}
