pub mod codec;
pub mod constants;
pub mod executor;
pub mod geometry;
mod options;
mod pipeline;
pub mod scratch;
mod stats;
mod types;
mod unit;

pub use geometry::{Affine, PageRect, SpreadLayout, TransformDecision};
pub use options::*;
pub use pipeline::{CombineError, Pipeline};
pub use scratch::{Scratch, ScratchGuard};
pub use stats::calculate_statistics;
pub use types::*;
pub use unit::PageUnit;
