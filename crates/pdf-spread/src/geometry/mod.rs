//! Page geometry for normalization
//!
//! Pure calculations, no I/O:
//! - Whether a page needs a quarter turn, and the turn itself
//! - Fitting a page into a target size (letterbox/pillarbox)
//! - Laying two pages side by side as a spread

mod affine;
mod fit;
mod rotation;
mod spread;
mod types;

pub use affine::*;
pub use fit::*;
pub use rotation::*;
pub use spread::*;
pub use types::*;
