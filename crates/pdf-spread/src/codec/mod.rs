//! Page codec backed by lopdf
//!
//! Everything that touches the PDF object model lives here:
//! - Splitting a document into single-page units
//! - Reading page sizes
//! - Drawing one page into another under a transform
//! - Persisting units and merging them into the output document

mod canvas;
mod io;
mod merge;
mod split;
mod xobject;

pub use canvas::PageCanvas;
pub use io::{load_unit, persist, persist_to_bytes};
pub use merge::merge_all;
pub use split::decode;
pub use xobject::{copy_object_deep, page_rect, page_rotation, single_page_id};
