//! Page units: one page of a document, stored in its own scratch file

use crate::codec;
use crate::geometry::PageRect;
use crate::scratch::Scratch;
use crate::types::Result;
use lopdf::Document;
use std::fmt;
use std::path::Path;
use tempfile::TempPath;

/// Exactly one page, backed by a scratch file.
///
/// Dropping a unit deletes its file. Size is read from the file on demand,
/// never cached, because transforms rewrite the file in place.
pub struct PageUnit {
    path: TempPath,
    scratch: &'static Scratch,
}

impl PageUnit {
    /// Store `doc` in a newly allocated scratch file
    pub fn create(doc: &mut Document) -> Result<Self> {
        Self::create_in(Scratch::global(), doc)
    }

    pub fn create_in(scratch: &'static Scratch, doc: &mut Document) -> Result<Self> {
        let unit = Self {
            path: scratch.allocate()?,
            scratch,
        };
        unit.store(doc)?;
        Ok(unit)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the unit's document
    pub fn open(&self) -> Result<Document> {
        codec::load_unit(self.path())
    }

    /// Replace the unit's content
    pub fn store(&self, doc: &mut Document) -> Result<()> {
        codec::persist(doc, self.path())
    }

    /// Current page size
    pub fn rect(&self) -> Result<PageRect> {
        codec::page_rect(&self.open()?)
    }

    /// Raw bytes of the backing file
    pub fn bytes(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.path())?)
    }
}

impl fmt::Debug for PageUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageUnit")
            .field("path", &self.path())
            .finish()
    }
}

impl Drop for PageUnit {
    fn drop(&mut self) {
        self.scratch.release(&self.path);
    }
}
