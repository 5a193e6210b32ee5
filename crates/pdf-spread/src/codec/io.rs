//! Unit file I/O

use crate::types::*;
use lopdf::Document;
use std::path::Path;

/// Load a page unit from its backing file
pub fn load_unit(path: impl AsRef<Path>) -> Result<Document> {
    let bytes = std::fs::read(path)?;
    Ok(Document::load_mem(&bytes)?)
}

/// Save a document over `path`.
///
/// The document is written to a sibling temporary file first and renamed
/// into place, so a failed save leaves the previous content intact.
pub fn persist(doc: &mut Document, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    doc.save_to(&mut staged)?;
    staged.persist(path).map_err(|e| SpreadError::Io(e.error))?;
    Ok(())
}

/// Serialize a document to bytes
pub fn persist_to_bytes(doc: &mut Document) -> Result<Vec<u8>> {
    let mut writer = Vec::new();
    doc.save_to(&mut writer)?;
    Ok(writer)
}
