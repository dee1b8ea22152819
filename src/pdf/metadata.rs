//! PDF page counting

use std::path::Path;
use lopdf::{Document, Object};
use crate::error::{Error, Result};

/// Read the Count field of the root Pages dictionary
fn count_from_catalog(doc: &Document) -> Option<usize> {
    let catalog = doc.catalog().ok()?;
    let pages_id = match catalog.get(b"Pages").ok()? {
        Object::Reference(id) => *id,
        _ => return None,
    };
    let pages = doc.get_dictionary(pages_id).ok()?;

    match pages.get(b"Count").ok()? {
        Object::Integer(n) if *n >= 0 => Some(*n as usize),
        _ => None,
    }
}

/// Load a PDF, mapping any failure to `PdfUnreadable` for `path`
pub(crate) fn load(path: &Path) -> Result<Document> {
    if !path.is_file() {
        return Err(Error::unreadable(path, "file not found"));
    }
    Document::load(path).map_err(|e| Error::unreadable(path, e))
}

/// Number of pages in a loaded document
///
/// Walks the page tree; falls back to the root Count field when the walk
/// finds nothing.
pub fn page_count(doc: &Document) -> usize {
    let walked = doc.get_pages().len();
    if walked > 0 {
        walked
    } else {
        count_from_catalog(doc).unwrap_or(0)
    }
}

/// Count the number of pages in a PDF file
pub fn count_pages(path: &Path) -> Result<usize> {
    let doc = load(path)?;
    Ok(page_count(&doc))
}
