//! Deleting pages

use super::{load_document, save_document};
use crate::error::{ToolError, ToolResult};
use tracing::warn;

/// Remove one page (1-indexed) and return the rewritten document
///
/// A page number outside the document leaves every page in place. Orphaned
/// objects are pruned so the removed page's content does not linger in the
/// output.
pub fn delete_page(bytes: &[u8], page_number: u32) -> ToolResult<Vec<u8>> {
    let mut doc = load_document(bytes)?;
    let page_count = doc.get_pages().len() as u32;

    if page_number == 0 || page_number > page_count {
        warn!(
            page_number,
            page_count, "Page out of range, returning document unchanged"
        );
        return save_document(&mut doc);
    }
    if page_count == 1 {
        return Err(ToolError::InvalidPage(
            "Cannot delete the only page of a document".into(),
        ));
    }

    doc.delete_pages(&[page_number]);
    doc.prune_objects();
    doc.compress();

    save_document(&mut doc)
}
