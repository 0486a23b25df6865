//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document.

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use super::{inline_inherited_attributes, pages_root_id, save_document};
use crate::error::{ToolError, ToolResult};

/// Merge multiple PDFs into one, keeping upload order
///
/// The algorithm:
/// 1. If empty, return error
/// 2. If single document, return it as-is
/// 3. Inline inherited page attributes so pages can be re-parented
/// 4. For each further document, offset its object IDs past the destination's
///    and import every object
/// 5. Point a single page tree at all pages, prune orphans, compress
pub fn merge_documents(documents: Vec<Vec<u8>>) -> ToolResult<Vec<u8>> {
    if documents.is_empty() {
        return Err(ToolError::InvalidInput("No documents to merge".into()));
    }

    if documents.len() == 1 {
        return Ok(documents.into_iter().next().unwrap_or_default());
    }

    let mut loaded = Vec::with_capacity(documents.len());
    for (i, bytes) in documents.iter().enumerate() {
        let mut doc = Document::load_mem(bytes).map_err(|e| {
            ToolError::ParseError(format!("document {} could not be read ({})", i + 1, e))
        })?;
        inline_inherited_attributes(&mut doc);
        loaded.push(doc);
    }

    let mut dest = loaded.remove(0);
    let mut dest_max_id = dest.max_id;
    let mut page_refs = page_references(&dest);

    for source in loaded {
        let source_pages = page_references(&source);
        let id_offset = dest_max_id;

        for (old_id, object) in source.objects {
            let new_id = (old_id.0 + id_offset, old_id.1);
            dest.objects.insert(new_id, remap_object_refs(object, id_offset));
        }

        page_refs.extend(
            source_pages
                .into_iter()
                .map(|page_ref| (page_ref.0 + id_offset, page_ref.1)),
        );

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
    }

    dest.max_id = dest_max_id;
    update_page_tree(&mut dest, &page_refs)?;

    debug!(pages = page_refs.len(), "Merged page tree rebuilt");

    dest.prune_objects();
    dest.compress();
    save_document(&mut dest)
}

fn page_references(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Recursively shift every object reference by `offset`
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(items) => Object::Array(
            items
                .into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            remap_dict_refs(&mut dict, offset);
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            remap_dict_refs(&mut stream.dict, offset);
            Object::Stream(stream)
        }
        other => other,
    }
}

fn remap_dict_refs(dict: &mut Dictionary, offset: u32) {
    for (_, value) in dict.iter_mut() {
        let taken = std::mem::replace(value, Object::Null);
        *value = remap_object_refs(taken, offset);
    }
}

/// Make the destination's root `Pages` node the sole parent of `page_refs`
fn update_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> ToolResult<()> {
    let pages_id = pages_root_id(doc)?;

    for &page_id in page_refs {
        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    let pages_dict = doc
        .get_object_mut(pages_id)
        .and_then(Object::as_dict_mut)
        .map_err(|_| ToolError::OperationError("Invalid pages dictionary".into()))?;

    let kids = page_refs
        .iter()
        .map(|&id| Object::Reference(id))
        .collect::<Vec<_>>();
    pages_dict.set("Kids", Object::Array(kids));
    pages_dict.set("Count", Object::Integer(page_refs.len() as i64));

    Ok(())
}
