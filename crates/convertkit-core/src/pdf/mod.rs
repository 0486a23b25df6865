//! PDF operations built on lopdf, qpdf and the rasterization backends

pub mod build;
pub mod compress;
pub mod merge;
pub mod pages;
pub mod raster;
pub mod security;
pub mod watermark;

use lopdf::{Document, Object, ObjectId};

use crate::error::{ToolError, ToolResult};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against malformed page trees with cyclic `Parent` links
const MAX_TREE_DEPTH: usize = 64;

/// US Letter in points, used when a page carries no `MediaBox`
pub const LETTER_SIZE_PT: (f32, f32) = (612.0, 792.0);

pub(crate) fn load_document(bytes: &[u8]) -> ToolResult<Document> {
    Document::load_mem(bytes).map_err(|e| ToolError::ParseError(e.to_string()))
}

pub(crate) fn save_document(doc: &mut Document) -> ToolResult<Vec<u8>> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ToolError::OperationError(format!("Failed to save PDF: {}", e)))?;
    Ok(buffer)
}

/// Object ID of the root `Pages` node
pub(crate) fn pages_root_id(doc: &Document) -> ToolResult<ObjectId> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| ToolError::OperationError("No Root in trailer".into()))?;

    doc.get_dictionary(catalog_id)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| ToolError::OperationError("No Pages in catalog".into()))
}

/// Copy inherited attributes down onto every page
///
/// After this, each page is self-contained and can be re-parented or edited
/// without consulting the rest of the tree.
pub(crate) fn inline_inherited_attributes(doc: &mut Document) {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in page_ids {
        let inherited = collect_inherited(doc, page_id);
        if inherited.is_empty() {
            continue;
        }
        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            for (key, value) in inherited {
                page.set(key, value);
            }
        }
    }
}

fn collect_inherited(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, Object)> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };

    let mut missing: Vec<&[u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();
    let mut found = Vec::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(node_id) = parent {
        if missing.is_empty() || depth >= MAX_TREE_DEPTH {
            break;
        }
        depth += 1;

        let Ok(node) = doc.get_dictionary(node_id) else {
            break;
        };
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                found.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    found
}

/// Page `MediaBox` as `(llx, lly, urx, ury)`, falling back to Letter
pub(crate) fn page_media_box(doc: &Document, page_id: ObjectId) -> (f32, f32, f32, f32) {
    let letter = (0.0, 0.0, LETTER_SIZE_PT.0, LETTER_SIZE_PT.1);
    let media_box = doc
        .get_dictionary(page_id)
        .and_then(|page| page.get(b"MediaBox"))
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_object(*id),
            other => Ok(other),
        })
        .and_then(Object::as_array);

    let Ok(values) = media_box else {
        return letter;
    };
    let numbers: Vec<f32> = values.iter().filter_map(object_as_f32).collect();
    if numbers.len() != 4 {
        return letter;
    }

    let (llx, urx) = (numbers[0].min(numbers[2]), numbers[0].max(numbers[2]));
    let (lly, ury) = (numbers[1].min(numbers[3]), numbers[1].max(numbers[3]));
    if urx - llx < 1.0 || ury - lly < 1.0 {
        letter
    } else {
        (llx, lly, urx, ury)
    }
}

/// Page size in points from the page's `MediaBox`, falling back to Letter
pub(crate) fn page_size_points(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let (llx, lly, urx, ury) = page_media_box(doc, page_id);
    (urx - llx, ury - lly)
}

fn object_as_f32(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_inline_inherited_attributes_copies_resources() {
        let pdf = create_test_pdf(2, "Inherit");
        let mut doc = load_document(&pdf).unwrap();

        inline_inherited_attributes(&mut doc);

        for page_id in doc.get_pages().into_values() {
            let page = doc.get_dictionary(page_id).unwrap();
            assert!(page.has(b"Resources"));
            assert!(page.has(b"MediaBox"));
        }
    }

    #[test]
    fn test_page_size_points_reads_media_box() {
        let pdf = create_sized_pdf(1, "Size", 300, 400);
        let doc = load_document(&pdf).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        assert_eq!(page_size_points(&doc, page_id), (300.0, 400.0));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let result = load_document(b"definitely not a pdf");
        assert!(matches!(result, Err(ToolError::ParseError(_))));
    }

    #[test]
    fn test_pages_root_found() {
        let pdf = create_test_pdf(1, "Root");
        let doc = load_document(&pdf).unwrap();
        assert!(pages_root_id(&doc).is_ok());
    }
}
