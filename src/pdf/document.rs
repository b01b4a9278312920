//! Loading, saving and inspecting PDF documents
//!
//! Thin helpers over lopdf shared by every operation: decode from bytes,
//! encode to bytes, page geometry and page tree attribute inheritance.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};
use crate::layout::PageGeometry;

/// Page attributes a page may inherit from its ancestors in the page tree
pub const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Maximum page tree depth followed when looking up inherited attributes
const MAX_TREE_DEPTH: usize = 32;

/// US Letter, used when a page tree carries no MediaBox at all
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Decode a PDF from memory
pub fn load(bytes: &[u8]) -> Result<Document> {
    Ok(Document::load_mem(bytes)?)
}

/// Decode a PDF from a file
pub fn load_path(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    Ok(Document::load(path)?)
}

/// Serialize a document to bytes
pub fn to_bytes(doc: &mut Document) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

/// Number of pages reachable through the page tree
pub fn page_count(doc: &Document) -> u32 {
    doc.get_pages().len() as u32
}

/// Page object ids in document order
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Geometry of the first page, used for the whole document
pub fn first_page_geometry(doc: &Document) -> Result<PageGeometry> {
    let first = page_ids(doc).into_iter().next().ok_or(Error::EmptyDocument)?;
    Ok(PageGeometry::from_media_box(media_box(doc, first)))
}

/// MediaBox of a page, following inheritance; Letter when absent
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let array = match inherited_attribute(doc, page_id, b"MediaBox") {
        Some(Object::Array(array)) => array,
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(array)) => array.clone(),
            _ => return DEFAULT_MEDIA_BOX,
        },
        _ => return DEFAULT_MEDIA_BOX,
    };

    let values: Vec<f32> = array
        .iter()
        .filter_map(|o| match o {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        })
        .collect();

    if values.len() == 4 {
        [values[0], values[1], values[2], values[3]]
    } else {
        DEFAULT_MEDIA_BOX
    }
}

/// Look up `key` on a page, walking up the page tree until found
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node_id = page_id;

    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_object(node_id).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        node_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }

    None
}

/// Copy inherited attributes onto the page itself
///
/// Needed before a page is moved under a new Pages node, otherwise it would
/// lose the MediaBox or Resources it inherited from its old ancestors.
pub fn materialize_inherited_attributes(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited = Vec::new();
    for key in INHERITABLE_ATTRIBUTES {
        if let Some(value) = inherited_attribute(doc, page_id, key) {
            inherited.push((key, value));
        }
    }

    if let Object::Dictionary(ref mut page_dict) = doc.get_object_mut(page_id)? {
        for (key, value) in inherited {
            if !page_dict.has(key) {
                page_dict.set(key.to_vec(), value);
            }
        }
    }

    Ok(())
}

/// Resolve an object to a dictionary, following one level of reference
pub fn resolve_dict(doc: &Document, object: &Object) -> Option<Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Dictionary(dict)) => Some(dict.clone()),
            _ => None,
        },
        _ => None,
    }
}
