//! PDF metadata extraction

use lopdf::{Document, Object};

use crate::error::{Error, Result};
use crate::layout::PageGeometry;
use crate::pdf::document;

/// Count pages by reading the Count field from the Pages dictionary
/// This is more reliable than get_pages() which doesn't handle nested page trees
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let malformed = |what: &str| Error::MalformedPdf(what.to_string());

    // Get the catalog (root)
    let catalog_id = match doc.trailer.get(b"Root") {
        Ok(Object::Reference(id)) => *id,
        _ => return Err(malformed("Root is not a reference")),
    };

    let catalog_dict = match doc.get_object(catalog_id)? {
        Object::Dictionary(dict) => dict,
        _ => return Err(malformed("Catalog is not a dictionary")),
    };

    // Get the Pages reference
    let pages_id = match catalog_dict.get(b"Pages") {
        Ok(Object::Reference(id)) => *id,
        _ => return Err(malformed("Pages is not a reference")),
    };

    let pages_dict = match doc.get_object(pages_id)? {
        Object::Dictionary(dict) => dict,
        _ => return Err(malformed("Pages is not a dictionary")),
    };

    // Get the Count field
    match pages_dict.get(b"Count") {
        Ok(Object::Integer(n)) if *n >= 0 => Ok(*n as usize),
        _ => Err(malformed("Count is not a non-negative integer")),
    }
}

/// PDF metadata
#[derive(Debug, Clone, PartialEq)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Size of the first page
    pub first_page: PageGeometry,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
}

/// Extract metadata from PDF bytes
pub fn extract_metadata(bytes: &[u8]) -> Result<PdfMetadata> {
    let doc = document::load(bytes)?;
    metadata_of(&doc)
}

/// Extract metadata from an already loaded document
pub fn metadata_of(doc: &Document) -> Result<PdfMetadata> {
    // Use catalog-based counting for accuracy
    let page_count = count_pages_from_catalog(doc)?;

    if page_count == 0 {
        return Err(Error::EmptyDocument);
    }

    let first_page = document::first_page_geometry(doc)?;

    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|info| document::resolve_dict(doc, info));

    let text_entry = |key: &[u8]| -> Option<String> {
        let bytes = info.as_ref()?.get(key).ok()?.as_str().ok()?;
        String::from_utf8(bytes.to_vec()).ok()
    };

    Ok(PdfMetadata {
        page_count,
        first_page,
        title: text_entry(b"Title"),
        author: text_entry(b"Author"),
    })
}
