//! PDF merging functionality using lopdf

use std::collections::BTreeMap;
use std::path::PathBuf;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::{Error, Result};
use crate::pdf::document;

/// Options for merging PDF files on disk
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Input PDF file paths in the order they should be merged
    pub input_paths: Vec<PathBuf>,
    /// Output PDF file path
    pub output_path: PathBuf,
}

/// Merge multiple PDF files into a single PDF file
///
/// # Example
///
/// ```no_run
/// use docsuite::pdf::{MergeOptions, merge_pdfs};
/// use std::path::PathBuf;
///
/// let options = MergeOptions {
///     input_paths: vec![
///         PathBuf::from("1. first.pdf"),
///         PathBuf::from("2. second.pdf"),
///     ],
///     output_path: PathBuf::from("merged.pdf"),
/// };
///
/// merge_pdfs(&options).expect("Failed to merge");
/// ```
pub fn merge_pdfs(options: &MergeOptions) -> Result<()> {
    if options.input_paths.is_empty() {
        return Err(Error::TooFewInputs { required: 1, given: 0 });
    }

    let documents = options
        .input_paths
        .iter()
        .map(|path| document::load_path(path))
        .collect::<Result<Vec<_>>>()?;

    let mut merged = merge_documents(documents)?;
    merged.save(&options.output_path)?;

    Ok(())
}

/// Merge PDF byte buffers in order, returning the merged PDF bytes
pub fn merge_bytes(inputs: &[&[u8]]) -> Result<Vec<u8>> {
    let documents = inputs
        .iter()
        .map(|bytes| document::load(bytes))
        .collect::<Result<Vec<_>>>()?;

    let mut merged = merge_documents(documents)?;
    document::to_bytes(&mut merged)
}

/// Append every page of every document, in order, into a new document
///
/// Based on the lopdf merge example:
/// https://github.com/J-F-Liu/lopdf/blob/main/examples/merge.rs
pub fn merge_documents(documents: Vec<Document>) -> Result<Document> {
    if documents.is_empty() {
        return Err(Error::TooFewInputs { required: 1, given: 0 });
    }

    // Define a starting max_id for merged document
    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        // Validate document has pages
        if doc.get_pages().is_empty() {
            return Err(Error::EmptyDocument);
        }

        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(max_id);

        // Update max_id for next document
        max_id = doc.max_id + 1;

        // Pages will be reparented, so pull down what they inherit first
        let pages = document::page_ids(&doc);
        for &page_id in &pages {
            document::materialize_inherited_attributes(&mut doc, page_id)?;
        }
        page_ids.extend(pages);

        // Collect all objects from this document
        objects.extend(doc.objects);
    }

    let mut merged_doc = Document::with_version("1.5");

    // Add all collected objects FIRST
    merged_doc.objects.extend(objects);

    // Update max_id to reflect the highest object ID we just added,
    // otherwise new_object_id() returns IDs that collide with existing objects
    merged_doc.max_id = max_id - 1;

    let pages_id = merged_doc.new_object_id();

    let kids: Vec<Object> = page_ids
        .iter()
        .map(|&id| Object::Reference(id))
        .collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));

    let catalog_id = merged_doc.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    merged_doc.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged_doc.objects.insert(pages_id, Object::Dictionary(pages_object));
    merged_doc.trailer.set("Root", Object::Reference(catalog_id));

    // Update parent references for all pages
    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(ref mut dict)) = merged_doc.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    // Old catalogs and page tree nodes are now unreachable
    let pruned = merged_doc.prune_objects();
    debug!(pages = page_ids.len(), pruned = pruned.len(), "merged documents");

    merged_doc.compress();

    Ok(merged_doc)
}
