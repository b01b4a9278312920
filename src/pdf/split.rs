//! Extracting a page selection into a new PDF

use lopdf::Document;
use tracing::debug;

use crate::error::Result;
use crate::pdf::document;
use crate::range::{self, PageIndex, SelectedPageSet};

/// Options for the split operation
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitOptions {
    /// Produce a zero-page document instead of failing when nothing is selected
    pub allow_empty_selection: bool,
}

/// Result of a split
#[derive(Debug, Clone)]
pub struct SplitOutput {
    /// Serialized PDF with only the selected pages
    pub bytes: Vec<u8>,
    /// Source page numbers kept, in output order
    pub pages: Vec<PageIndex>,
}

/// Split a PDF, keeping the pages selected by `expression`
///
/// # Example
///
/// ```no_run
/// use docsuite::pdf::{split_pdf, SplitOptions};
///
/// let input = std::fs::read("report.pdf").unwrap();
/// let output = split_pdf(&input, "1-3,7", SplitOptions::default()).unwrap();
/// assert_eq!(output.pages, vec![1, 2, 3, 7]);
/// ```
pub fn split_pdf(bytes: &[u8], expression: &str, options: SplitOptions) -> Result<SplitOutput> {
    let mut doc = document::load(bytes)?;
    let total_pages = document::page_count(&doc);

    let mut selection = range::resolve(expression, total_pages)?;
    if !options.allow_empty_selection {
        selection = selection.ensure_non_empty()?;
    }

    debug!(%expression, total_pages, selected = selection.len(), "resolved page selection");

    select_pages(&mut doc, &selection);

    Ok(SplitOutput {
        bytes: document::to_bytes(&mut doc)?,
        pages: selection.to_vec(),
    })
}

/// Remove every page not in `selection`, then drop orphaned objects
///
/// Selected pages keep their original relative order, which is ascending
/// document order because the selection is always sorted.
pub fn select_pages(doc: &mut Document, selection: &SelectedPageSet) {
    let total_pages = document::page_count(doc);

    // Delete in reverse so remaining page numbers stay valid
    let pages_to_delete: Vec<u32> = (1..=total_pages)
        .rev()
        .filter(|page| !selection.contains(*page))
        .collect();

    for page_num in pages_to_delete {
        doc.delete_pages(&[page_num]);
    }

    doc.prune_objects();
    doc.compress();
}
