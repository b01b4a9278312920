//! PDF manipulation module

pub mod compress;
pub mod document;
pub mod fonts;
pub mod merge;
pub mod metadata;
pub mod raster;
pub mod split;
pub mod stamp;
pub mod watermark;

// Re-export commonly used items
pub use compress::{compress_pdf, CompressOutput, CompressionLevel};
pub use merge::{merge_bytes, merge_documents, merge_pdfs, MergeOptions};
pub use metadata::{extract_metadata, PdfMetadata};
pub use split::{select_pages, split_pdf, SplitOptions, SplitOutput};
pub use stamp::{apply_overlay, watermark_pdf};
pub use watermark::{build_overlay, ImageWatermark, Overlay, TextWatermark, WatermarkSpec, WatermarkStyle};
