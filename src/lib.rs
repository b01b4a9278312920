//! Docsuite Library
//!
//! Document conversion service: merge, split, compress and watermark PDFs,
//! and convert between Word and PDF.
//! This library provides functionality to:
//! - Parse page range expressions for split (`range`)
//! - Build and stamp text/image watermarks (`pdf::watermark`, `pdf::stamp`)
//! - Merge, split, compress and inspect PDFs (`pdf`)
//! - Convert office documents through LibreOffice (`convert`)
//! - Serve all of the above over HTTP (`server`)
//!
//! # Example
//!
//! ```no_run
//! use docsuite::pdf::{split_pdf, SplitOptions};
//!
//! let input = std::fs::read("report.pdf").expect("Failed to read PDF");
//! let output = split_pdf(&input, "1-3,7", SplitOptions::default()).expect("Failed to split");
//! std::fs::write("selection.pdf", output.bytes).expect("Failed to write PDF");
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod layout;
pub mod pdf;
pub mod range;
pub mod server;
pub mod storage;

// Re-export commonly used items
pub use config::AppConfig;
pub use error::{Error, Result};
