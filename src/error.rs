//! Error types for the docsuite library

use std::path::PathBuf;
use thiserror::Error;

use crate::range::RangeError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the docsuite library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Page selection could not be resolved
    #[error(transparent)]
    Range(#[from] RangeError),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Document structure is not what the PDF format requires
    #[error("Malformed PDF: {0}")]
    MalformedPdf(String),

    /// Document has no pages to work on
    #[error("PDF has no pages")]
    EmptyDocument,

    /// Watermark request carried neither text nor image
    #[error("Watermark needs text or an image")]
    EmptyWatermark,

    /// Watermark image could not be decoded
    #[error("Invalid watermark image: {0}")]
    InvalidImage(String),

    /// Not enough input documents for the operation
    #[error("Please upload at least {required} PDF files (got {given})")]
    TooFewInputs { required: usize, given: usize },

    /// Upload has the wrong file type for the operation
    #[error("Only {expected} files are supported")]
    UnsupportedFileType { expected: &'static str },

    /// External office converter failed
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Stored artifact does not exist
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),
}
