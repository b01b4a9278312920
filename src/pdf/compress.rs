//! PDF size reduction
//!
//! Uses lopdf to drop unreferenced objects and Flate-compress streams.

use std::fmt;
use std::str::FromStr;

use lopdf::Document;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::pdf::document;

/// How hard to try
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Low,
    #[default]
    Moderate,
    /// Also drops empty streams and renumbers objects densely
    High,
}

impl FromStr for CompressionLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(CompressionLevel::Low),
            "moderate" | "" => Ok(CompressionLevel::Moderate),
            "high" => Ok(CompressionLevel::High),
            other => Err(Error::Config(format!(
                "unknown compression level '{}' (expected low, moderate or high)",
                other
            ))),
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompressionLevel::Low => "low",
            CompressionLevel::Moderate => "moderate",
            CompressionLevel::High => "high",
        };
        f.write_str(name)
    }
}

/// Result of a compression run
#[derive(Debug, Clone)]
pub struct CompressOutput {
    pub bytes: Vec<u8>,
    pub original_size: usize,
    pub compressed_size: usize,
}

/// Compress PDF bytes at the given level
pub fn compress_pdf(bytes: &[u8], level: CompressionLevel) -> Result<CompressOutput> {
    let mut doc = document::load(bytes)?;
    compress_document(&mut doc, level);

    let output = document::to_bytes(&mut doc)?;
    debug!(%level, original = bytes.len(), compressed = output.len(), "compressed document");

    Ok(CompressOutput {
        original_size: bytes.len(),
        compressed_size: output.len(),
        bytes: output,
    })
}

/// Apply the level's size reductions to a loaded document
pub fn compress_document(doc: &mut Document, level: CompressionLevel) {
    doc.prune_objects();

    if level == CompressionLevel::High {
        doc.delete_zero_length_streams();
        doc.renumber_objects();
    }

    doc.compress();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::{page_widths, pdf_with_sizes};
    use lopdf::{Dictionary, Stream};

    /// A small PDF padded with an unreferenced, highly compressible stream
    fn bloated_pdf() -> Vec<u8> {
        let mut doc = document::load(&pdf_with_sizes(&[(612.0, 792.0), (300.0, 400.0)])).unwrap();
        doc.add_object(Stream::new(Dictionary::new(), vec![b'x'; 64 * 1024]));
        document::to_bytes(&mut doc).unwrap()
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("low".parse::<CompressionLevel>().unwrap(), CompressionLevel::Low);
        assert_eq!("HIGH".parse::<CompressionLevel>().unwrap(), CompressionLevel::High);
        assert_eq!("".parse::<CompressionLevel>().unwrap(), CompressionLevel::Moderate);
        assert!(matches!("extreme".parse::<CompressionLevel>(), Err(Error::Config(_))));
        assert_eq!(CompressionLevel::default().to_string(), "moderate");
    }

    #[test]
    fn test_level_serde_names() {
        let json = serde_json::to_string(&CompressionLevel::High).unwrap();
        assert_eq!(json, "\"high\"");
        let parsed: CompressionLevel = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(parsed, CompressionLevel::Low);
    }

    #[test]
    fn test_compress_reports_sizes_and_shrinks() {
        let input = bloated_pdf();
        for level in [CompressionLevel::Low, CompressionLevel::Moderate, CompressionLevel::High] {
            let output = compress_pdf(&input, level).unwrap();
            assert_eq!(output.original_size, input.len());
            assert_eq!(output.compressed_size, output.bytes.len());
            assert!(output.compressed_size < output.original_size, "{} did not shrink", level);

            let doc = document::load(&output.bytes).unwrap();
            assert_eq!(page_widths(&doc), vec![612.0, 300.0]);
        }
    }

    #[test]
    fn test_compress_rejects_garbage() {
        assert!(matches!(
            compress_pdf(b"not a pdf", CompressionLevel::Low),
            Err(Error::Pdf(_))
        ));
    }
}
