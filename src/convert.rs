//! Word <-> PDF conversion through an external office suite

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::storage::Workspace;

/// Output format of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    /// `.docx` to `.pdf`
    Pdf,
    /// `.pdf` to `.docx`
    Docx,
}

impl TargetFormat {
    /// Extension of the produced file
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Pdf => "pdf",
            TargetFormat::Docx => "docx",
        }
    }

    /// Extension the input must have
    pub fn source_extension(&self) -> &'static str {
        match self {
            TargetFormat::Pdf => "docx",
            TargetFormat::Docx => "pdf",
        }
    }

    /// Target implied by an input file's extension
    pub fn for_input(path: &Path) -> Option<TargetFormat> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "docx" => Some(TargetFormat::Pdf),
            "pdf" => Some(TargetFormat::Docx),
            _ => None,
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            TargetFormat::Pdf => "application/pdf",
            TargetFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

/// Converts a document on disk into `target`, writing into `out_dir`
pub trait OfficeConverter: Send + Sync {
    /// Returns the path of the converted file
    fn convert(&self, input: &Path, target: TargetFormat, out_dir: &Path) -> Result<PathBuf>;
}

/// LibreOffice in headless mode
///
/// Every run gets its own user profile next to its output directory.
/// LibreOffice locks the profile it starts with, so runs sharing the default
/// one fail or silently produce nothing when they overlap.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: PathBuf,
}

impl SofficeConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    /// Profile directory used for a conversion writing into `out_dir`
    pub fn profile_dir(out_dir: &Path) -> PathBuf {
        out_dir.join(".profile")
    }

    /// Command line arguments for one conversion
    pub fn args(input: &Path, target: TargetFormat, out_dir: &Path) -> Vec<OsString> {
        let mut installation = OsString::from("-env:UserInstallation=file://");
        installation.push(Self::profile_dir(out_dir).as_os_str());

        let mut args: Vec<OsString> = vec![installation, "--headless".into()];

        match target {
            TargetFormat::Pdf => {
                args.push("--convert-to".into());
                args.push("pdf".into());
            }
            TargetFormat::Docx => {
                // PDFs open in Draw unless Writer's import filter is forced
                args.push("--infilter=writer_pdf_import".into());
                args.push("--convert-to".into());
                args.push("docx:MS Word 2007 XML".into());
            }
        }

        args.push("--outdir".into());
        args.push(out_dir.as_os_str().to_owned());
        args.push(input.as_os_str().to_owned());
        args
    }
}

impl Default for SofficeConverter {
    fn default() -> Self {
        Self::new("soffice")
    }
}

impl OfficeConverter for SofficeConverter {
    fn convert(&self, input: &Path, target: TargetFormat, out_dir: &Path) -> Result<PathBuf> {
        // The profile URL must be absolute
        let out_dir = &std::path::absolute(out_dir)?;
        let args = Self::args(input, target, out_dir);
        debug!(program = %self.program.display(), ?args, "running office converter");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| Error::Conversion(format!("failed to run {}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, %stderr, "office converter failed");
            return Err(Error::Conversion(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let stem = input
            .file_stem()
            .ok_or_else(|| Error::Conversion(format!("input has no file name: {}", input.display())))?;
        let produced = out_dir.join(stem).with_extension(target.extension());

        if !produced.is_file() {
            return Err(Error::Conversion(format!(
                "converter produced no {} output",
                target.extension()
            )));
        }

        Ok(produced)
    }
}

/// Convert in-memory bytes inside `workspace`, returning the output bytes
pub fn convert_bytes(
    converter: &dyn OfficeConverter,
    workspace: &Workspace,
    input: &[u8],
    target: TargetFormat,
) -> Result<Vec<u8>> {
    let input_path = workspace.write(input, target.source_extension())?;

    let out_dir = workspace.path().join("out");
    fs::create_dir_all(&out_dir)?;

    let produced = converter.convert(&input_path, target, &out_dir)?;
    Ok(fs::read(produced)?)
}
