//! Multipart form collection
//!
//! Handlers read the whole form up front, then pick the fields they need.
//! A file input the browser left unfilled arrives as a part with an empty
//! filename and no bytes; those parts are dropped here.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::Error;
use crate::server::error::ServerError;

/// One uploaded file
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Case-insensitive check of the filename's extension
    pub fn has_extension(&self, extension: &str) -> bool {
        self.filename
            .to_ascii_lowercase()
            .ends_with(&format!(".{}", extension.to_ascii_lowercase()))
    }

    /// Fail with `UnsupportedFileType` unless the filename ends in `.{extension}`
    pub fn require_extension(&self, extension: &'static str, expected: &'static str) -> Result<(), Error> {
        if self.has_extension(extension) {
            Ok(())
        } else {
            Err(Error::UnsupportedFileType { expected })
        }
    }
}

/// Fields of a multipart request
#[derive(Debug, Default)]
pub struct Form {
    files: Vec<(String, Upload)>,
    text: HashMap<String, String>,
}

impl Form {
    /// Drain a multipart stream
    pub async fn read(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut form = Form::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();

            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await?.to_vec();
                    form.push_file(name, Upload { filename, content_type, bytes });
                }
                None => {
                    let value = field.text().await?;
                    form.text.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    fn push_file(&mut self, name: String, upload: Upload) {
        if upload.filename.is_empty() && upload.bytes.is_empty() {
            return;
        }
        self.files.push((name, upload));
    }

    /// Take the first upload named `name`
    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        let index = self.files.iter().position(|(n, _)| n == name)?;
        Some(self.files.remove(index).1)
    }

    /// Take the upload named `name`, failing when absent
    pub fn require_file(&mut self, name: &str) -> Result<Upload, ServerError> {
        self.take_file(name)
            .ok_or_else(|| ServerError::InvalidRequest(format!("Missing file field '{}'", name)))
    }

    /// Uploads named `{prefix}1`, `{prefix}2`, ... ordered by number,
    /// followed by any named `{prefix}s` in arrival order
    pub fn take_numbered_files(&mut self, prefix: &str) -> Vec<Upload> {
        let plural = format!("{}s", prefix);
        let mut numbered: Vec<(u32, Upload)> = Vec::new();
        let mut listed: Vec<Upload> = Vec::new();

        for (name, upload) in std::mem::take(&mut self.files) {
            if name == plural {
                listed.push(upload);
            } else if let Some(n) = name.strip_prefix(prefix).and_then(|rest| rest.parse().ok()) {
                numbered.push((n, upload));
            } else {
                self.files.push((name, upload));
            }
        }

        numbered.sort_by_key(|(n, _)| *n);
        numbered.into_iter().map(|(_, upload)| upload).chain(listed).collect()
    }

    /// Text field value, if present
    pub fn text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }

    /// Text field value, failing when absent
    pub fn require_text(&self, name: &str) -> Result<&str, ServerError> {
        self.text(name)
            .ok_or_else(|| ServerError::InvalidRequest(format!("Missing form field '{}'", name)))
    }
}
