//! Route handlers
//!
//! Every document operation runs on the blocking pool; handlers only parse
//! the form, hand the bytes over and shape the response.

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::convert::{self, TargetFormat};
use crate::error::Error;
use crate::pdf::{self, CompressionLevel, ImageWatermark, WatermarkSpec};
use crate::server::error::ServerError;
use crate::server::form::Form;
use crate::server::AppState;
use crate::storage::Workspace;

const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Run a document operation off the async runtime
async fn blocking<T, F>(operation: F) -> Result<T, ServerError>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(operation).await??)
}

/// Binary download response
fn file_response(bytes: Vec<u8>, media_type: &'static str, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, media_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "docsuite",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: POST /merge
pub async fn merge(multipart: Multipart) -> Result<Response, ServerError> {
    let mut form = Form::read(multipart).await?;
    let uploads = form.take_numbered_files("file");

    if uploads.len() < 2 {
        return Err(Error::TooFewInputs { required: 2, given: uploads.len() }.into());
    }

    let count = uploads.len();
    let merged = blocking(move || {
        let inputs: Vec<&[u8]> = uploads.iter().map(|u| u.bytes.as_slice()).collect();
        pdf::merge_bytes(&inputs)
    })
    .await?;

    info!(files = count, bytes = merged.len(), "merged PDFs");
    Ok(file_response(merged, PDF_MEDIA_TYPE, "merged.pdf"))
}

/// Handler: POST /split
pub async fn split(State(state): State<AppState>, multipart: Multipart) -> Result<Response, ServerError> {
    let mut form = Form::read(multipart).await?;
    let upload = form.require_file("file")?;
    let expression = form.require_text("pages")?.to_string();
    let options = state.config.split.options();

    let output = blocking(move || pdf::split_pdf(&upload.bytes, &expression, options)).await?;

    info!(pages = ?output.pages, "split PDF");
    Ok(file_response(output.bytes, PDF_MEDIA_TYPE, "split.pdf"))
}

/// Handler: POST /watermark
pub async fn watermark(State(state): State<AppState>, multipart: Multipart) -> Result<Response, ServerError> {
    let mut form = Form::read(multipart).await?;
    let upload = form.require_file("file")?;

    let image = form.take_file("image").map(|image| ImageWatermark {
        bytes: image.bytes,
        content_type: image.content_type,
    });
    let spec = WatermarkSpec::from_parts(form.text("text").map(str::to_string), image);
    let style = state.config.watermark;

    let output = blocking(move || pdf::watermark_pdf(&upload.bytes, &spec, &style)).await?;

    info!(bytes = output.len(), "watermarked PDF");
    Ok(file_response(output, PDF_MEDIA_TYPE, "watermarked.pdf"))
}

/// Compression result
#[derive(Serialize)]
pub struct CompressResponse {
    pub success: bool,
    pub original_size: usize,
    pub compressed_size: usize,
    pub download_url: String,
}

/// Handler: POST /compress
pub async fn compress(State(state): State<AppState>, multipart: Multipart) -> Result<Json<CompressResponse>, ServerError> {
    let mut form = Form::read(multipart).await?;
    let upload = form.require_file("file")?;
    upload.require_extension("pdf", ".pdf")?;

    let level = match form.text("level") {
        Some(value) => value
            .parse::<CompressionLevel>()
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?,
        None => CompressionLevel::default(),
    };

    let store = state.store.clone();
    let (output, id) = blocking(move || {
        let output = pdf::compress_pdf(&upload.bytes, level)?;
        let id = store.put(&output.bytes, "pdf")?;
        Ok((output, id))
    })
    .await?;

    info!(%level, original = output.original_size, compressed = output.compressed_size, %id, "compressed PDF");

    Ok(Json(CompressResponse {
        success: true,
        original_size: output.original_size,
        compressed_size: output.compressed_size,
        download_url: format!("/download/{}", id),
    }))
}

/// Handler: GET /download/:id
pub async fn download(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ServerError> {
    let store = state.store.clone();
    let bytes = blocking(move || store.get(&id)).await?;
    Ok(file_response(bytes, PDF_MEDIA_TYPE, "compressed.pdf"))
}

/// Handler: POST /word-to-pdf
pub async fn word_to_pdf(State(state): State<AppState>, multipart: Multipart) -> Result<Response, ServerError> {
    convert_upload(state, multipart, TargetFormat::Pdf).await
}

/// Handler: POST /pdf-to-word
pub async fn pdf_to_word(State(state): State<AppState>, multipart: Multipart) -> Result<Response, ServerError> {
    convert_upload(state, multipart, TargetFormat::Docx).await
}

async fn convert_upload(state: AppState, multipart: Multipart, target: TargetFormat) -> Result<Response, ServerError> {
    let mut form = Form::read(multipart).await?;
    let upload = form.require_file("file")?;

    let expected = match target {
        TargetFormat::Pdf => ".docx",
        TargetFormat::Docx => ".pdf",
    };
    upload.require_extension(target.source_extension(), expected)?;

    let converter = state.converter.clone();
    let temp_dir = state.config.storage.temp_dir.clone();

    let output = blocking(move || {
        let workspace = Workspace::new(temp_dir.as_deref())?;
        convert::convert_bytes(converter.as_ref(), &workspace, &upload.bytes, target)
    })
    .await?;

    info!(target = target.extension(), bytes = output.len(), "converted document");
    let filename = format!("converted.{}", target.extension());
    Ok(file_response(output, target.media_type(), &filename))
}
