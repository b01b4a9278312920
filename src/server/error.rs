//! Error responses for the HTTP server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::error::Error;
use crate::range::RangeError;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failure from a document operation
    #[error(transparent)]
    Core(#[from] Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl ServerError {
    /// HTTP status and machine readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::Core(err) => match err {
                Error::Range(RangeError::MalformedRange { .. }) => {
                    (StatusCode::BAD_REQUEST, "MALFORMED_RANGE")
                }
                Error::Range(RangeError::OutOfBounds { .. }) => {
                    (StatusCode::BAD_REQUEST, "PAGE_OUT_OF_BOUNDS")
                }
                Error::Range(RangeError::EmptySelection) => {
                    (StatusCode::BAD_REQUEST, "EMPTY_SELECTION")
                }
                Error::EmptyWatermark => (StatusCode::BAD_REQUEST, "EMPTY_WATERMARK"),
                Error::InvalidImage(_) => (StatusCode::BAD_REQUEST, "INVALID_IMAGE"),
                Error::TooFewInputs { .. } => (StatusCode::BAD_REQUEST, "TOO_FEW_INPUTS"),
                Error::UnsupportedFileType { .. } => {
                    (StatusCode::BAD_REQUEST, "UNSUPPORTED_FILE_TYPE")
                }
                Error::Pdf(_) | Error::MalformedPdf(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_PDF")
                }
                Error::EmptyDocument => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_DOCUMENT"),
                Error::ArtifactNotFound(_) | Error::FileNotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND")
                }
                Error::Conversion(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONVERSION_FAILED"),
                Error::Io(_) | Error::Config(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
            ServerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            error!(%code, error = %self, "request failed");
        }

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<MultipartError> for ServerError {
    fn from(err: MultipartError) -> Self {
        ServerError::InvalidRequest(format!("Failed to read multipart field: {}", err))
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("worker task failed: {}", err))
    }
}
