//! Error handling.
//!
//! Errors fall into three groups:
//!
//! * [IngestError]: the upload cannot be turned into a dataset. This aborts the analysis.
//! * [InsufficientDataError]: one section of the analysis cannot be computed. The pipeline
//!   records the reason in that section and carries on.
//! * [ChemvizError]: errors surfaced by the API, each mapped to an HTTP error response.
//!
//! Non-fatal numeric edge cases are not errors at all; they are recorded as
//! [ComputationWarning](crate::models::ComputationWarning)s inside the affected section.

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tracing::{event, Level};

/// Reasons an upload cannot be ingested.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The upload contains no data at all
    #[error("file is empty")]
    EmptyFile,

    /// The header row lacks one of the required columns
    #[error("missing required column: {column}")]
    MissingColumn { column: String },

    /// The upload could not be parsed as CSV
    #[error("file is not valid CSV")]
    Malformed(#[from] csv::Error),

    /// Every row was dropped during cleaning
    #[error("no rows remain after cleaning")]
    NoRowsRemaining,
}

/// Reasons a single analysis section cannot be computed.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InsufficientDataError {
    /// Not enough rows for the section
    #[error("{section} requires at least {required} rows, got {rows}")]
    TooFewRows {
        section: &'static str,
        rows: usize,
        required: usize,
    },

    /// Quantiles could not be computed for a set of values
    #[error("cannot compute quantiles of {subject}")]
    Quantile { subject: String },
}

/// Chemviz server error type
///
/// This type encapsulates the various errors that may occur while serving a request.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum ChemvizError {
    /// The upload could not be ingested
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// The request is not a valid multipart upload
    #[error("upload is not a valid multipart request")]
    UploadRejection(#[from] MultipartRejection),

    /// Error reading a multipart field
    #[error("failed to read uploaded file")]
    UploadMultipart(#[from] MultipartError),

    /// The multipart request has no file field
    #[error("no file provided")]
    MissingUploadFile,

    /// Error validating the uploaded file's metadata
    #[error("uploaded file is not valid")]
    UploadValidation(#[from] validator::ValidationErrors),

    /// The dataset does not exist or belongs to another user
    #[error("dataset {id} not found")]
    DatasetNotFound { id: u64 },

    /// Error accessing the dataset store
    #[error("error accessing dataset store")]
    Storage(#[from] sled::Error),

    /// Error (de)serialising a stored dataset
    #[error("failed to (de)serialise stored dataset")]
    Serialization(#[from] serde_json::Error),

    /// Report fonts were not loaded at start-up
    #[error("report fonts are not available")]
    ReportFontsUnavailable,

    /// Error laying out or writing the PDF report
    #[error("failed to render PDF report: {message}")]
    ReportRendering { message: String },
}

impl From<genpdf::error::Error> for ChemvizError {
    fn from(error: genpdf::error::Error) -> Self {
        ChemvizError::ReportRendering {
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ChemvizError {
    /// Convert from a `ChemvizError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut caused_by = None;
        let mut current = error.source();
        while let Some(source) = current {
            let mut causes: Vec<String> = caused_by.unwrap_or_default();
            causes.push(source.to_string());
            caused_by = Some(causes);
            current = source.source();
        }
        // Remove duplicate entries.
        if let Some(caused_by) = caused_by.as_mut() {
            caused_by.dedup()
        }
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 404 not found ErrorResponse
    fn not_found<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<ChemvizError> for ErrorResponse {
    /// Convert from a `ChemvizError` into an `ErrorResponse`.
    fn from(error: ChemvizError) -> Self {
        let response = match &error {
            // Bad request
            ChemvizError::Ingest(_)
            | ChemvizError::UploadRejection(_)
            | ChemvizError::UploadMultipart(_)
            | ChemvizError::MissingUploadFile
            | ChemvizError::UploadValidation(_) => Self::bad_request(&error),

            // Not found
            ChemvizError::DatasetNotFound { id: _ } => Self::not_found(&error),

            // Internal server error
            ChemvizError::Storage(_)
            | ChemvizError::Serialization(_)
            | ChemvizError::ReportFontsUnavailable
            | ChemvizError::ReportRendering { message: _ } => Self::internal_server_error(&error),
        };

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
