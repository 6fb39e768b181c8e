//! Axum extractor for validated CSV uploads

use crate::error::ChemvizError;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, FromRequest, Multipart},
    http::Request,
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Name of the multipart field holding the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

/// Extension uploaded files must have.
const CSV_EXTENSION: &str = ".csv";

/// Metadata of an uploaded file.
#[derive(Debug, Deserialize, PartialEq, Serialize, Validate)]
pub struct UploadMeta {
    /// Name of the uploaded file
    #[validate(
        length(min = 1, max = 255),
        custom = "validate_csv_extension"
    )]
    pub filename: String,
    /// Size of the uploaded file in bytes
    pub file_size: usize,
}

/// Validate that a filename has a CSV extension, ignoring case.
fn validate_csv_extension(filename: &str) -> Result<(), ValidationError> {
    if !filename.to_ascii_lowercase().ends_with(CSV_EXTENSION) {
        return Err(ValidationError::new("File must have a .csv extension"));
    }
    Ok(())
}

/// A CSV file uploaded as the `file` field of a multipart form.
///
/// Other fields are ignored. The request body size limit is applied by the router.
#[derive(Debug)]
pub struct CsvUpload {
    pub meta: UploadMeta,
    pub data: Bytes,
}

#[async_trait]
impl<S, B> FromRequest<S, B> for CsvUpload
where
    S: Send + Sync,
    Multipart: FromRequest<S, B, Rejection = MultipartRejection>,
    B: Send + 'static,
{
    type Rejection = ChemvizError;

    /// Extract a `CsvUpload` from a `Request`.
    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state).await?;
        while let Some(field) = multipart.next_field().await? {
            if field.name() != Some(UPLOAD_FIELD) {
                continue;
            }
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await?;
            let meta = UploadMeta {
                filename,
                file_size: data.len(),
            };
            meta.validate()?;
            return Ok(CsvUpload { meta, data });
        }
        Err(ChemvizError::MissingUploadFile)
    }
}
