use actix_multipart::Multipart;
use actix_web::HttpResponse;
use futures_util::StreamExt;
use sanitize_filename::sanitize;
use std::path::Path;

use crate::ErrorResponse;

/// Spreadsheet extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: [&str; 6] = ["csv", "xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum MultipartParseError {
    #[error("Multipart field error: {0}")]
    FieldError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("No file was uploaded")]
    MissingFile,
    #[error("Invalid file type. Please upload one of: {}", ALLOWED_EXTENSIONS.join(", "))]
    UnsupportedFile(String),
}

impl From<MultipartParseError> for HttpResponse {
    fn from(error: MultipartParseError) -> Self {
        match error {
            MultipartParseError::IoError(_) => HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&error.to_string())),
            _ => HttpResponse::BadRequest().json(ErrorResponse::bad_request(&error.to_string())),
        }
    }
}

pub fn is_allowed_file(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| ALLOWED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub struct MultipartParser;

impl MultipartParser {
    /// Read the `file` field; other fields are ignored.
    pub async fn parse_upload(mut multipart: Multipart) -> Result<UploadedFile, MultipartParseError> {
        let mut upload: Option<UploadedFile> = None;

        while let Some(item) = multipart.next().await {
            let mut field = item.map_err(|e| MultipartParseError::FieldError(e.to_string()))?;
            let content_disposition = field.content_disposition().ok_or_else(|| {
                MultipartParseError::FieldError("Content disposition not found".to_string())
            })?;
            let name = content_disposition
                .get_name()
                .ok_or_else(|| MultipartParseError::FieldError("Field name not found".to_string()))?;
            if name != "file" {
                continue;
            }

            let filename = content_disposition
                .get_filename()
                .map(sanitize)
                .filter(|f| !f.is_empty())
                .ok_or(MultipartParseError::MissingFile)?;
            if !is_allowed_file(&filename) {
                return Err(MultipartParseError::UnsupportedFile(filename));
            }

            let mut data = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk.map_err(|e| MultipartParseError::IoError(e.to_string()))?;
                data.extend_from_slice(&chunk);
            }
            upload = Some(UploadedFile { filename, data });
        }

        upload.ok_or(MultipartParseError::MissingFile)
    }
}
