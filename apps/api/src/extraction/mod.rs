//! Content extractor: turns an uploaded résumé into text or a decoded image.
//!
//! Dispatch is on the declared media type only; file contents are never
//! sniffed. Unsupported types yield `Ok(None)` rather than an error.

pub mod bitmap;
pub mod docx;
pub mod pdf;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info};

pub use bitmap::ResumeImage;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Could not read PDF: {0}")]
    Pdf(String),

    #[error("Could not read DOCX: {0}")]
    Docx(String),

    #[error("Could not decode image: {0}")]
    Image(String),

    #[error("Extraction worker failed: {0}")]
    Worker(String),
}

/// Media types the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    Docx,
    Png,
    Jpeg,
}

impl MediaType {
    /// Parses a declared MIME string. Case and parameters (`; charset=...`) are ignored.
    pub fn parse(declared: &str) -> Option<Self> {
        let essence = declared.split(';').next()?.trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(MediaType::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(MediaType::Docx)
            }
            "image/png" => Some(MediaType::Png),
            "image/jpeg" | "image/jpg" => Some(MediaType::Jpeg),
            _ => None,
        }
    }

    /// Infers the media type from a file name's extension.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        mime_guess::from_path(file_name)
            .iter_raw()
            .find_map(MediaType::parse)
    }

    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
        }
    }
}

/// What the extractor produced for one upload.
#[derive(Debug, Clone)]
pub enum ExtractedContent {
    Text(String),
    Image(ResumeImage),
}

impl ExtractedContent {
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractedContent::Text(_) => "text",
            ExtractedContent::Image(_) => "image",
        }
    }
}

/// Extracts content from `bytes` according to `declared_media_type`.
///
/// Returns `Ok(None)` for unsupported types. Decode failures are not retried.
pub fn extract(
    bytes: &[u8],
    declared_media_type: &str,
) -> Result<Option<ExtractedContent>, ExtractionError> {
    let Some(media_type) = MediaType::parse(declared_media_type) else {
        info!("Unsupported media type '{declared_media_type}', nothing extracted");
        return Ok(None);
    };

    debug!("Extracting {} bytes as {:?}", bytes.len(), media_type);

    let content = match media_type {
        MediaType::Pdf => ExtractedContent::Text(pdf::extract_text(bytes)?),
        MediaType::Docx => ExtractedContent::Text(docx::extract_text(bytes)?),
        MediaType::Png | MediaType::Jpeg => {
            ExtractedContent::Image(ResumeImage::decode(bytes, media_type)?)
        }
    };

    Ok(Some(content))
}

/// Runs [`extract`] on the blocking pool; parsing is CPU-bound.
pub async fn extract_blocking(
    bytes: Bytes,
    declared_media_type: String,
) -> Result<Option<ExtractedContent>, ExtractionError> {
    tokio::task::spawn_blocking(move || extract(&bytes, &declared_media_type))
        .await
        .map_err(|e| ExtractionError::Worker(e.to_string()))?
}
