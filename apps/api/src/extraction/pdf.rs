//! PDF text extraction via `pdf-extract`.

use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use crate::extraction::ExtractionError;

/// Extracts the text of every page and concatenates it in page order.
///
/// Blank pages contribute an empty string. An overall empty result is not an
/// error: scanned PDFs simply carry no text layer.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let pages = extract_pages(bytes)?;
    debug!("PDF extracted: {} pages", pages.len());
    Ok(pages.concat())
}

/// Per-page text, one entry per page, in document order.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }));

    match outcome {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(ExtractionError::Pdf(e.to_string())),
        Err(payload) => Err(ExtractionError::Pdf(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("parser aborted: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("parser aborted: {s}")
    } else {
        "parser aborted".to_string()
    }
}
