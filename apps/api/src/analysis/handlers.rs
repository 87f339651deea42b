//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::analysis::{AnalysisOutcome, AnalysisRequest, Template, MISSING_INPUT_MESSAGE};
use crate::errors::AppError;
use crate::extraction::{extract_blocking, ExtractedContent, MediaType};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// The uploaded résumé file.
#[derive(Debug)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    /// The declared content type when it is one we read, otherwise whatever the
    /// file name implies, otherwise the declared type as-is.
    pub fn declared_media_type(&self) -> String {
        let declared = self.content_type.as_deref().unwrap_or_default();
        if MediaType::parse(declared).is_some() {
            return declared.to_string();
        }
        self.file_name
            .as_deref()
            .and_then(MediaType::from_file_name)
            .map(|m| m.mime().to_string())
            .unwrap_or_else(|| declared.to_string())
    }
}

/// Multipart form shared by the analyse and extract endpoints.
#[derive(Debug, Default)]
pub struct AnalyseForm {
    pub resume: Option<Upload>,
    pub job_description: String,
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyseResponse {
    pub request_id: Uuid,
    pub template: Template,
    pub analysis: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractPreviewResponse {
    pub media_type: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/analyse
///
/// Multipart fields: `resume` (file), `job_description`, optional `question`.
/// Extracts the résumé, then runs one analysis against the model.
pub async fn handle_analyse(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyseResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("analyse", %request_id);
    analyse_upload(state, multipart, request_id)
        .instrument(span)
        .await
}

async fn analyse_upload(
    state: AppState,
    multipart: Multipart,
    request_id: Uuid,
) -> Result<Json<AnalyseResponse>, AppError> {
    let form = read_form(multipart).await?;

    let Some(upload) = form.resume else {
        return Err(AppError::MissingInput(MISSING_INPUT_MESSAGE.to_string()));
    };
    if form.job_description.trim().is_empty() {
        return Err(AppError::MissingInput(MISSING_INPUT_MESSAGE.to_string()));
    }

    let media_type = upload.declared_media_type();
    info!(
        "Received résumé: {} bytes, media type '{}'",
        upload.bytes.len(),
        media_type
    );
    let content = extract_blocking(upload.bytes, media_type).await?;

    let request = AnalysisRequest {
        content,
        job_description: form.job_description,
        question: form.question,
    };

    let outcome = state.analyzer.run(&request).await;
    match outcome {
        AnalysisOutcome::Completed { text, template } => Ok(Json(AnalyseResponse {
            request_id,
            template,
            analysis: text,
        })),
        AnalysisOutcome::MissingInput => Err(AppError::MissingInput(outcome.into_message())),
        AnalysisOutcome::ServiceFailed { ref detail } => Err(AppError::Service {
            message: outcome.message().to_string(),
            detail: detail.clone(),
        }),
    }
}

/// POST /api/v1/extract
///
/// Returns what the extractor reads from the `resume` field, without calling the model.
pub async fn handle_extract(multipart: Multipart) -> Result<Json<ExtractPreviewResponse>, AppError> {
    let form = read_form(multipart).await?;
    let upload = form
        .resume
        .ok_or_else(|| AppError::Validation("resume file is required".to_string()))?;

    let media_type = upload.declared_media_type();
    let content = extract_blocking(upload.bytes, media_type.clone())
        .await?
        .ok_or_else(|| AppError::UnsupportedMediaType(media_type.clone()))?;

    let response = match &content {
        ExtractedContent::Text(text) => ExtractPreviewResponse {
            media_type,
            kind: content.kind(),
            text: Some(text.clone()),
            width: None,
            height: None,
        },
        ExtractedContent::Image(image) => ExtractPreviewResponse {
            media_type,
            kind: content.kind(),
            text: None,
            width: Some(image.width()),
            height: Some(image.height()),
        },
    };
    Ok(Json(response))
}

/// Reads the multipart body. Empty file fields and blank questions count as absent.
async fn read_form(mut multipart: Multipart) -> Result<AnalyseForm, AppError> {
    let mut form = AnalyseForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read resume: {e}")))?;
                if !bytes.is_empty() {
                    form.resume = Some(Upload {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
            }
            "job_description" => {
                form.job_description = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Could not read job_description: {e}"))
                })?;
            }
            "question" => {
                let question = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read question: {e}")))?;
                if !question.trim().is_empty() {
                    form.question = Some(question);
                }
            }
            other => debug!("Ignoring unknown multipart field '{other}'"),
        }
    }

    Ok(form)
}
