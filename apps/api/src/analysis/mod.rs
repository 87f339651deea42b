//! Prompt builder and analyzer: turns extracted résumé content, a job
//! description and an optional question into one model request.
//!
//! All LLM calls go through `llm_client`; the analyzer only sees the
//! `ContentGenerator` trait.

pub mod handlers;
pub mod prompts;

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::analysis::prompts::{
    render, FULL_ANALYSIS_TEMPLATE, IMAGE_RESUME_SECTION, QUESTION_TEMPLATE, TEXT_RESUME_SECTION,
};
use crate::extraction::ExtractedContent;
use crate::llm_client::{ContentGenerator, Part};

/// Returned when the résumé or the job description is missing.
pub const MISSING_INPUT_MESSAGE: &str =
    "Please upload your résumé and paste the job description before submitting.";

/// Returned whenever the remote model call fails. The cause is logged, never returned.
pub const SERVICE_FAILURE_MESSAGE: &str =
    "Sorry, we could not analyse your résumé right now. Please try again in a moment.";

/// Which instruction template a request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    /// Four-section comparative analysis.
    FullAnalysis,
    /// Direct answer to the user's question.
    Question,
}

impl Template {
    /// A non-blank question selects `Question`; anything else selects `FullAnalysis`.
    pub fn select(question: Option<&str>) -> Self {
        match question {
            Some(q) if !q.trim().is_empty() => Template::Question,
            _ => Template::FullAnalysis,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub content: Option<ExtractedContent>,
    pub job_description: String,
    pub question: Option<String>,
}

/// Detailed result of one analysis; `message()` is what the user sees.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Completed { text: String, template: Template },
    MissingInput,
    ServiceFailed { detail: String },
}

impl AnalysisOutcome {
    pub fn message(&self) -> &str {
        match self {
            AnalysisOutcome::Completed { text, .. } => text,
            AnalysisOutcome::MissingInput => MISSING_INPUT_MESSAGE,
            AnalysisOutcome::ServiceFailed { .. } => SERVICE_FAILURE_MESSAGE,
        }
    }

    pub fn into_message(self) -> String {
        match self {
            AnalysisOutcome::Completed { text, .. } => text,
            other => other.message().to_string(),
        }
    }
}

/// Assembles the request parts for `content`.
///
/// Text résumés are interpolated into the instruction. Image résumés become
/// two parts, the image first and the instruction second; the instruction
/// never carries image data.
pub fn build_parts(
    content: &ExtractedContent,
    job_description: &str,
    question: Option<&str>,
) -> (Template, Vec<Part>) {
    let template = Template::select(question);

    let resume_section = match content {
        ExtractedContent::Text(text) => render(TEXT_RESUME_SECTION, &[("resume_text", text.as_str())]),
        ExtractedContent::Image(_) => IMAGE_RESUME_SECTION.to_string(),
    };

    let instruction = match template {
        Template::FullAnalysis => render(
            FULL_ANALYSIS_TEMPLATE,
            &[
                ("resume_section", resume_section.as_str()),
                ("job_description", job_description),
            ],
        ),
        Template::Question => render(
            QUESTION_TEMPLATE,
            &[
                ("resume_section", resume_section.as_str()),
                ("job_description", job_description),
                ("question", question.unwrap_or_default().trim()),
            ],
        ),
    };

    let parts = match content {
        ExtractedContent::Text(_) => vec![Part::Text(instruction)],
        ExtractedContent::Image(image) => vec![
            Part::InlineImage {
                mime_type: image.mime_type().to_string(),
                data: image.encoded().to_vec(),
            },
            Part::Text(instruction),
        ],
    };

    (template, parts)
}

/// Runs analyses against an injected content generator.
#[derive(Clone)]
pub struct Analyzer {
    generator: Arc<dyn ContentGenerator>,
}

impl Analyzer {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self { generator }
    }

    /// Returns the markdown report, or a fixed error string. Never fails.
    #[allow(dead_code)]
    pub async fn analyse(&self, request: &AnalysisRequest) -> String {
        self.run(request).await.into_message()
    }

    /// Like [`Analyzer::analyse`] but keeps the failure detail for side-channel reporting.
    pub async fn run(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        let Some(content) = request.content.as_ref() else {
            return AnalysisOutcome::MissingInput;
        };
        if request.job_description.trim().is_empty() {
            return AnalysisOutcome::MissingInput;
        }

        let (template, parts) = build_parts(
            content,
            &request.job_description,
            request.question.as_deref(),
        );
        info!(
            "Running {:?} analysis on {} résumé ({} parts)",
            template,
            content.kind(),
            parts.len()
        );

        match self.generator.generate(&parts).await {
            Ok(text) => AnalysisOutcome::Completed { text, template },
            Err(e) => {
                error!("Analysis failed: {e}");
                AnalysisOutcome::ServiceFailed {
                    detail: e.to_string(),
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeGenerator;
    use super::*;
    use crate::extraction::fixtures::{image_bytes, pdf_with_pages};
    use crate::extraction::{extract, MediaType, ResumeImage};
    use image::ImageFormat;

    fn text_content(text: &str) -> ExtractedContent {
        ExtractedContent::Text(text.to_string())
    }

    fn image_content() -> ExtractedContent {
        let bytes = image_bytes(ImageFormat::Png, 5, 5);
        ExtractedContent::Image(ResumeImage::decode(&bytes, MediaType::Png).unwrap())
    }

    fn request(content: Option<ExtractedContent>, jd: &str, question: Option<&str>) -> AnalysisRequest {
        AnalysisRequest {
            content,
            job_description: jd.to_string(),
            question: question.map(str::to_string),
        }
    }

    fn analyzer(generator: &Arc<FakeGenerator>) -> Analyzer {
        Analyzer::new(generator.clone())
    }

    #[test]
    fn test_template_selection_is_exhaustive() {
        assert_eq!(Template::select(None), Template::FullAnalysis);
        assert_eq!(Template::select(Some("")), Template::FullAnalysis);
        assert_eq!(Template::select(Some("   \n")), Template::FullAnalysis);
        assert_eq!(
            Template::select(Some("How do I show leadership?")),
            Template::Question
        );
    }

    #[test]
    fn test_text_content_is_interpolated_into_single_part() {
        let (template, parts) = build_parts(
            &text_content("Python, SQL, 3 years experience"),
            "Seeking Data Analyst",
            None,
        );
        assert_eq!(template, Template::FullAnalysis);
        assert_eq!(parts.len(), 1);
        let text = parts[0].text().unwrap();
        assert!(text.contains("Python, SQL, 3 years experience"));
        assert!(text.contains("Seeking Data Analyst"));
        assert!(text.contains("1. Overall Match Score"));
        assert!(!text.contains("{resume_section}"));
    }

    #[test]
    fn test_question_template_carries_question() {
        let (template, parts) = build_parts(
            &text_content("Led a team of 4"),
            "Engineering Manager",
            Some("  How can I highlight leadership?  "),
        );
        assert_eq!(template, Template::Question);
        let text = parts[0].text().unwrap();
        assert!(text.contains("\"How can I highlight leadership?\""));
        assert!(text.contains("HR coach"));
        assert!(!text.contains("1. Overall Match Score"));
    }

    #[test]
    fn test_image_content_goes_first_as_separate_part() {
        let content = image_content();
        let (_, parts) = build_parts(&content, "Designer", None);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].is_image());
        let instruction = parts[1].text().unwrap();
        assert!(instruction.contains("attached image"));
        assert!(!instruction.contains("PNG"));
        match &parts[0] {
            Part::InlineImage { mime_type, data } => {
                assert_eq!(mime_type, "image/png");
                let ExtractedContent::Image(image) = &content else {
                    unreachable!()
                };
                assert_eq!(data.as_slice(), image.encoded());
            }
            Part::Text(_) => panic!("expected image part"),
        }
    }

    #[test]
    fn test_resume_text_with_placeholders_stays_literal() {
        let (_, parts) = build_parts(&text_content("I love {job_description}"), "JD", None);
        assert!(parts[0].text().unwrap().contains("I love {job_description}"));
    }

    #[tokio::test]
    async fn test_empty_job_description_short_circuits() {
        let generator = Arc::new(FakeGenerator::replying("unused"));
        for content in [Some(text_content("cv")), Some(image_content()), None] {
            let out = analyzer(&generator)
                .analyse(&request(content, "  ", None))
                .await;
            assert_eq!(out, MISSING_INPUT_MESSAGE);
        }
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_absent_content_short_circuits() {
        let generator = Arc::new(FakeGenerator::replying("unused"));
        let outcome = analyzer(&generator)
            .run(&request(None, "Data Analyst", Some("Any tips?")))
            .await;
        assert_eq!(outcome, AnalysisOutcome::MissingInput);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_service_error_becomes_fixed_message() {
        let generator = Arc::new(FakeGenerator::failing(429, "Quota exceeded"));
        let analyzer = analyzer(&generator);
        let req = request(Some(text_content("cv")), "Data Analyst", None);

        assert_eq!(analyzer.analyse(&req).await, SERVICE_FAILURE_MESSAGE);

        match analyzer.run(&req).await {
            AnalysisOutcome::ServiceFailed { detail } => assert!(detail.contains("Quota exceeded")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_successful_analysis_returns_model_text() {
        let generator = Arc::new(FakeGenerator::replying("## 1. Overall Match Score\n80%"));
        let outcome = analyzer(&generator)
            .run(&request(Some(text_content("cv")), "Data Analyst", None))
            .await;
        assert_eq!(
            outcome,
            AnalysisOutcome::Completed {
                text: "## 1. Overall Match Score\n80%".to_string(),
                template: Template::FullAnalysis,
            }
        );
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_pdf_resume_end_to_end_uses_full_analysis() {
        let pdf = pdf_with_pages(&["Python, SQL, 3 years experience"]);
        let content = extract(&pdf, "application/pdf").unwrap();
        let generator = Arc::new(FakeGenerator::replying("## 1. Overall Match Score\n85%"));

        let out = analyzer(&generator)
            .analyse(&request(
                content,
                "Seeking Data Analyst with Python and SQL",
                None,
            ))
            .await;

        assert!(out.contains("1. Overall Match Score"));
        let sent = generator.last_call();
        assert_eq!(sent.len(), 1);
        let prompt = sent[0].text().unwrap();
        assert!(prompt.contains("1. Overall Match Score"));
        assert!(prompt.contains("Python"));
        assert!(prompt.contains("Seeking Data Analyst with Python and SQL"));
    }
}
