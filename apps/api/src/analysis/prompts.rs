// All LLM prompt templates for the Analysis module.
// Placeholders are `{name}` and are filled by `render`.

/// Full comparative analysis. Persona: ATS-aware HR executive.
/// Replace: {resume_section}, {job_description}
pub const FULL_ANALYSIS_TEMPLATE: &str = r#"You are an experienced HR executive with deep technical knowledge and a thorough understanding of how Applicant Tracking Systems (ATS) screen résumés.

Your task is to review the candidate's résumé against the job description below and produce a professional fit analysis.

{resume_section}

JOB DESCRIPTION:
{job_description}

Respond in markdown using EXACTLY these four sections, in this order:

## 1. Overall Match Score
Give a percentage match between the résumé and the job description and a one-paragraph justification.

## 2. Key Strengths
List the skills, experience and achievements in the résumé that align best with the role.

## 3. Gaps and Missing Keywords
List the requirements and ATS keywords from the job description that the résumé lacks or under-represents.

## 4. Recommendations
Give specific, actionable changes that would make the résumé a stronger match for this role."#;

/// Answer a specific user question. Persona: HR coach.
/// Replace: {resume_section}, {job_description}, {question}
pub const QUESTION_TEMPLATE: &str = r#"You are a supportive and experienced HR coach helping a candidate improve their résumé for a specific role.

{resume_section}

JOB DESCRIPTION:
{job_description}

The candidate asks:
"{question}"

Answer the question directly and concisely in markdown. Ground your answer in the résumé and the job description above, and give concrete examples or rewording where useful."#;

/// Résumé block for text résumés. Replace: {resume_text}
pub const TEXT_RESUME_SECTION: &str = "RÉSUMÉ:\n{resume_text}";

/// Résumé block for image résumés; the image itself travels as a separate part.
pub const IMAGE_RESUME_SECTION: &str =
    "RÉSUMÉ:\nThe candidate's résumé is provided as the attached image. Read it carefully, \
    including layout, headings and any text it contains.";

/// Fills `{name}` placeholders in a single pass.
///
/// Substituted values are never rescanned, so user text containing
/// `{job_description}` or similar stays literal. Unknown placeholders are kept.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
