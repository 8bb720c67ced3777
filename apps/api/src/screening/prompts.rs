// Prompt constants for resume screening.
// Shared fragments come from llm_client::prompts.

/// System prompt for both the first parse and feedback-driven re-scoring.
pub const SCREENING_SYSTEM: &str = "You are an experienced technical recruiter screening resumes \
    against a single job opening. Extract structured facts from the resume and place the \
    candidate in exactly one quality bucket relative to this job.";

/// Screening prompt. Placeholders: `{job_title}`, `{experience_level}`,
/// `{required_skills}`, `{preferences}`, `{job_description}`, `{likes}`,
/// `{dislikes}`, `{resume_text}`.
pub const SCREENING_PROMPT_TEMPLATE: &str = r#"Screen the resume below for this job.

JOB
Title: {job_title}
Experience level: {experience_level}
Required skills: {required_skills}
Preferences: {preferences}
Description:
{job_description}

RECRUITER FEEDBACK SO FAR
Liked in previous candidates:
{likes}
Disliked in previous candidates:
{dislikes}

Return a JSON object with this EXACT schema:
{
  "name": "Jane Doe",
  "email": "jane@example.com",
  "phone": null,
  "location": "Berlin, DE",
  "skills": ["rust", "postgresql"],
  "work_history": [
    {"company": "Acme", "role": "Backend Engineer", "duration": "2021-2024", "highlights": ["Cut p99 latency 40%"]}
  ],
  "education": [
    {"institution": "TU Berlin", "degree": "BSc", "field": "Computer Science", "graduation_year": 2020}
  ],
  "years_experience": 4.5,
  "summary": "Two sentences on fit for THIS job.",
  "strengths": ["..."],
  "concerns": ["..."],
  "bucket": "strong"
}

BUCKETS (pick exactly one, relative to this job):
- "top": meets every requirement and matches what the recruiter liked
- "strong": meets nearly all requirements
- "average": meets the core requirements with notable gaps
- "weak": meets few requirements
- "poor": not a fit, or matches what the recruiter disliked

Weigh recruiter feedback heavily: it reflects what this recruiter actually wants.

RESUME
{resume_text}"#;
