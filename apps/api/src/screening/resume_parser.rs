//! Resume Parser: resume text + job → structured candidate fields and a bucket.
//!
//! The same call serves the first screening at upload time and every
//! feedback-driven re-score, because the job's likes/dislikes are part of the
//! prompt.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_INVENTION_INSTRUCTION};
use crate::llm_client::LlmClient;
use crate::models::candidate::{Assessment, Bucket, Candidate, Education, WorkExperience};
use crate::models::job::Job;
use crate::screening::prompts::{SCREENING_PROMPT_TEMPLATE, SCREENING_SYSTEM};

/// Resumes longer than this are cut before prompting.
const MAX_RESUME_CHARS: usize = 24_000;

/// Raw model output. `bucket` is kept as text and parsed leniently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedResume {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub work_history: Vec<WorkExperience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub years_experience: Option<f32>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
    pub bucket: String,
}

impl ParsedResume {
    pub fn assessment(&self) -> Assessment {
        Assessment {
            bucket: Bucket::from_label(&self.bucket),
            summary: self.summary.trim().to_string(),
            skills: dedup_skills(&self.skills),
            work_history: self.work_history.clone(),
            education: self.education.clone(),
            years_experience: self.years_experience.filter(|y| y.is_finite() && *y >= 0.0),
            strengths: self.strengths.clone(),
            concerns: self.concerns.clone(),
        }
    }

    /// Builds a new pending candidate. `fallback_name` is used when the model
    /// could not find a name (typically the upload's file stem).
    pub fn into_candidate(self, job_id: Uuid, fallback_name: &str, resume_text: String) -> Candidate {
        let assessment = self.assessment();
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| fallback_name.to_string());

        let mut candidate = Candidate::new(job_id, name, assessment);
        candidate.email = non_blank(self.email);
        candidate.phone = non_blank(self.phone);
        candidate.location = non_blank(self.location);
        candidate.resume_text = resume_text;
        candidate
    }
}

/// Screens one resume against `job`.
pub async fn parse_resume(
    resume_text: &str,
    job: &Job,
    llm: &LlmClient,
) -> Result<ParsedResume, AppError> {
    let prompt = build_screening_prompt(job, resume_text);
    let system = format!("{SCREENING_SYSTEM} {NO_INVENTION_INSTRUCTION} {JSON_ONLY_SYSTEM}");
    llm.call_json::<ParsedResume>(&prompt, &system)
        .await
        .map_err(|e| AppError::Llm(format!("Resume screening failed: {e}")))
}

pub fn build_screening_prompt(job: &Job, resume_text: &str) -> String {
    let preferences = {
        let prefs = &job.preferences;
        let mut out = Vec::new();
        if prefs.remote_ok {
            out.push("remote candidates welcome");
        }
        if prefs.requires_degree {
            out.push("degree required");
        }
        if prefs.visa_sponsorship {
            out.push("visa sponsorship available");
        }
        if out.is_empty() {
            "none".to_string()
        } else {
            out.join(", ")
        }
    };

    SCREENING_PROMPT_TEMPLATE
        .replace("{job_title}", &job.title)
        .replace("{experience_level}", job.experience_level.as_str())
        .replace("{required_skills}", &job.required_skills.join(", "))
        .replace("{preferences}", &preferences)
        .replace("{job_description}", &job.description)
        .replace("{likes}", &bullet_list(&job.likes))
        .replace("{dislikes}", &bullet_list(&job.dislikes))
        .replace("{resume_text}", truncate_chars(resume_text, MAX_RESUME_CHARS))
}

fn bullet_list(notes: &[String]) -> String {
    if notes.is_empty() {
        return "- (none yet)".to_string();
    }
    notes
        .iter()
        .map(|n| format!("- {n}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Lowercases, trims and removes duplicate skills, keeping first occurrence.
fn dedup_skills(skills: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    skills
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
