//! Re-scoring: re-derives buckets for a job's pending candidates after the
//! recruiter leaves feedback.
//!
//! Default: `LlmRescorer` (re-runs the resume screening prompt, which now
//! carries the job's likes/dislikes).
//! Fallback: `KeywordRescorer` (pure Rust, deterministic, no network).
//!
//! `AppState` holds an `Arc<dyn Rescorer>`, chosen at startup via config.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::candidate::{Assessment, Bucket, Candidate};
use crate::models::job::Job;
use crate::screening::resume_parser::parse_resume;

/// Fresh assessment for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescoredCandidate {
    pub candidate_id: Uuid,
    pub assessment: Assessment,
}

/// Implement this to swap re-scoring backends without touching the review
/// flow that calls it.
#[async_trait]
pub trait Rescorer: Send + Sync {
    /// Returns new assessments for (a subset of) `candidates`. Candidates left
    /// out keep what they have. An `Err` means nothing could be re-scored.
    async fn rescore(
        &self,
        job: &Job,
        candidates: &[Candidate],
    ) -> Result<Vec<RescoredCandidate>, AppError>;

    /// "llm" | "keyword", for logs.
    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmRescorer
// ────────────────────────────────────────────────────────────────────────────

/// Re-screens every candidate's stored resume text through the LLM with at
/// most `concurrency` calls in flight.
pub struct LlmRescorer {
    llm: LlmClient,
    concurrency: usize,
}

impl LlmRescorer {
    pub fn new(llm: LlmClient, concurrency: usize) -> Self {
        Self {
            llm,
            concurrency: concurrency.max(1),
        }
    }
}

#[async_trait]
impl Rescorer for LlmRescorer {
    async fn rescore(
        &self,
        job: &Job,
        candidates: &[Candidate],
    ) -> Result<Vec<RescoredCandidate>, AppError> {
        let job = Arc::new(job.clone());
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for candidate in candidates {
            if candidate.resume_text.trim().is_empty() {
                debug!("Candidate {} has no resume text, skipping", candidate.id);
                continue;
            }
            let llm = self.llm.clone();
            let job = Arc::clone(&job);
            let permits = Arc::clone(&permits);
            let candidate_id = candidate.id;
            let text = candidate.resume_text.clone();

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("re-score semaphore closed: {e}"))
                })?;
                let parsed = parse_resume(&text, &job, &llm).await?;
                Ok::<_, AppError>(RescoredCandidate {
                    candidate_id,
                    assessment: parsed.assessment(),
                })
            });
        }

        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let mut updates = Vec::new();
        let mut failures = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(update)) => updates.push(update),
                Ok(Err(e)) => {
                    failures += 1;
                    warn!("Re-score call failed: {e}");
                }
                Err(e) => {
                    failures += 1;
                    warn!("Re-score task aborted: {e}");
                }
            }
        }

        if updates.is_empty() {
            return Err(AppError::Llm(format!(
                "all {failures} re-score calls failed"
            )));
        }
        Ok(updates)
    }

    fn backend(&self) -> &'static str {
        "llm"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// KeywordRescorer
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic fallback scorer.
///
/// Score in [0, 1]:
/// - 0.6 × fraction of required skills found (0.3 when the job lists none)
/// - +0.2 when years of experience sit in the job's tier window
///   (+0.1 when unknown or above it)
/// - −0.1 when a degree is required and no education is listed
/// - +0.1 per liked note the resume matches (max +0.2)
/// - −0.15 per disliked note it matches (max −0.3)
///
/// Buckets: top ≥ 0.75, strong ≥ 0.55, average ≥ 0.35, weak ≥ 0.2, else poor.
/// Only the bucket changes; every other assessment field is kept.
pub struct KeywordRescorer;

#[async_trait]
impl Rescorer for KeywordRescorer {
    async fn rescore(
        &self,
        job: &Job,
        candidates: &[Candidate],
    ) -> Result<Vec<RescoredCandidate>, AppError> {
        Ok(candidates
            .iter()
            .map(|candidate| {
                let mut assessment = candidate.assessment.clone();
                assessment.bucket = bucket_for_score(keyword_score(job, candidate));
                RescoredCandidate {
                    candidate_id: candidate.id,
                    assessment,
                }
            })
            .collect())
    }

    fn backend(&self) -> &'static str {
        "keyword"
    }
}

const STOPWORDS: [&str; 16] = [
    "and", "the", "for", "with", "that", "this", "has", "have", "not", "too", "very",
    "candidate", "experience", "years", "good", "strong",
];

pub fn keyword_score(job: &Job, candidate: &Candidate) -> f32 {
    let assessment = &candidate.assessment;
    let haystack = haystack(candidate);
    let skills: HashSet<String> = assessment.skills.iter().map(|s| s.to_lowercase()).collect();

    let skill_part = if job.required_skills.is_empty() {
        0.3
    } else {
        let found = job
            .required_skills
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| skills.contains(s) || haystack.contains(s.as_str()))
            .count();
        0.6 * found as f32 / job.required_skills.len() as f32
    };

    let (min_years, max_years) = job.experience_level.expected_years();
    let experience_part = match assessment.years_experience {
        Some(y) if y >= min_years && y <= max_years => 0.2,
        Some(y) if y > max_years => 0.1,
        Some(_) => 0.0,
        None => 0.1,
    };

    let degree_part = if job.preferences.requires_degree && assessment.education.is_empty() {
        -0.1
    } else {
        0.0
    };

    let likes = job.likes.iter().filter(|n| note_matches(n, &haystack)).count();
    let dislikes = job.dislikes.iter().filter(|n| note_matches(n, &haystack)).count();
    let feedback_part = (0.1 * likes as f32).min(0.2) - (0.15 * dislikes as f32).min(0.3);

    (skill_part + experience_part + degree_part + feedback_part).clamp(0.0, 1.0)
}

pub fn bucket_for_score(score: f32) -> Bucket {
    if score >= 0.75 {
        Bucket::Top
    } else if score >= 0.55 {
        Bucket::Strong
    } else if score >= 0.35 {
        Bucket::Average
    } else if score >= 0.2 {
        Bucket::Weak
    } else {
        Bucket::Poor
    }
}

/// Lowercased text the feedback and skill checks search in.
fn haystack(candidate: &Candidate) -> String {
    let a = &candidate.assessment;
    let mut parts: Vec<&str> = vec![a.summary.as_str(), candidate.resume_text.as_str()];
    parts.extend(a.skills.iter().map(String::as_str));
    parts.extend(a.strengths.iter().map(String::as_str));
    parts.extend(a.work_history.iter().map(|w| w.role.as_str()));
    parts.join(" ").to_lowercase()
}

/// A note matches when at least half of its meaningful terms occur.
fn note_matches(note: &str, haystack: &str) -> bool {
    let terms = note_terms(note);
    if terms.is_empty() {
        return false;
    }
    let hits = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
    hits * 2 >= terms.len()
}

fn note_terms(note: &str) -> Vec<String> {
    note.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() >= 3 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}
