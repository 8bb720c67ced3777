use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::candidates::storage::delete_resumes;
use crate::errors::AppError;
use crate::jobs::repository::{delete_job, insert_job, update_feedback};
use crate::models::job::{ExperienceLevel, Job, JobPreferences};
use crate::review::feedback::save_feedback;
use crate::review::handlers::{queue_snapshot, spawn_rescore, QueueResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub experience_level: ExperienceLevel,
    #[serde(default)]
    pub preferences: JobPreferences,
}

impl CreateJobRequest {
    fn into_job(self) -> Result<Job, AppError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Job title must not be empty".to_string()));
        }
        Ok(Job::new(
            title.to_string(),
            self.description.trim().to_string(),
            normalize_skills(&self.required_skills),
            self.experience_level,
            self.preferences,
        ))
    }
}

/// Trims, lowercases and dedups skills, keeping first-seen order.
fn normalize_skills(skills: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(skills.len());
    for skill in skills {
        let skill = skill.trim().to_lowercase();
        if !skill.is_empty() && !out.contains(&skill) {
            out.push(skill);
        }
    }
    out
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
    pub current_job_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub job: Job,
    pub reprocessing: bool,
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let job = req.into_job()?;

    let mut store = state.store.lock().await;
    insert_job(&state.db, &job).await?;
    store.insert_job(job.clone());

    info!("Created job {} ({})", job.id, job.title);
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(State(state): State<AppState>) -> Json<JobListResponse> {
    let store = state.store.lock().await;
    Json(JobListResponse {
        jobs: store.jobs().into_iter().cloned().collect(),
        current_job_id: store.current_job().map(|j| j.id),
    })
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    let store = state.store.lock().await;
    store
        .job(job_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
}

/// DELETE /api/v1/jobs/:id
/// Cascades to the job's candidates, swipes and stored resume files.
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let keys: Vec<String> = {
        let mut store = state.store.lock().await;
        if store.job(job_id).is_none() {
            return Err(AppError::NotFound(format!("Job {job_id} not found")));
        }
        let keys = store
            .candidates_for_job(job_id)
            .into_iter()
            .filter_map(|c| c.resume_key.clone())
            .collect();

        if !delete_job(&state.db, job_id).await? {
            warn!("Job {job_id} was already gone from the database");
        }
        store.remove_job(job_id);
        keys
    };

    delete_resumes(&state.s3, &state.config.s3_bucket, &keys).await;
    info!("Deleted job {job_id}");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/jobs/:id/select
/// Makes the job current. Reselecting keeps its ordering.
pub async fn handle_select_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<QueueResponse>, AppError> {
    let mut store = state.store.lock().await;
    if store.job(job_id).is_none() {
        return Err(AppError::NotFound(format!("Job {job_id} not found")));
    }
    store.on_job_selected(job_id);
    Ok(Json(queue_snapshot(&mut store, job_id)?))
}

/// POST /api/v1/jobs/:id/feedback
/// Appends likes and dislikes, then re-scores pending candidates in the background.
pub async fn handle_feedback(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<FeedbackResponse>), AppError> {
    let has_note = req
        .likes
        .iter()
        .chain(req.dislikes.iter())
        .any(|n| !n.trim().is_empty());
    if !has_note {
        return Err(AppError::Validation(
            "Feedback needs at least one non-empty like or dislike".to_string(),
        ));
    }

    let job = {
        let mut store = state.store.lock().await;
        let db = state.db.clone();
        save_feedback(&mut store, job_id, &req.likes, &req.dislikes, |job| async move {
            update_feedback(&db, &job).await.map(|()| job)
        })
        .await?
    };

    spawn_rescore(&state, job_id);
    Ok((
        StatusCode::ACCEPTED,
        Json(FeedbackResponse {
            job,
            reprocessing: true,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: &str, skills: &[&str]) -> CreateJobRequest {
        CreateJobRequest {
            title: title.to_string(),
            description: "  Build pipelines.  ".to_string(),
            required_skills: skills.iter().map(|s| s.to_string()).collect(),
            experience_level: ExperienceLevel::Senior,
            preferences: JobPreferences::default(),
        }
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let err = request("   ", &[]).into_job().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_into_job_trims_and_normalizes() {
        let job = request(" Staff Engineer ", &["Rust", " rust", "", "Kafka"])
            .into_job()
            .unwrap();
        assert_eq!(job.title, "Staff Engineer");
        assert_eq!(job.description, "Build pipelines.");
        assert_eq!(job.required_skills, vec!["rust", "kafka"]);
        assert_eq!(job.experience_level, ExperienceLevel::Senior);
        assert!(!job.has_feedback());
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateJobRequest = serde_json::from_str(r#"{"title":"QA"}"#).unwrap();
        let job = req.into_job().unwrap();
        assert!(job.required_skills.is_empty());
        assert_eq!(job.experience_level, ExperienceLevel::Mid);
        assert_eq!(job.preferences, JobPreferences::default());
    }
}
