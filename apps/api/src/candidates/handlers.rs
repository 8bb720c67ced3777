use std::path::Path as FilePath;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::candidates::repository::{delete_candidate, insert_candidates};
use crate::candidates::storage::{delete_resumes, put_resume, resume_key};
use crate::errors::AppError;
use crate::models::candidate::Candidate;
use crate::models::job::Job;
use crate::screening::extract::extract_text;
use crate::screening::resume_parser::parse_resume;
use crate::state::AppState;

/// One uploaded file that could not be turned into a candidate.
#[derive(Debug, Serialize, PartialEq)]
pub struct UploadFailure {
    pub file_name: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub job_id: Uuid,
    pub created: Vec<Candidate>,
    pub failed: Vec<UploadFailure>,
}

struct UploadedFile {
    file_name: String,
    bytes: Bytes,
}

/// Display name used when the model finds no name in the resume.
fn fallback_name(file_name: &str) -> String {
    FilePath::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.replace(['_', '-'], " ").trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unnamed candidate".to_string())
}

/// Object keys of screened candidates whose upload reached S3.
fn resume_keys(candidates: &[Candidate]) -> Vec<String> {
    candidates
        .iter()
        .filter_map(|c| c.resume_key.clone())
        .collect()
}

async fn read_files(multipart: &mut Multipart, max_files: usize) -> Result<Vec<UploadedFile>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if files.len() == max_files {
            return Err(AppError::Validation(format!(
                "At most {max_files} files per upload"
            )));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read '{file_name}': {e}")))?;
        files.push(UploadedFile { file_name, bytes });
    }

    if files.is_empty() {
        return Err(AppError::Validation("No resume files in upload".to_string()));
    }
    Ok(files)
}

/// Extracts, screens and stores one resume. Nothing is persisted to the
/// database here; the caller inserts the whole batch at once.
async fn screen_file(state: &AppState, job: &Job, file: UploadedFile) -> Result<Candidate, AppError> {
    let UploadedFile { file_name, bytes } = file;

    let text = {
        let file_name = file_name.clone();
        let bytes = bytes.clone();
        tokio::task::spawn_blocking(move || extract_text(&file_name, &bytes))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in extraction: {e}")))??
    };

    let parsed = parse_resume(&text, job, &state.llm).await?;
    let mut candidate = parsed.into_candidate(job.id, &fallback_name(&file_name), text);

    let key = resume_key(job.id, candidate.id, &file_name);
    put_resume(&state.s3, &state.config.s3_bucket, &key, &file_name, bytes).await?;
    candidate.resume_key = Some(key);
    Ok(candidate)
}

/// POST /api/v1/jobs/:id/candidates
/// Multipart upload of one or more resumes (pdf, txt, md). Files that fail
/// extraction or screening are reported back without failing the batch.
pub async fn handle_upload_resumes(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let job = state
        .store
        .lock()
        .await
        .job(job_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    let files = read_files(&mut multipart, state.config.max_upload_files).await?;
    info!("Screening {} uploaded resumes for job {job_id}", files.len());

    let job = Arc::new(job);
    let permits = Arc::new(Semaphore::new(state.config.llm_concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for (index, file) in files.into_iter().enumerate() {
        let state = state.clone();
        let job = Arc::clone(&job);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let file_name = file.file_name.clone();
            let result = match permits.acquire_owned().await {
                Ok(_permit) => screen_file(&state, &job, file).await,
                Err(e) => Err(AppError::Internal(anyhow::anyhow!("upload semaphore closed: {e}"))),
            };
            (index, file_name, result)
        });
    }

    let mut screened: Vec<(usize, Candidate)> = Vec::new();
    let mut failed: Vec<(usize, UploadFailure)> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, _, Ok(candidate))) => screened.push((index, candidate)),
            Ok((index, file_name, Err(e))) => {
                warn!("Resume '{file_name}' for job {job_id} was not imported: {e}");
                failed.push((
                    index,
                    UploadFailure {
                        file_name,
                        error: e.to_string(),
                    },
                ));
            }
            Err(e) => warn!("Resume screening task panicked: {e}"),
        }
    }
    screened.sort_by_key(|(index, _)| *index);
    failed.sort_by_key(|(index, _)| *index);
    let created: Vec<Candidate> = screened.into_iter().map(|(_, c)| c).collect();
    let failed: Vec<UploadFailure> = failed.into_iter().map(|(_, f)| f).collect();

    if !created.is_empty() {
        let mut store = state.store.lock().await;
        if store.job(job_id).is_none() {
            drop(store);
            delete_resumes(&state.s3, &state.config.s3_bucket, &resume_keys(&created)).await;
            return Err(AppError::NotFound(format!(
                "Job {job_id} was deleted during upload"
            )));
        }
        if let Err(e) = insert_candidates(&state.db, &created).await {
            drop(store);
            warn!("Insert of {} candidates for job {job_id} failed, removing their resume files", created.len());
            delete_resumes(&state.s3, &state.config.s3_bucket, &resume_keys(&created)).await;
            return Err(e);
        }
        store.add_candidates(job_id, created.clone())?;
    }

    info!(
        "Upload for job {job_id}: {} created, {} failed",
        created.len(),
        failed.len()
    );
    let status = if created.is_empty() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(UploadResponse {
            job_id,
            created,
            failed,
        }),
    ))
}

/// GET /api/v1/jobs/:id/candidates
/// Every candidate of the job regardless of status, oldest first.
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Vec<Candidate>>, AppError> {
    let store = state.store.lock().await;
    if store.job(job_id).is_none() {
        return Err(AppError::NotFound(format!("Job {job_id} not found")));
    }
    Ok(Json(
        store
            .candidates_for_job(job_id)
            .into_iter()
            .cloned()
            .collect(),
    ))
}

/// DELETE /api/v1/candidates/:id
pub async fn handle_delete_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let removed = {
        let mut store = state.store.lock().await;
        if store.candidate(candidate_id).is_none() {
            return Err(AppError::NotFound(format!(
                "Candidate {candidate_id} not found"
            )));
        }
        if !delete_candidate(&state.db, candidate_id).await? {
            warn!("Candidate {candidate_id} was already gone from the database");
        }
        store.remove_candidate(candidate_id)
    };

    if let Some(key) = removed.and_then(|c| c.resume_key) {
        delete_resumes(&state.s3, &state.config.s3_bucket, &[key]).await;
    }
    info!("Deleted candidate {candidate_id}");
    Ok(StatusCode::NO_CONTENT)
}
