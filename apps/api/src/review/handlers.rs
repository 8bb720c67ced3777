use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::candidates::repository::update_assessments;
use crate::errors::AppError;
use crate::jobs::repository::update_feedback;
use crate::models::candidate::{Bucket, Candidate, CandidateStatus};
use crate::models::swipe::{SwipeAction, SwipeDecision};
use crate::ranking::store::ReviewStore;
use crate::review::feedback::{note_feedback, rescore_and_rerank, save_feedback, RescoreOutcome};
use crate::review::repository::{record_swipe, revert_swipe};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub job_id: Uuid,
    pub candidates: Vec<Candidate>,
    pub remaining: usize,
    pub reprocessing: bool,
}

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub decision: SwipeDecision,
    /// Free-text reason. Becomes a like on a positive swipe, a dislike on a
    /// rejection, and triggers a re-score of the job.
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SwipeResponse {
    pub action: SwipeAction,
    pub next: Option<Candidate>,
    pub reprocessing: bool,
    /// Whether the note became feedback. Absent when the swipe had no note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_saved: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct UndoResponse {
    pub job_id: Uuid,
    pub undone: SwipeAction,
    pub candidate: Option<Candidate>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ReviewStats {
    pub job_id: Uuid,
    pub total: usize,
    pub by_status: BTreeMap<&'static str, usize>,
    pub by_bucket: BTreeMap<&'static str, usize>,
    pub reprocessing: bool,
}

/// Builds the queue view for a job, computing the ordering on first read.
pub(crate) fn queue_snapshot(store: &mut ReviewStore, job_id: Uuid) -> Result<QueueResponse, AppError> {
    if store.job(job_id).is_none() {
        return Err(AppError::NotFound(format!("Job {job_id} not found")));
    }
    store.ensure_ranking(job_id);

    let candidates: Vec<Candidate> = store
        .pending_in_order(job_id)
        .into_iter()
        .cloned()
        .collect();
    Ok(QueueResponse {
        job_id,
        remaining: candidates.len(),
        candidates,
        reprocessing: store.is_reprocessing(job_id),
    })
}

fn review_stats(store: &ReviewStore, job_id: Uuid) -> ReviewStats {
    let candidates = store.candidates_for_job(job_id);

    let mut by_status: BTreeMap<&'static str, usize> =
        CandidateStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
    let mut by_bucket: BTreeMap<&'static str, usize> =
        Bucket::ALL.iter().map(|b| (b.as_str(), 0)).collect();
    for candidate in &candidates {
        *by_status.entry(candidate.status.as_str()).or_default() += 1;
        *by_bucket.entry(candidate.bucket().as_str()).or_default() += 1;
    }

    ReviewStats {
        job_id,
        total: candidates.len(),
        by_status,
        by_bucket,
        reprocessing: store.is_reprocessing(job_id),
    }
}

/// Runs a re-score pass for a job in the background and writes the new
/// assessments through to the database. Duplicate triggers are dropped by
/// the pass itself.
pub fn spawn_rescore(state: &AppState, job_id: Uuid) {
    let store = Arc::clone(&state.store);
    let rescorer = Arc::clone(&state.rescorer);
    let db = state.db.clone();

    tokio::spawn(async move {
        let run = rescore_and_rerank(&store, rescorer.as_ref(), job_id).await;
        match &run.outcome {
            RescoreOutcome::Applied { rescored } => {
                if let Err(e) = update_assessments(&db, &run.updated).await {
                    error!("Failed to persist {rescored} re-scored candidates for job {job_id}: {e}");
                }
            }
            RescoreOutcome::Failed { reason } => {
                warn!("Re-score for job {job_id} did not apply: {reason}");
            }
            other => info!("Re-score for job {job_id} skipped: {other:?}"),
        }
    });
}

/// GET /api/v1/jobs/:id/queue
pub async fn handle_get_queue(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<QueueResponse>, AppError> {
    let mut store = state.store.lock().await;
    Ok(Json(queue_snapshot(&mut store, job_id)?))
}

/// GET /api/v1/jobs/:id/next
/// 204 when the queue is exhausted.
pub async fn handle_next_candidate(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let mut store = state.store.lock().await;
    if store.job(job_id).is_none() {
        return Err(AppError::NotFound(format!("Job {job_id} not found")));
    }
    store.ensure_ranking(job_id);

    match store.next_candidate(job_id) {
        Some(candidate) => Ok(Json(candidate.clone()).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// GET /api/v1/jobs/:id/stats
pub async fn handle_review_stats(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ReviewStats>, AppError> {
    let store = state.store.lock().await;
    if store.job(job_id).is_none() {
        return Err(AppError::NotFound(format!("Job {job_id} not found")));
    }
    Ok(Json(review_stats(&store, job_id)))
}

/// POST /api/v1/candidates/:id/swipe
/// Once the swipe is recorded the request succeeds. A note that cannot be
/// saved is logged and reported through `note_saved`.
pub async fn handle_swipe(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Json(req): Json<SwipeRequest>,
) -> Result<Json<SwipeResponse>, AppError> {
    let mut store = state.store.lock().await;
    let action = store.swipe(candidate_id, req.decision)?;
    if let Err(e) = record_swipe(&state.db, &action).await {
        store.undo();
        return Err(e);
    }
    let job_id = action.job_id;

    let mut note_saved = None;
    if let Some((likes, dislikes)) = note_feedback(req.decision, req.note.as_deref()) {
        let db = state.db.clone();
        let saved = save_feedback(&mut store, job_id, &likes, &dislikes, |job| async move {
            update_feedback(&db, &job).await.map(|()| job)
        })
        .await;
        match saved {
            Ok(_) => {
                spawn_rescore(&state, job_id);
                note_saved = Some(true);
            }
            Err(e) => {
                error!("Swipe on candidate {candidate_id} kept, but its note was not saved: {e}");
                note_saved = Some(false);
            }
        }
    }

    // A freshly spawned pass may not have set the flag yet.
    let reprocessing = note_saved == Some(true) || store.is_reprocessing(job_id);
    let next = store.next_candidate(job_id).cloned();
    Ok(Json(SwipeResponse {
        action,
        next,
        reprocessing,
        note_saved,
    }))
}

/// POST /api/v1/swipes/undo
/// Reverts the most recent swipe on any job. `job_id` names the job it touched.
pub async fn handle_undo(State(state): State<AppState>) -> Result<Json<UndoResponse>, AppError> {
    let mut store = state.store.lock().await;
    let last = store
        .last_swipe()
        .cloned()
        .ok_or_else(|| AppError::NotFound("No swipe to undo".to_string()))?;

    revert_swipe(&state.db, &last).await?;
    let undone = store
        .undo()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("swipe log emptied during undo")))?;

    let candidate = store.candidate(undone.candidate_id).cloned();
    Ok(Json(UndoResponse {
        job_id: undone.job_id,
        undone,
        candidate,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::Assessment;
    use crate::models::job::{ExperienceLevel, Job, JobPreferences};

    fn seeded_store(buckets: &[Bucket]) -> (ReviewStore, Uuid, Vec<Uuid>) {
        let mut store = ReviewStore::with_seed(3);
        let job = Job::new(
            "Data Engineer".to_string(),
            String::new(),
            vec!["sql".to_string()],
            ExperienceLevel::Mid,
            JobPreferences::default(),
        );
        let job_id = job.id;
        store.insert_job(job);
        let batch: Vec<Candidate> = buckets
            .iter()
            .enumerate()
            .map(|(i, b)| Candidate::new(job_id, format!("c{i}"), Assessment::with_bucket(*b)))
            .collect();
        let ids = batch.iter().map(|c| c.id).collect();
        store.add_candidates(job_id, batch).unwrap();
        (store, job_id, ids)
    }

    #[test]
    fn test_queue_snapshot_for_unknown_job_is_not_found() {
        let (mut store, _, _) = seeded_store(&[]);
        let err = queue_snapshot(&mut store, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_queue_snapshot_lists_only_pending() {
        let (mut store, job_id, ids) = seeded_store(&[Bucket::Top, Bucket::Weak, Bucket::Poor]);
        store.swipe(ids[1], SwipeDecision::Rejected).unwrap();

        let queue = queue_snapshot(&mut store, job_id).unwrap();
        assert_eq!(queue.remaining, 2);
        assert!(queue.candidates.iter().all(|c| c.id != ids[1]));
        assert!(!queue.reprocessing);
    }

    #[test]
    fn test_queue_snapshot_reports_reprocessing() {
        let (mut store, job_id, _) = seeded_store(&[Bucket::Average]);
        assert!(store.begin_rescore(job_id));
        assert!(queue_snapshot(&mut store, job_id).unwrap().reprocessing);
    }

    #[test]
    fn test_review_stats_counts_status_and_bucket() {
        let (mut store, job_id, ids) =
            seeded_store(&[Bucket::Top, Bucket::Top, Bucket::Poor, Bucket::Average]);
        store.swipe(ids[0], SwipeDecision::Starred).unwrap();
        store.swipe(ids[2], SwipeDecision::Rejected).unwrap();

        let stats = review_stats(&store, job_id);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_status["pending"], 2);
        assert_eq!(stats.by_status["starred"], 1);
        assert_eq!(stats.by_status["rejected"], 1);
        assert_eq!(stats.by_status["interested"], 0);
        assert_eq!(stats.by_bucket["top"], 2);
        assert_eq!(stats.by_bucket["strong"], 0);
        assert_eq!(stats.by_bucket["poor"], 1);
    }

    #[test]
    fn test_swipe_request_note_is_optional() {
        let req: SwipeRequest = serde_json::from_str(r#"{"decision":"interested"}"#).unwrap();
        assert_eq!(req.decision, SwipeDecision::Interested);
        assert!(req.note.is_none());

        let req: SwipeRequest =
            serde_json::from_str(r#"{"decision":"rejected","note":"no cloud experience"}"#)
                .unwrap();
        assert_eq!(req.note.as_deref(), Some("no cloud experience"));
    }
}
