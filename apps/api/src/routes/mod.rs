pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::candidates::handlers as candidates;
use crate::jobs::handlers as jobs;
use crate::review::handlers as review;
use crate::state::AppState;

/// Resume batches are posted as one multipart body.
const UPLOAD_BODY_LIMIT: usize = 64 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs
        .route(
            "/api/v1/jobs",
            post(jobs::handle_create_job).get(jobs::handle_list_jobs),
        )
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job).delete(jobs::handle_delete_job),
        )
        .route("/api/v1/jobs/:id/select", post(jobs::handle_select_job))
        .route("/api/v1/jobs/:id/feedback", post(jobs::handle_feedback))
        // Candidates
        .route(
            "/api/v1/jobs/:id/candidates",
            post(candidates::handle_upload_resumes)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
                .get(candidates::handle_list_candidates),
        )
        .route(
            "/api/v1/candidates/:id",
            axum::routing::delete(candidates::handle_delete_candidate),
        )
        // Review
        .route("/api/v1/jobs/:id/queue", get(review::handle_get_queue))
        .route("/api/v1/jobs/:id/next", get(review::handle_next_candidate))
        .route("/api/v1/jobs/:id/stats", get(review::handle_review_stats))
        .route("/api/v1/candidates/:id/swipe", post(review::handle_swipe))
        .route("/api/v1/swipes/undo", post(review::handle_undo))
        .with_state(state)
}
