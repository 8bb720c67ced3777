use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::ranking::store::ReviewStore;
use crate::screening::rescoring::Rescorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    pub llm: LlmClient,
    pub config: Config,
    /// Single owner of review state. Handlers hold the lock for the whole of a
    /// mutation, database write included, so store and database see
    /// operations in the same order.
    pub store: Arc<Mutex<ReviewStore>>,
    /// Pluggable re-scorer. LLM by default; keyword fallback via ENABLE_LLM_RESCORING.
    pub rescorer: Arc<dyn Rescorer>,
}
