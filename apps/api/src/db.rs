use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::candidates::repository::list_candidates;
use crate::jobs::repository::list_jobs;
use crate::ranking::store::ReviewStore;
use crate::review::repository::list_swipes;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Builds the in-memory review store from persisted jobs, candidates and the
/// swipe log. Orderings are computed lazily afterwards.
pub async fn load_review_store(pool: &PgPool, seed: Option<u64>) -> Result<ReviewStore> {
    let jobs = list_jobs(pool).await?;
    let candidates = list_candidates(pool).await?;
    let swipes = list_swipes(pool).await?;

    let mut store = match seed {
        Some(seed) => {
            info!("Review orderings seeded with {seed}");
            ReviewStore::with_seed(seed)
        }
        None => ReviewStore::new(),
    };
    store.hydrate(jobs, candidates, swipes);
    Ok(store)
}
