use sqlx::PgPool;
use tracing::debug;

use crate::errors::AppError;
use crate::models::swipe::{SwipeAction, SwipeActionRow};

/// Appends the swipe and moves the candidate to its new status atomically.
pub async fn record_swipe(pool: &PgPool, action: &SwipeAction) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO swipe_actions (id, candidate_id, job_id, decision, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(action.id)
    .bind(action.candidate_id)
    .bind(action.job_id)
    .bind(action.decision.as_str())
    .bind(action.created_at)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE candidates SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(action.decision.status().as_str())
        .bind(action.created_at)
        .bind(action.candidate_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    debug!(
        "Recorded {} swipe on candidate {}",
        action.decision, action.candidate_id
    );
    Ok(())
}

/// Removes an undone swipe and puts its candidate back to pending.
pub async fn revert_swipe(pool: &PgPool, action: &SwipeAction) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM swipe_actions WHERE id = $1")
        .bind(action.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE candidates SET status = 'pending', updated_at = now() WHERE id = $1")
        .bind(action.candidate_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Full swipe log, oldest first.
pub async fn list_swipes(pool: &PgPool) -> Result<Vec<SwipeAction>, AppError> {
    let rows = sqlx::query_as::<_, SwipeActionRow>(
        "SELECT * FROM swipe_actions ORDER BY created_at ASC, id ASC",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|row| SwipeAction::try_from(row).map_err(AppError::Internal))
        .collect()
}
