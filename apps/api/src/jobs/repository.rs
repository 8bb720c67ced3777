use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{Job, JobRow};

pub async fn insert_job(pool: &PgPool, job: &Job) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO jobs
            (id, title, description, required_skills, experience_level,
             remote_ok, requires_degree, visa_sponsorship, likes, dislikes,
             created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(job.id)
    .bind(&job.title)
    .bind(&job.description)
    .bind(&job.required_skills)
    .bind(job.experience_level.as_str())
    .bind(job.preferences.remote_ok)
    .bind(job.preferences.requires_degree)
    .bind(job.preferences.visa_sponsorship)
    .bind(&job.likes)
    .bind(&job.dislikes)
    .bind(job.created_at)
    .bind(job.updated_at)
    .execute(pool)
    .await?;

    info!("Inserted job {} ({})", job.id, job.title);
    Ok(())
}

pub async fn list_jobs(pool: &PgPool) -> Result<Vec<Job>, AppError> {
    let rows = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;
    rows.into_iter()
        .map(|row| Job::try_from(row).map_err(AppError::Internal))
        .collect()
}

/// Writes the job's accumulated likes/dislikes.
pub async fn update_feedback(pool: &PgPool, job: &Job) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE jobs SET likes = $1, dislikes = $2, updated_at = $3 WHERE id = $4",
    )
    .bind(&job.likes)
    .bind(&job.dislikes)
    .bind(job.updated_at)
    .bind(job.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Job {} not found", job.id)));
    }
    Ok(())
}

/// Deletes a job; candidates and swipes go with it (ON DELETE CASCADE).
/// Returns false when no such job existed.
pub async fn delete_job(pool: &PgPool, job_id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
        .bind(job_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
