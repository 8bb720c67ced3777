use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{Candidate, CandidateRow};

/// Inserts a batch in one transaction: either every candidate lands or none.
pub async fn insert_candidates(pool: &PgPool, candidates: &[Candidate]) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    for candidate in candidates {
        insert_one(&mut tx, candidate).await?;
    }
    tx.commit().await?;

    info!("Inserted {} candidates", candidates.len());
    Ok(())
}

async fn insert_one(
    tx: &mut Transaction<'_, Postgres>,
    candidate: &Candidate,
) -> Result<(), AppError> {
    let a = &candidate.assessment;
    sqlx::query(
        r#"
        INSERT INTO candidates
            (id, job_id, name, email, phone, location, bucket, summary, skills,
             work_history, education, years_experience, strengths, concerns,
             status, resume_text, resume_key, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19)
        "#,
    )
    .bind(candidate.id)
    .bind(candidate.job_id)
    .bind(&candidate.name)
    .bind(&candidate.email)
    .bind(&candidate.phone)
    .bind(&candidate.location)
    .bind(a.bucket.as_str())
    .bind(&a.summary)
    .bind(&a.skills)
    .bind(serde_json::to_value(&a.work_history).map_err(anyhow::Error::from)?)
    .bind(serde_json::to_value(&a.education).map_err(anyhow::Error::from)?)
    .bind(a.years_experience)
    .bind(&a.strengths)
    .bind(&a.concerns)
    .bind(candidate.status.as_str())
    .bind(&candidate.resume_text)
    .bind(&candidate.resume_key)
    .bind(candidate.created_at)
    .bind(candidate.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn list_candidates(pool: &PgPool) -> Result<Vec<Candidate>, AppError> {
    let rows = sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates ORDER BY created_at")
        .fetch_all(pool)
        .await?;
    rows.into_iter()
        .map(|row| Candidate::try_from(row).map_err(AppError::Internal))
        .collect()
}

/// Overwrites AI-derived fields after a re-scoring pass. Status and identity
/// are left alone.
pub async fn update_assessments(pool: &PgPool, candidates: &[Candidate]) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    for candidate in candidates {
        let a = &candidate.assessment;
        sqlx::query(
            r#"
            UPDATE candidates
            SET bucket = $1, summary = $2, skills = $3, work_history = $4,
                education = $5, years_experience = $6, strengths = $7,
                concerns = $8, updated_at = $9
            WHERE id = $10
            "#,
        )
        .bind(a.bucket.as_str())
        .bind(&a.summary)
        .bind(&a.skills)
        .bind(serde_json::to_value(&a.work_history).map_err(anyhow::Error::from)?)
        .bind(serde_json::to_value(&a.education).map_err(anyhow::Error::from)?)
        .bind(a.years_experience)
        .bind(&a.strengths)
        .bind(&a.concerns)
        .bind(candidate.updated_at)
        .bind(candidate.id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Returns false when no such candidate existed.
pub async fn delete_candidate(pool: &PgPool, candidate_id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM candidates WHERE id = $1")
        .bind(candidate_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
