use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;

/// `resumes/{job_id}/{candidate_id}/{file_name}` with the file name reduced
/// to a safe single path segment.
pub fn resume_key(job_id: Uuid, candidate_id: Uuid, file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim();
    let safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = safe.trim_start_matches('.');
    let safe = if safe.is_empty() { "resume" } else { safe };
    format!("resumes/{job_id}/{candidate_id}/{safe}")
}

pub fn content_type_for(file_name: &str) -> &'static str {
    match file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("md") => "text/markdown",
        _ => "text/plain",
    }
}

/// Stores the original upload so the recruiter can open it later.
pub async fn put_resume(
    s3: &S3Client,
    bucket: &str,
    key: &str,
    file_name: &str,
    bytes: Bytes,
) -> Result<(), AppError> {
    s3.put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(bytes))
        .content_type(content_type_for(file_name))
        .send()
        .await
        .map_err(|e| AppError::S3(format!("Upload of {key} failed: {e}")))?;

    info!("Uploaded resume to s3://{bucket}/{key}");
    Ok(())
}

/// Best-effort cleanup. A failed delete leaves an orphaned object and is logged.
pub async fn delete_resumes(s3: &S3Client, bucket: &str, keys: &[String]) {
    for key in keys {
        if let Err(e) = s3.delete_object().bucket(bucket).key(key).send().await {
            warn!("Failed to delete s3://{bucket}/{key}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_key_layout() {
        let job = Uuid::new_v4();
        let cand = Uuid::new_v4();
        assert_eq!(
            resume_key(job, cand, "jane_doe-cv.pdf"),
            format!("resumes/{job}/{cand}/jane_doe-cv.pdf")
        );
    }

    #[test]
    fn test_resume_key_strips_directories_and_odd_chars() {
        let job = Uuid::new_v4();
        let cand = Uuid::new_v4();
        let key = resume_key(job, cand, "../../etc/Jane Doe (1).pdf");
        assert_eq!(key, format!("resumes/{job}/{cand}/Jane_Doe__1_.pdf"));

        let key = resume_key(job, cand, "C:\\Users\\me\\cv.txt");
        assert!(key.ends_with("/cv.txt"));
    }

    #[test]
    fn test_resume_key_never_empty() {
        let job = Uuid::new_v4();
        let cand = Uuid::new_v4();
        assert!(resume_key(job, cand, "...").ends_with("/resume"));
        assert!(resume_key(job, cand, "").ends_with("/resume"));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.PDF"), "application/pdf");
        assert_eq!(content_type_for("notes.md"), "text/markdown");
        assert_eq!(content_type_for("cv.txt"), "text/plain");
        assert_eq!(content_type_for("noext"), "text/plain");
    }
}
