use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Ordinal quality label assigned by the AI screening pass.
/// Declaration order is best-first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Top,
    Strong,
    Average,
    Weak,
    Poor,
}

impl Bucket {
    pub const ALL: [Bucket; 5] = [
        Bucket::Top,
        Bucket::Strong,
        Bucket::Average,
        Bucket::Weak,
        Bucket::Poor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Top => "top",
            Bucket::Strong => "strong",
            Bucket::Average => "average",
            Bucket::Weak => "weak",
            Bucket::Poor => "poor",
        }
    }

    /// Lenient parse for model output: case and surrounding whitespace are
    /// ignored, anything unrecognised lands in `Average`.
    pub fn from_label(label: &str) -> Bucket {
        label.trim().to_lowercase().parse().unwrap_or_else(|_| {
            tracing::warn!("Unrecognised bucket label '{label}', defaulting to average");
            Bucket::Average
        })
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(Bucket::Top),
            "strong" => Ok(Bucket::Strong),
            "average" => Ok(Bucket::Average),
            "weak" => Ok(Bucket::Weak),
            "poor" => Ok(Bucket::Poor),
            other => Err(anyhow::anyhow!("unknown bucket '{other}'")),
        }
    }
}

/// Review state of a candidate. Everything except `Pending` is the result of
/// exactly one swipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    #[default]
    Pending,
    Interested,
    Rejected,
    Starred,
}

impl CandidateStatus {
    pub const ALL: [CandidateStatus; 4] = [
        CandidateStatus::Pending,
        CandidateStatus::Interested,
        CandidateStatus::Rejected,
        CandidateStatus::Starred,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Pending => "pending",
            CandidateStatus::Interested => "interested",
            CandidateStatus::Rejected => "rejected",
            CandidateStatus::Starred => "starred",
        }
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CandidateStatus::Pending),
            "interested" => Ok(CandidateStatus::Interested),
            "rejected" => Ok(CandidateStatus::Rejected),
            "starred" => Ok(CandidateStatus::Starred),
            other => Err(anyhow::anyhow!("unknown candidate status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    pub company: String,
    pub role: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub institution: String,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub graduation_year: Option<i32>,
}

/// Everything the screening model derives from a resume. Re-scoring replaces
/// this block wholesale; identity and review status are never touched by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub bucket: Bucket,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub work_history: Vec<WorkExperience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub years_experience: Option<f32>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
}

impl Assessment {
    pub fn with_bucket(bucket: Bucket) -> Self {
        Self {
            bucket,
            summary: String::new(),
            skills: Vec::new(),
            work_history: Vec::new(),
            education: Vec::new(),
            years_experience: None,
            strengths: Vec::new(),
            concerns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    /// Owning job. Never changes after creation.
    pub job_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    #[serde(flatten)]
    pub assessment: Assessment,
    pub status: CandidateStatus,
    /// Extracted resume text, re-read on every re-scoring pass.
    #[serde(default, skip_serializing)]
    pub resume_text: String,
    /// Object storage key of the uploaded resume file.
    pub resume_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Candidate {
    pub fn new(job_id: Uuid, name: String, assessment: Assessment) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_id,
            name,
            email: None,
            phone: None,
            location: None,
            assessment,
            status: CandidateStatus::Pending,
            resume_text: String::new(),
            resume_key: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn bucket(&self) -> Bucket {
        self.assessment.bucket
    }

    pub fn is_pending_for(&self, job_id: Uuid) -> bool {
        self.job_id == job_id && self.status == CandidateStatus::Pending
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bucket: String,
    pub summary: String,
    pub skills: Vec<String>,
    pub work_history: Value,
    pub education: Value,
    pub years_experience: Option<f32>,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub status: String,
    pub resume_text: String,
    pub resume_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CandidateRow> for Candidate {
    type Error = anyhow::Error;

    fn try_from(row: CandidateRow) -> Result<Self, Self::Error> {
        Ok(Candidate {
            id: row.id,
            job_id: row.job_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            location: row.location,
            assessment: Assessment {
                bucket: row.bucket.parse()?,
                summary: row.summary,
                skills: row.skills,
                work_history: serde_json::from_value(row.work_history)?,
                education: serde_json::from_value(row.education)?,
                years_experience: row.years_experience,
                strengths: row.strengths,
                concerns: row.concerns,
            },
            status: row.status.parse()?,
            resume_text: row.resume_text,
            resume_key: row.resume_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bucket_order_is_best_first() {
        assert!(Bucket::Top < Bucket::Strong);
        assert!(Bucket::Weak < Bucket::Poor);
        let mut shuffled = vec![Bucket::Poor, Bucket::Top, Bucket::Average];
        shuffled.sort();
        assert_eq!(shuffled, vec![Bucket::Top, Bucket::Average, Bucket::Poor]);
    }

    #[test]
    fn test_bucket_from_label_is_lenient() {
        assert_eq!(Bucket::from_label(" Top "), Bucket::Top);
        assert_eq!(Bucket::from_label("STRONG"), Bucket::Strong);
        assert_eq!(Bucket::from_label("excellent"), Bucket::Average);
        assert_eq!(Bucket::from_label(""), Bucket::Average);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&CandidateStatus::Interested).unwrap();
        assert_eq!(json, r#""interested""#);
        assert_eq!(CandidateStatus::default(), CandidateStatus::Pending);
    }

    #[test]
    fn test_candidate_serializes_assessment_flat() {
        let mut candidate = Candidate::new(
            Uuid::new_v4(),
            "Ada".to_string(),
            Assessment::with_bucket(Bucket::Strong),
        );
        candidate.resume_text = "Analytical Engine notes".to_string();
        let value = serde_json::to_value(&candidate).unwrap();
        assert_eq!(value["bucket"], "strong");
        assert_eq!(value["status"], "pending");
        assert!(value.get("assessment").is_none());
        assert!(value.get("resume_text").is_none());
    }

    #[test]
    fn test_is_pending_for_checks_job_and_status() {
        let job_id = Uuid::new_v4();
        let mut candidate = Candidate::new(
            job_id,
            "Ada".to_string(),
            Assessment::with_bucket(Bucket::Top),
        );
        assert!(candidate.is_pending_for(job_id));
        assert!(!candidate.is_pending_for(Uuid::new_v4()));
        candidate.status = CandidateStatus::Starred;
        assert!(!candidate.is_pending_for(job_id));
    }

    #[test]
    fn test_candidate_row_converts_json_columns() {
        let now = Utc::now();
        let row = CandidateRow {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            name: "Grace".to_string(),
            email: Some("grace@example.com".to_string()),
            phone: None,
            location: None,
            bucket: "weak".to_string(),
            summary: "COBOL veteran".to_string(),
            skills: vec!["cobol".to_string()],
            work_history: json!([{"company": "Navy", "role": "Engineer"}]),
            education: json!([]),
            years_experience: Some(30.0),
            strengths: vec![],
            concerns: vec![],
            status: "rejected".to_string(),
            resume_text: "Grace Hopper. COBOL.".to_string(),
            resume_key: None,
            created_at: now,
            updated_at: now,
        };
        let candidate = Candidate::try_from(row).unwrap();
        assert_eq!(candidate.bucket(), Bucket::Weak);
        assert_eq!(candidate.status, CandidateStatus::Rejected);
        assert_eq!(candidate.assessment.work_history[0].company, "Navy");
        assert!(candidate.assessment.work_history[0].highlights.is_empty());
    }
}
