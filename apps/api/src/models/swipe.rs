use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::candidate::CandidateStatus;

/// What the recruiter did with a candidate card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDecision {
    Interested,
    Rejected,
    Starred,
}

impl SwipeDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeDecision::Interested => "interested",
            SwipeDecision::Rejected => "rejected",
            SwipeDecision::Starred => "starred",
        }
    }

    /// Status the candidate moves to.
    pub fn status(&self) -> CandidateStatus {
        match self {
            SwipeDecision::Interested => CandidateStatus::Interested,
            SwipeDecision::Rejected => CandidateStatus::Rejected,
            SwipeDecision::Starred => CandidateStatus::Starred,
        }
    }

    /// Whether a feedback note on this decision counts as a like.
    pub fn is_positive(&self) -> bool {
        !matches!(self, SwipeDecision::Rejected)
    }
}

impl fmt::Display for SwipeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwipeDecision {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interested" => Ok(SwipeDecision::Interested),
            "rejected" => Ok(SwipeDecision::Rejected),
            "starred" => Ok(SwipeDecision::Starred),
            other => Err(anyhow::anyhow!("unknown swipe decision '{other}'")),
        }
    }
}

/// One entry of the append-only swipe log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwipeAction {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub decision: SwipeDecision,
    pub created_at: DateTime<Utc>,
}

impl SwipeAction {
    pub fn new(candidate_id: Uuid, job_id: Uuid, decision: SwipeDecision) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_id,
            job_id,
            decision,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SwipeActionRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub decision: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SwipeActionRow> for SwipeAction {
    type Error = anyhow::Error;

    fn try_from(row: SwipeActionRow) -> Result<Self, Self::Error> {
        Ok(SwipeAction {
            id: row.id,
            candidate_id: row.candidate_id,
            job_id: row.job_id,
            decision: row.decision.parse()?,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_maps_to_status() {
        assert_eq!(SwipeDecision::Interested.status(), CandidateStatus::Interested);
        assert_eq!(SwipeDecision::Rejected.status(), CandidateStatus::Rejected);
        assert_eq!(SwipeDecision::Starred.status(), CandidateStatus::Starred);
    }

    #[test]
    fn test_only_rejection_is_negative() {
        assert!(SwipeDecision::Interested.is_positive());
        assert!(SwipeDecision::Starred.is_positive());
        assert!(!SwipeDecision::Rejected.is_positive());
    }

    #[test]
    fn test_decision_deserializes_from_snake_case() {
        let decision: SwipeDecision = serde_json::from_str(r#""starred""#).unwrap();
        assert_eq!(decision, SwipeDecision::Starred);
        assert!("pending".parse::<SwipeDecision>().is_err());
    }
}
