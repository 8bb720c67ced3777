use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Seniority tier a job is hiring for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Entry,
    #[default]
    Mid,
    Senior,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Entry => "entry",
            ExperienceLevel::Mid => "mid",
            ExperienceLevel::Senior => "senior",
        }
    }

    /// Years-of-experience window a candidate is expected to fall in.
    pub fn expected_years(&self) -> (f32, f32) {
        match self {
            ExperienceLevel::Entry => (0.0, 2.0),
            ExperienceLevel::Mid => (2.0, 6.0),
            ExperienceLevel::Senior => (6.0, f32::MAX),
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperienceLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(ExperienceLevel::Entry),
            "mid" => Ok(ExperienceLevel::Mid),
            "senior" => Ok(ExperienceLevel::Senior),
            other => Err(anyhow::anyhow!("unknown experience level '{other}'")),
        }
    }
}

/// Boolean hiring preferences attached to a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPreferences {
    #[serde(default)]
    pub remote_ok: bool,
    #[serde(default)]
    pub requires_degree: bool,
    #[serde(default)]
    pub visa_sponsorship: bool,
}

/// A job opening. `likes` / `dislikes` accumulate recruiter feedback and are
/// fed to the re-scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub experience_level: ExperienceLevel,
    pub preferences: JobPreferences,
    pub likes: Vec<String>,
    pub dislikes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(
        title: String,
        description: String,
        required_skills: Vec<String>,
        experience_level: ExperienceLevel,
        preferences: JobPreferences,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            required_skills,
            experience_level,
            preferences,
            likes: Vec::new(),
            dislikes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_feedback(&self) -> bool {
        !self.likes.is_empty() || !self.dislikes.is_empty()
    }

    /// Appends trimmed notes, dropping blank ones.
    pub fn append_feedback(&mut self, likes: &[String], dislikes: &[String]) {
        let clean = |notes: &[String]| -> Vec<String> {
            notes
                .iter()
                .map(|n| n.trim())
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect()
        };
        self.likes.extend(clean(likes));
        self.dislikes.extend(clean(dislikes));
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub experience_level: String,
    pub remote_ok: bool,
    pub requires_degree: bool,
    pub visa_sponsorship: bool,
    pub likes: Vec<String>,
    pub dislikes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = anyhow::Error;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: row.id,
            title: row.title,
            description: row.description,
            required_skills: row.required_skills,
            experience_level: row.experience_level.parse()?,
            preferences: JobPreferences {
                remote_ok: row.remote_ok,
                requires_degree: row.requires_degree,
                visa_sponsorship: row.visa_sponsorship,
            },
            likes: row.likes,
            dislikes: row.dislikes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_feedback_keeps_earlier_notes() {
        let mut job = Job::new(
            "Analyst".to_string(),
            String::new(),
            vec![],
            ExperienceLevel::Entry,
            JobPreferences::default(),
        );
        job.append_feedback(&["sql".to_string()], &[]);
        job.append_feedback(&[" dashboards ".to_string(), String::new()], &["no excel".to_string()]);
        assert_eq!(job.likes, vec!["sql".to_string(), "dashboards".to_string()]);
        assert_eq!(job.dislikes, vec!["no excel".to_string()]);
    }

    #[test]
    fn test_experience_level_round_trips_through_str() {
        for level in [
            ExperienceLevel::Entry,
            ExperienceLevel::Mid,
            ExperienceLevel::Senior,
        ] {
            assert_eq!(level.as_str().parse::<ExperienceLevel>().unwrap(), level);
        }
    }

    #[test]
    fn test_unknown_experience_level_is_rejected() {
        assert!("principal".parse::<ExperienceLevel>().is_err());
    }

    #[test]
    fn test_job_row_converts_to_job() {
        let now = Utc::now();
        let row = JobRow {
            id: Uuid::new_v4(),
            title: "Backend Engineer".to_string(),
            description: "Rust services".to_string(),
            required_skills: vec!["rust".to_string()],
            experience_level: "senior".to_string(),
            remote_ok: true,
            requires_degree: false,
            visa_sponsorship: true,
            likes: vec!["open source work".to_string()],
            dislikes: vec![],
            created_at: now,
            updated_at: now,
        };
        let job = Job::try_from(row).unwrap();
        assert_eq!(job.experience_level, ExperienceLevel::Senior);
        assert!(job.preferences.remote_ok);
        assert!(job.preferences.visa_sponsorship);
        assert!(job.has_feedback());
    }

    #[test]
    fn test_new_job_has_no_feedback() {
        let job = Job::new(
            "Data Engineer".to_string(),
            String::new(),
            vec![],
            ExperienceLevel::default(),
            JobPreferences::default(),
        );
        assert!(!job.has_feedback());
        assert_eq!(job.experience_level, ExperienceLevel::Mid);
    }
}
