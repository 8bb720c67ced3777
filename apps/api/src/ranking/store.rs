//! ReviewStore: the single owner of jobs, candidates, the swipe log and the
//! derived review ordering.
//!
//! Every mutation goes through `&mut self`, so whoever holds the store applies
//! one operation completely before the next begins. In the server the store
//! sits behind one mutex in `AppState`.
//!
//! Rankings are never persisted. They are recomputed from scratch on the
//! events listed on each `on_*` hook, and everything read from them is
//! filtered at read time: swiped, deleted or moved candidates simply stop
//! showing up without the sequence itself being touched.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{Candidate, CandidateStatus};
use crate::models::job::Job;
use crate::models::swipe::{SwipeAction, SwipeDecision};
use crate::ranking::engine::rank_pending;
use crate::screening::rescoring::RescoredCandidate;

/// Jobs, candidates and pending orderings plus the rng that shuffles them.
pub struct ReviewStore {
    jobs: HashMap<Uuid, Job>,
    candidates: HashMap<Uuid, Candidate>,
    current_job: Option<Uuid>,
    rankings: HashMap<Uuid, Vec<Uuid>>,
    swipe_log: Vec<SwipeAction>,
    reprocessing: HashSet<Uuid>,
    rng: StdRng,
}

impl Default for ReviewStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewStore {
    /// Store whose shuffles are seeded from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Store with a deterministic shuffle sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            jobs: HashMap::new(),
            candidates: HashMap::new(),
            current_job: None,
            rankings: HashMap::new(),
            swipe_log: Vec::new(),
            reprocessing: HashSet::new(),
            rng,
        }
    }

    /// Loads persisted state. The swipe log must be oldest-first.
    /// No ranking is computed until a job is selected or queried.
    pub fn hydrate(
        &mut self,
        jobs: Vec<Job>,
        candidates: Vec<Candidate>,
        swipe_log: Vec<SwipeAction>,
    ) {
        self.jobs = jobs.into_iter().map(|j| (j.id, j)).collect();
        self.candidates = candidates.into_iter().map(|c| (c.id, c)).collect();
        self.swipe_log = swipe_log;
        self.rankings.clear();
        self.current_job = None;
        info!(
            "Review store hydrated: {} jobs, {} candidates, {} swipes",
            self.jobs.len(),
            self.candidates.len(),
            self.swipe_log.len()
        );
    }

    // ────────────────────────────────────────────────────────────────────
    // Ranking core
    // ────────────────────────────────────────────────────────────────────

    /// Replaces the ordering for `job_id` with a fresh one over its current
    /// pending candidates.
    pub fn rerank(&mut self, job_id: Uuid) {
        let order = rank_pending(self.candidates.values(), job_id, &mut self.rng);
        debug!("Reranked job {job_id}: {} pending", order.len());
        self.rankings.insert(job_id, order);
    }

    /// Pending candidates of `job_id` in ranking order. Ids that no longer
    /// resolve to a pending candidate of this job are skipped.
    pub fn pending_in_order(&self, job_id: Uuid) -> Vec<&Candidate> {
        let Some(order) = self.rankings.get(&job_id) else {
            return Vec::new();
        };
        order
            .iter()
            .filter_map(|id| self.candidates.get(id))
            .filter(|c| c.is_pending_for(job_id))
            .collect()
    }

    /// The card to show next, if any.
    pub fn next_candidate(&self, job_id: Uuid) -> Option<&Candidate> {
        self.rankings
            .get(&job_id)?
            .iter()
            .filter_map(|id| self.candidates.get(id))
            .find(|c| c.is_pending_for(job_id))
    }

    /// Called once a re-scoring pass has written new buckets.
    pub fn on_buckets_changed(&mut self, job_id: Uuid) {
        self.rerank(job_id);
    }

    pub fn on_candidates_added(&mut self, job_id: Uuid) {
        self.rerank(job_id);
    }

    /// Makes `job_id` current. Re-selecting the current job keeps its
    /// existing non-empty ordering untouched.
    pub fn on_job_selected(&mut self, job_id: Uuid) {
        let switching = self.current_job != Some(job_id);
        let has_ranking = self
            .rankings
            .get(&job_id)
            .is_some_and(|order| !order.is_empty());

        self.current_job = Some(job_id);
        if switching || !has_ranking {
            self.rerank(job_id);
        } else {
            debug!("Job {job_id} reselected, keeping existing ranking");
        }
    }

    /// Computes an ordering for `job_id` only if none exists yet.
    pub fn ensure_ranking(&mut self, job_id: Uuid) {
        if !self.rankings.contains_key(&job_id) {
            self.rerank(job_id);
        }
    }

    pub fn has_ranking(&self, job_id: Uuid) -> bool {
        self.rankings.contains_key(&job_id)
    }

    pub fn current_job(&self) -> Option<&Job> {
        self.current_job.and_then(|id| self.jobs.get(&id))
    }

    // ────────────────────────────────────────────────────────────────────
    // Jobs
    // ────────────────────────────────────────────────────────────────────

    pub fn insert_job(&mut self, job: Job) {
        self.jobs.insert(job.id, job);
    }

    pub fn job(&self, job_id: Uuid) -> Option<&Job> {
        self.jobs.get(&job_id)
    }

    /// All jobs, newest first.
    pub fn jobs(&self) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self.jobs.values().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Removes a job together with its candidates, their swipes and its
    /// ordering. Returns the removed job.
    pub fn remove_job(&mut self, job_id: Uuid) -> Option<Job> {
        let job = self.jobs.remove(&job_id)?;
        self.candidates.retain(|_, c| c.job_id != job_id);
        self.swipe_log.retain(|s| s.job_id != job_id);
        self.rankings.remove(&job_id);
        self.reprocessing.remove(&job_id);
        if self.current_job == Some(job_id) {
            self.current_job = None;
        }
        info!("Removed job {job_id} from review store");
        Some(job)
    }

    /// A copy of the job with the notes appended, for writing to the
    /// database before the store itself changes. Blank notes are ignored.
    pub fn feedback_draft(
        &self,
        job_id: Uuid,
        likes: &[String],
        dislikes: &[String],
    ) -> Result<Job, AppError> {
        let mut draft = self
            .jobs
            .get(&job_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
        draft.append_feedback(likes, dislikes);
        Ok(draft)
    }

    /// Makes a persisted draft's likes and dislikes the job's own.
    pub fn commit_feedback(&mut self, draft: &Job) -> Result<&Job, AppError> {
        let job = self
            .jobs
            .get_mut(&draft.id)
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", draft.id)))?;
        job.likes.clone_from(&draft.likes);
        job.dislikes.clone_from(&draft.dislikes);
        job.updated_at = draft.updated_at;
        Ok(&*job)
    }

    // ────────────────────────────────────────────────────────────────────
    // Candidates
    // ────────────────────────────────────────────────────────────────────

    pub fn candidate(&self, candidate_id: Uuid) -> Option<&Candidate> {
        self.candidates.get(&candidate_id)
    }

    /// Every candidate of a job regardless of status, oldest first.
    pub fn candidates_for_job(&self, job_id: Uuid) -> Vec<&Candidate> {
        let mut candidates: Vec<&Candidate> = self
            .candidates
            .values()
            .filter(|c| c.job_id == job_id)
            .collect();
        candidates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        candidates
    }

    pub fn add_candidate(&mut self, candidate: Candidate) -> Result<(), AppError> {
        let job_id = candidate.job_id;
        self.insert_candidate(candidate)?;
        self.on_candidates_added(job_id);
        Ok(())
    }

    /// Inserts a batch for one job and reranks once.
    pub fn add_candidates(
        &mut self,
        job_id: Uuid,
        candidates: Vec<Candidate>,
    ) -> Result<usize, AppError> {
        if let Some(stray) = candidates.iter().find(|c| c.job_id != job_id) {
            return Err(AppError::Validation(format!(
                "Candidate {} belongs to job {}, not {job_id}",
                stray.id, stray.job_id
            )));
        }
        let count = candidates.len();
        for candidate in candidates {
            self.insert_candidate(candidate)?;
        }
        self.on_candidates_added(job_id);
        Ok(count)
    }

    fn insert_candidate(&mut self, candidate: Candidate) -> Result<(), AppError> {
        if !self.jobs.contains_key(&candidate.job_id) {
            return Err(AppError::NotFound(format!(
                "Job {} not found",
                candidate.job_id
            )));
        }
        if self.candidates.contains_key(&candidate.id) {
            return Err(AppError::Conflict(format!(
                "Candidate {} already exists",
                candidate.id
            )));
        }
        self.candidates.insert(candidate.id, candidate);
        Ok(())
    }

    /// Removes a candidate and its swipes. The ordering keeps the stale id;
    /// it is filtered out on read.
    pub fn remove_candidate(&mut self, candidate_id: Uuid) -> Option<Candidate> {
        let removed = self.candidates.remove(&candidate_id)?;
        self.swipe_log.retain(|s| s.candidate_id != candidate_id);
        Some(removed)
    }

    // ────────────────────────────────────────────────────────────────────
    // Swipes
    // ────────────────────────────────────────────────────────────────────

    /// Records a decision on a pending candidate. The ordering is not
    /// recomputed; the candidate drops out of it on the next read.
    pub fn swipe(
        &mut self,
        candidate_id: Uuid,
        decision: SwipeDecision,
    ) -> Result<SwipeAction, AppError> {
        let candidate = self
            .candidates
            .get_mut(&candidate_id)
            .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))?;

        if candidate.status != CandidateStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Candidate {candidate_id} was already marked {}",
                candidate.status
            )));
        }

        candidate.status = decision.status();
        candidate.updated_at = Utc::now();

        let action = SwipeAction::new(candidate_id, candidate.job_id, decision);
        self.swipe_log.push(action.clone());
        Ok(action)
    }

    /// Cancels the most recent swipe across all jobs, not just the current
    /// one: the candidate goes back to pending. The returned action names the
    /// job it belonged to. AI-derived fields written since the swipe are kept.
    ///
    /// If the candidate fell out of its job's ordering in the meantime (a
    /// rerank ran after the swipe) it is put back at the front, so it is the
    /// next card either way.
    pub fn undo(&mut self) -> Option<SwipeAction> {
        let action = self.swipe_log.pop()?;

        if let Some(candidate) = self.candidates.get_mut(&action.candidate_id) {
            candidate.status = CandidateStatus::Pending;
            candidate.updated_at = Utc::now();

            if let Some(order) = self.rankings.get_mut(&candidate.job_id) {
                if !order.contains(&candidate.id) {
                    order.insert(0, candidate.id);
                }
            }
        }

        info!(
            "Undid {} on candidate {}",
            action.decision, action.candidate_id
        );
        Some(action)
    }

    pub fn last_swipe(&self) -> Option<&SwipeAction> {
        self.swipe_log.last()
    }

    pub fn swipe_count(&self) -> usize {
        self.swipe_log.len()
    }

    // ────────────────────────────────────────────────────────────────────
    // Re-scoring
    // ────────────────────────────────────────────────────────────────────

    /// Marks `job_id` as reprocessing. Returns false when a pass is already
    /// running for it, in which case the caller must not start another.
    pub fn begin_rescore(&mut self, job_id: Uuid) -> bool {
        self.reprocessing.insert(job_id)
    }

    pub fn finish_rescore(&mut self, job_id: Uuid) {
        self.reprocessing.remove(&job_id);
    }

    pub fn is_reprocessing(&self, job_id: Uuid) -> bool {
        self.reprocessing.contains(&job_id)
    }

    /// Snapshot handed to the re-scorer: the job and its pending candidates.
    pub fn rescore_batch(&self, job_id: Uuid) -> Option<(Job, Vec<Candidate>)> {
        let job = self.jobs.get(&job_id)?.clone();
        let pending = self
            .candidates_for_job(job_id)
            .into_iter()
            .filter(|c| c.status == CandidateStatus::Pending)
            .cloned()
            .collect();
        Some((job, pending))
    }

    /// Overwrites assessments in place. Updates for candidates that have
    /// since been deleted are skipped. Returns the updated candidates.
    pub fn apply_rescore(&mut self, updates: Vec<RescoredCandidate>) -> Vec<Candidate> {
        let now = Utc::now();
        let mut applied = Vec::with_capacity(updates.len());
        for update in updates {
            match self.candidates.get_mut(&update.candidate_id) {
                Some(candidate) => {
                    candidate.assessment = update.assessment;
                    candidate.updated_at = now;
                    applied.push(candidate.clone());
                }
                None => debug!(
                    "Skipping rescore for vanished candidate {}",
                    update.candidate_id
                ),
            }
        }
        applied
    }
}
