//! Feedback loop: re-score a job's pending candidates, then rerank once.
//!
//! Flow: begin_rescore (guard) → snapshot job + pending → release the store →
//!       await the re-scorer → re-acquire → apply → on_buckets_changed → finish.
//!
//! The store lock is never held across the re-scorer call, so swipes keep
//! landing while a pass is out. A second trigger for the same job while one
//! is running is dropped. A failed pass leaves buckets and ranking untouched.
//! A pass that panics or is cancelled mid-call still clears the job's
//! reprocessing flag.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::Candidate;
use crate::models::job::Job;
use crate::models::swipe::SwipeDecision;
use crate::ranking::store::ReviewStore;
use crate::screening::rescoring::Rescorer;

#[derive(Debug, Clone, PartialEq)]
pub enum RescoreOutcome {
    /// New assessments were written and the job was reranked.
    Applied { rescored: usize },
    /// Another pass for this job was still running; this trigger was dropped.
    AlreadyRunning,
    /// The job had no pending candidates.
    NothingPending,
    /// The job does not exist (or was deleted mid-pass).
    JobMissing,
    /// The re-scorer failed; nothing changed.
    Failed { reason: String },
}

/// What a pass did, plus the candidates whose assessment changed so the
/// caller can write them through to the database.
#[derive(Debug)]
pub struct RescoreRun {
    pub outcome: RescoreOutcome,
    pub updated: Vec<Candidate>,
}

impl RescoreRun {
    fn without_changes(outcome: RescoreOutcome) -> Self {
        Self {
            outcome,
            updated: Vec::new(),
        }
    }
}

/// Turns a swipe note into feedback: a like for a positive decision, a
/// dislike for a rejection. Blank notes carry nothing.
pub fn note_feedback(decision: SwipeDecision, note: Option<&str>) -> Option<(Vec<String>, Vec<String>)> {
    let note = note.map(str::trim).filter(|n| !n.is_empty())?.to_string();
    if decision.is_positive() {
        Some((vec![note], Vec::new()))
    } else {
        Some((Vec::new(), vec![note]))
    }
}

/// Appends feedback to a job: `persist` writes the updated job first, and the
/// store only changes once that write succeeded.
pub async fn save_feedback<F, Fut>(
    store: &mut ReviewStore,
    job_id: Uuid,
    likes: &[String],
    dislikes: &[String],
    persist: F,
) -> Result<Job, AppError>
where
    F: FnOnce(Job) -> Fut,
    Fut: Future<Output = Result<Job, AppError>>,
{
    let draft = store.feedback_draft(job_id, likes, dislikes)?;
    let saved = persist(draft).await?;
    store.commit_feedback(&saved)?;
    Ok(saved)
}

/// Clears a job's reprocessing flag when a pass is dropped before it could
/// re-acquire the store.
struct ReprocessingGuard {
    store: Arc<Mutex<ReviewStore>>,
    job_id: Uuid,
    armed: bool,
}

impl ReprocessingGuard {
    fn new(store: &Arc<Mutex<ReviewStore>>, job_id: Uuid) -> Self {
        Self {
            store: Arc::clone(store),
            job_id,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ReprocessingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let job_id = self.job_id;
        warn!("Re-score for job {job_id} was abandoned, clearing reprocessing flag");

        if let Ok(mut store) = self.store.try_lock() {
            store.finish_rescore(job_id);
            return;
        }
        let store = Arc::clone(&self.store);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    store.lock().await.finish_rescore(job_id);
                });
            }
            Err(_) => error!("No runtime to clear reprocessing flag for job {job_id}"),
        }
    }
}

pub async fn rescore_and_rerank(
    store: &Arc<Mutex<ReviewStore>>,
    rescorer: &dyn Rescorer,
    job_id: Uuid,
) -> RescoreRun {
    let (job, pending) = {
        let mut guard = store.lock().await;
        if !guard.begin_rescore(job_id) {
            info!("Re-score for job {job_id} already running, dropping trigger");
            return RescoreRun::without_changes(RescoreOutcome::AlreadyRunning);
        }
        match guard.rescore_batch(job_id) {
            None => {
                guard.finish_rescore(job_id);
                return RescoreRun::without_changes(RescoreOutcome::JobMissing);
            }
            Some((_, pending)) if pending.is_empty() => {
                guard.finish_rescore(job_id);
                return RescoreRun::without_changes(RescoreOutcome::NothingPending);
            }
            Some(batch) => batch,
        }
    };
    let in_flight = ReprocessingGuard::new(store, job_id);

    info!(
        "Re-scoring {} pending candidates for job {job_id} via {}",
        pending.len(),
        rescorer.backend()
    );
    let started = Instant::now();
    let result = rescorer.rescore(&job, &pending).await;

    let mut guard = store.lock().await;
    in_flight.disarm();
    guard.finish_rescore(job_id);

    let updates = match result {
        Ok(updates) => updates,
        Err(e) => {
            error!("Re-score for job {job_id} failed, keeping previous buckets: {e}");
            return RescoreRun::without_changes(RescoreOutcome::Failed {
                reason: e.to_string(),
            });
        }
    };

    if guard.job(job_id).is_none() {
        info!("Job {job_id} was deleted during re-scoring, discarding results");
        return RescoreRun::without_changes(RescoreOutcome::JobMissing);
    }

    let updated = guard.apply_rescore(updates);
    guard.on_buckets_changed(job_id);
    info!(
        "Re-scored {} candidates for job {job_id} in {}ms",
        updated.len(),
        started.elapsed().as_millis()
    );

    RescoreRun {
        outcome: RescoreOutcome::Applied {
            rescored: updated.len(),
        },
        updated,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::models::candidate::{Assessment, Bucket, CandidateStatus};
    use crate::models::job::{ExperienceLevel, JobPreferences};
    use crate::screening::rescoring::RescoredCandidate;

    /// Promotes every candidate to one fixed bucket.
    struct FixedRescorer(Bucket);

    #[async_trait]
    impl Rescorer for FixedRescorer {
        async fn rescore(
            &self,
            _job: &Job,
            candidates: &[Candidate],
        ) -> Result<Vec<RescoredCandidate>, AppError> {
            Ok(candidates
                .iter()
                .map(|c| {
                    let mut assessment = c.assessment.clone();
                    assessment.bucket = self.0;
                    assessment.summary = "rescored".to_string();
                    RescoredCandidate {
                        candidate_id: c.id,
                        assessment,
                    }
                })
                .collect())
        }

        fn backend(&self) -> &'static str {
            "fixed"
        }
    }

    struct FailingRescorer;

    #[async_trait]
    impl Rescorer for FailingRescorer {
        async fn rescore(
            &self,
            _job: &Job,
            _candidates: &[Candidate],
        ) -> Result<Vec<RescoredCandidate>, AppError> {
            Err(AppError::Llm("upstream timed out".to_string()))
        }

        fn backend(&self) -> &'static str {
            "failing"
        }
    }

    struct PanickingRescorer;

    #[async_trait]
    impl Rescorer for PanickingRescorer {
        async fn rescore(
            &self,
            _job: &Job,
            _candidates: &[Candidate],
        ) -> Result<Vec<RescoredCandidate>, AppError> {
            panic!("scorer blew up");
        }

        fn backend(&self) -> &'static str {
            "panicking"
        }
    }

    /// Blocks inside `rescore` until released, then behaves like `FixedRescorer`.
    struct GatedRescorer {
        entered: Notify,
        release: Notify,
        inner: FixedRescorer,
    }

    #[async_trait]
    impl Rescorer for GatedRescorer {
        async fn rescore(
            &self,
            job: &Job,
            candidates: &[Candidate],
        ) -> Result<Vec<RescoredCandidate>, AppError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.rescore(job, candidates).await
        }

        fn backend(&self) -> &'static str {
            "gated"
        }
    }

    fn store_with(buckets: &[Bucket]) -> (Arc<Mutex<ReviewStore>>, Uuid, Vec<Uuid>) {
        let mut store = ReviewStore::with_seed(17);
        let job = Job::new(
            "SRE".to_string(),
            String::new(),
            vec![],
            ExperienceLevel::Mid,
            JobPreferences::default(),
        );
        let job_id = job.id;
        store.insert_job(job);
        let batch: Vec<Candidate> = buckets
            .iter()
            .enumerate()
            .map(|(i, b)| Candidate::new(job_id, format!("c{i}"), Assessment::with_bucket(*b)))
            .collect();
        let ids = batch.iter().map(|c| c.id).collect();
        store.add_candidates(job_id, batch).unwrap();
        store.on_job_selected(job_id);
        (Arc::new(Mutex::new(store)), job_id, ids)
    }

    fn queue(store: &ReviewStore, job_id: Uuid) -> Vec<Uuid> {
        store
            .pending_in_order(job_id)
            .iter()
            .map(|c| c.id)
            .collect()
    }

    #[tokio::test]
    async fn test_successful_pass_applies_and_reranks() {
        let (store, job_id, ids) = store_with(&[Bucket::Poor, Bucket::Poor, Bucket::Weak]);

        let run = rescore_and_rerank(&store, &FixedRescorer(Bucket::Top), job_id).await;
        assert_eq!(run.outcome, RescoreOutcome::Applied { rescored: 3 });
        assert_eq!(run.updated.len(), 3);

        let guard = store.lock().await;
        assert!(!guard.is_reprocessing(job_id));
        for id in &ids {
            assert_eq!(guard.candidate(*id).unwrap().bucket(), Bucket::Top);
        }
        let mut order = queue(&guard, job_id);
        order.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(order, expected);
    }

    #[tokio::test]
    async fn test_failed_pass_leaves_state_untouched() {
        let (store, job_id, ids) = store_with(&[Bucket::Poor, Bucket::Strong, Bucket::Average]);
        let before = queue(&*store.lock().await, job_id);

        let run = rescore_and_rerank(&store, &FailingRescorer, job_id).await;
        assert!(matches!(run.outcome, RescoreOutcome::Failed { ref reason } if reason.contains("timed out")));
        assert!(run.updated.is_empty());

        let guard = store.lock().await;
        assert!(!guard.is_reprocessing(job_id));
        assert_eq!(queue(&guard, job_id), before);
        assert_eq!(guard.candidate(ids[0]).unwrap().bucket(), Bucket::Poor);
        assert_eq!(guard.candidate(ids[1]).unwrap().bucket(), Bucket::Strong);
    }

    #[tokio::test]
    async fn test_no_pending_candidates_is_a_noop() {
        let (store, job_id, ids) = store_with(&[Bucket::Top]);
        store
            .lock()
            .await
            .swipe(ids[0], SwipeDecision::Interested)
            .unwrap();

        let run = rescore_and_rerank(&store, &FixedRescorer(Bucket::Poor), job_id).await;
        assert_eq!(run.outcome, RescoreOutcome::NothingPending);
        assert!(!store.lock().await.is_reprocessing(job_id));
    }

    #[tokio::test]
    async fn test_unknown_job_is_reported() {
        let (store, _, _) = store_with(&[]);
        let missing = Uuid::new_v4();
        let run = rescore_and_rerank(&store, &FixedRescorer(Bucket::Top), missing).await;
        assert_eq!(run.outcome, RescoreOutcome::JobMissing);
        assert!(!store.lock().await.is_reprocessing(missing));
    }

    #[tokio::test]
    async fn test_trigger_while_running_is_dropped() {
        let (store, job_id, ids) = store_with(&[Bucket::Poor, Bucket::Poor, Bucket::Poor]);
        let gated = Arc::new(GatedRescorer {
            entered: Notify::new(),
            release: Notify::new(),
            inner: FixedRescorer(Bucket::Top),
        });

        let first = {
            let store = Arc::clone(&store);
            let gated = Arc::clone(&gated);
            tokio::spawn(async move { rescore_and_rerank(&store, gated.as_ref(), job_id).await })
        };
        gated.entered.notified().await;

        // Store is free while the pass is out: reads and swipes go through.
        {
            let mut guard = store.lock().await;
            assert!(guard.is_reprocessing(job_id));
            guard.swipe(ids[0], SwipeDecision::Rejected).unwrap();
        }

        let second = rescore_and_rerank(&store, &FixedRescorer(Bucket::Weak), job_id).await;
        assert_eq!(second.outcome, RescoreOutcome::AlreadyRunning);

        gated.release.notify_one();
        let first = first.await.unwrap();
        assert_eq!(first.outcome, RescoreOutcome::Applied { rescored: 3 });

        let guard = store.lock().await;
        assert!(!guard.is_reprocessing(job_id));
        // The swipe made during the pass survives it.
        let swiped = guard.candidate(ids[0]).unwrap();
        assert_eq!(swiped.status, CandidateStatus::Rejected);
        assert_eq!(swiped.bucket(), Bucket::Top);
        let order = queue(&guard, job_id);
        assert_eq!(order.len(), 2);
        assert!(!order.contains(&ids[0]));
    }

    #[tokio::test]
    async fn test_job_deleted_mid_pass_discards_results() {
        let (store, job_id, _) = store_with(&[Bucket::Average]);
        let gated = Arc::new(GatedRescorer {
            entered: Notify::new(),
            release: Notify::new(),
            inner: FixedRescorer(Bucket::Top),
        });

        let pass = {
            let store = Arc::clone(&store);
            let gated = Arc::clone(&gated);
            tokio::spawn(async move { rescore_and_rerank(&store, gated.as_ref(), job_id).await })
        };
        gated.entered.notified().await;
        store.lock().await.remove_job(job_id);
        gated.release.notify_one();

        let run = pass.await.unwrap();
        assert_eq!(run.outcome, RescoreOutcome::JobMissing);
        assert!(!store.lock().await.has_ranking(job_id));
    }

    #[tokio::test]
    async fn test_panicking_pass_clears_flag_for_next_trigger() {
        let (store, job_id, ids) = store_with(&[Bucket::Poor, Bucket::Weak]);

        let pass = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { rescore_and_rerank(&store, &PanickingRescorer, job_id).await })
        };
        assert!(pass.await.unwrap_err().is_panic());
        assert!(!store.lock().await.is_reprocessing(job_id));

        let run = rescore_and_rerank(&store, &FixedRescorer(Bucket::Strong), job_id).await;
        assert_eq!(run.outcome, RescoreOutcome::Applied { rescored: 2 });
        assert_eq!(store.lock().await.candidate(ids[0]).unwrap().bucket(), Bucket::Strong);
    }

    #[tokio::test]
    async fn test_cancelled_pass_clears_flag() {
        let (store, job_id, _) = store_with(&[Bucket::Average]);
        let gated = Arc::new(GatedRescorer {
            entered: Notify::new(),
            release: Notify::new(),
            inner: FixedRescorer(Bucket::Top),
        });

        let pass = {
            let store = Arc::clone(&store);
            let gated = Arc::clone(&gated);
            tokio::spawn(async move { rescore_and_rerank(&store, gated.as_ref(), job_id).await })
        };
        gated.entered.notified().await;
        assert!(store.lock().await.is_reprocessing(job_id));

        pass.abort();
        assert!(pass.await.unwrap_err().is_cancelled());
        assert!(!store.lock().await.is_reprocessing(job_id));
    }

    #[test]
    fn test_note_feedback_follows_decision() {
        assert_eq!(
            note_feedback(SwipeDecision::Interested, Some(" led a migration ")),
            Some((vec!["led a migration".to_string()], vec![]))
        );
        assert_eq!(
            note_feedback(SwipeDecision::Starred, Some("great OSS work")),
            Some((vec!["great OSS work".to_string()], vec![]))
        );
        assert_eq!(
            note_feedback(SwipeDecision::Rejected, Some("no cloud experience")),
            Some((vec![], vec!["no cloud experience".to_string()]))
        );
        assert_eq!(note_feedback(SwipeDecision::Rejected, Some("   ")), None);
        assert_eq!(note_feedback(SwipeDecision::Interested, None), None);
    }

    #[tokio::test]
    async fn test_failed_feedback_write_leaves_job_unchanged() {
        let (store, job_id, _) = store_with(&[Bucket::Average]);
        let mut guard = store.lock().await;

        let err = save_feedback(&mut guard, job_id, &["kafka".to_string()], &[], |_job| async {
            Err(AppError::Internal(anyhow::anyhow!("connection reset")))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert!(!guard.job(job_id).unwrap().has_feedback());
    }

    #[tokio::test]
    async fn test_feedback_is_committed_after_write() {
        let (store, job_id, _) = store_with(&[Bucket::Average]);
        let mut guard = store.lock().await;

        let mut written = None;
        let saved = save_feedback(&mut guard, job_id, &[], &["job hopping".to_string()], |job| {
            written = Some(job.clone());
            async move { Ok(job) }
        })
        .await
        .unwrap();

        assert_eq!(written.unwrap().dislikes, vec!["job hopping".to_string()]);
        let job = guard.job(job_id).unwrap();
        assert_eq!(job.dislikes, saved.dislikes);
        assert!(job.likes.is_empty());
    }
}
