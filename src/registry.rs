//! Process-wide store of job records.
//!
//! Each record lives in a `tokio::sync::watch` channel: pollers take cheap
//! snapshots, waiters subscribe and wake on every change, and exactly one
//! [`JobHandle`] (returned by [`JobRegistry::create`], not clonable) is allowed
//! to drive the record forward. The only mutation open to everyone else is
//! [`JobRegistry::cancel`].
//!
//! Invariants enforced here rather than in the pipeline:
//!
//! * a terminal record (`completed`, `failed`, `cancelled`) is frozen; every
//!   later update is ignored;
//! * `translated_elements` never exceeds `total_elements` and never decreases;
//! * `error` is set exactly when the status is `failed`.

use crate::cancel::CancellationToken;
use crate::error::{JobError, TranslateError};
use crate::job::{Job, JobId, JobStage, JobStatus};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

struct JobSlot {
    state: watch::Sender<Job>,
    cancel: CancellationToken,
}

/// Keyed store of every job created by this process.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<JobSlot>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new `pending` job and return the handle that owns it.
    pub fn create(&self, source_lang: impl Into<String>, target_lang: impl Into<String>) -> JobHandle {
        let source_lang = source_lang.into();
        let target_lang = target_lang.into();
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);

        let mut id = JobId::new();
        while jobs.contains_key(&id) {
            id = JobId::new();
        }

        let (state, _) = watch::channel(Job::new(id, source_lang, target_lang));
        let slot = Arc::new(JobSlot {
            state,
            cancel: CancellationToken::new(),
        });
        jobs.insert(id, Arc::clone(&slot));
        debug!("Job {}: registered", id);

        JobHandle { id, slot }
    }

    /// Snapshot of the job's current record.
    pub fn get(&self, id: &JobId) -> Result<Job, TranslateError> {
        Ok(self.slot(id)?.state.borrow().clone())
    }

    /// Mark a non-terminal job cancelled and trip its cancellation token.
    ///
    /// Cancelling a finished job changes nothing and returns its snapshot.
    pub fn cancel(&self, id: &JobId) -> Result<Job, TranslateError> {
        let slot = self.slot(id)?;
        let changed = slot.state.send_if_modified(|job| {
            if job.status.is_terminal() {
                return false;
            }
            // Set before the record changes so the pipeline never sees a
            // cancelled status with an untripped token.
            slot.cancel.cancel();
            job.status = JobStatus::Cancelled;
            job.stage = JobStage::Cancelled;
            true
        });
        if changed {
            info!("Job {}: cancelled", id);
        }
        let snapshot = slot.state.borrow().clone();
        Ok(snapshot)
    }

    /// Resolve once the job reaches a terminal status.
    pub async fn wait_until_finished(&self, id: &JobId) -> Result<Job, TranslateError> {
        let mut rx = self.slot(id)?.state.subscribe();
        let job = rx
            .wait_for(|job| job.status.is_terminal())
            .await
            .map_err(|e| TranslateError::Internal(format!("job {id} record dropped: {e}")))?
            .clone();
        Ok(job)
    }

    /// Receiver that observes every change to the job's record.
    pub fn subscribe(&self, id: &JobId) -> Result<watch::Receiver<Job>, TranslateError> {
        Ok(self.slot(id)?.state.subscribe())
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, id: &JobId) -> Result<Arc<JobSlot>, TranslateError> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| TranslateError::JobNotFound { id: id.to_string() })
    }
}

/// Exclusive write access to one job record, held by the task running its pipeline.
///
/// Every update is ignored once the record is terminal, so a pipeline that
/// keeps going after a cancellation cannot resurrect the job. Dropping a
/// handle whose job is still running marks the job `failed`.
pub struct JobHandle {
    id: JobId,
    slot: Arc<JobSlot>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn snapshot(&self) -> Job {
        self.slot.state.borrow().clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.slot.cancel.is_cancelled()
    }

    /// Resolve once the job has been cancelled; pends forever otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.slot.state.subscribe();
        // The sender lives in `self.slot`, so the channel cannot close here.
        let _ = rx.wait_for(|job| job.status == JobStatus::Cancelled).await;
    }

    /// `pending` → `running`, entering the extraction stage.
    pub fn start(&self) -> bool {
        self.update(|job| {
            job.status = JobStatus::Running;
            job.stage = JobStage::ExtractText;
            true
        })
    }

    /// Move to a non-terminal pipeline stage.
    pub fn set_stage(&self, stage: JobStage) -> bool {
        if matches!(
            stage,
            JobStage::Completed | JobStage::Failed | JobStage::Cancelled
        ) {
            warn!("Job {}: terminal stage {} must go through its transition", self.id, stage);
            return false;
        }
        self.update(|job| {
            if job.stage == stage {
                return false;
            }
            job.stage = stage;
            true
        })
    }

    pub fn set_total(&self, total: usize) -> bool {
        self.update(|job| {
            job.total_elements = total;
            job.translated_elements = job.translated_elements.min(total);
            true
        })
    }

    /// Count one more translated page, never beyond `total_elements`.
    pub fn page_translated(&self) -> bool {
        self.update(|job| {
            if job.translated_elements >= job.total_elements {
                return false;
            }
            job.translated_elements += 1;
            true
        })
    }

    pub fn set_skipped(&self, skipped: usize) -> bool {
        self.update(|job| {
            job.skipped_pages = skipped;
            true
        })
    }

    pub fn complete(&self) -> bool {
        let changed = self.update(|job| {
            job.status = JobStatus::Completed;
            job.stage = JobStage::Completed;
            true
        });
        if changed {
            info!("Job {}: completed", self.id);
        }
        changed
    }

    pub fn fail(&self, error: JobError) -> bool {
        let detail = error.to_string();
        let changed = self.update(|job| {
            job.status = JobStatus::Failed;
            job.stage = JobStage::Failed;
            job.error = Some(error);
            true
        });
        if changed {
            warn!("Job {}: failed — {}", self.id, detail);
        }
        changed
    }

    fn update(&self, f: impl FnOnce(&mut Job) -> bool) -> bool {
        self.slot.state.send_if_modified(|job| {
            if job.status.is_terminal() {
                return false;
            }
            f(job)
        })
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        if !self.slot.state.borrow().status.is_terminal() {
            self.fail(JobError {
                kind: crate::error::JobErrorKind::Internal,
                detail: "pipeline exited before the job finished".into(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobErrorKind;

    #[test]
    fn unknown_id_is_not_found() {
        let registry = JobRegistry::new();
        let id: JobId = "0123456789abcdef0123456789abcdef".parse().unwrap();
        assert!(registry.get(&id).unwrap_err().is_not_found());
        assert!(registry.cancel(&id).unwrap_err().is_not_found());
    }

    #[test]
    fn new_job_is_pending_and_queued() {
        let registry = JobRegistry::new();
        let handle = registry.create("en", "pt-BR");
        let job = registry.get(&handle.id()).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.stage, JobStage::Queued);
        assert_eq!(job.source_lang, "en");
        assert_eq!(job.target_lang, "pt-BR");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn translated_count_is_bounded_by_total() {
        let registry = JobRegistry::new();
        let handle = registry.create("en", "fr");
        handle.start();
        handle.set_total(2);
        assert!(handle.page_translated());
        assert!(handle.page_translated());
        assert!(!handle.page_translated());
        let job = handle.snapshot();
        assert_eq!(job.translated_elements, 2);
        assert_eq!(job.total_elements, 2);
        handle.complete();
    }

    #[test]
    fn cancel_is_idempotent_and_freezes_the_record() {
        let registry = JobRegistry::new();
        let handle = registry.create("en", "de");
        handle.start();
        handle.set_total(3);

        let first = registry.cancel(&handle.id()).unwrap();
        let second = registry.cancel(&handle.id()).unwrap();
        assert_eq!(first.status, JobStatus::Cancelled);
        assert_eq!(second.status, JobStatus::Cancelled);
        assert_eq!(first.stage, JobStage::Cancelled);
        assert!(handle.is_cancelled());

        // The pipeline can no longer move the job.
        assert!(!handle.page_translated());
        assert!(!handle.set_stage(JobStage::RenderPdf));
        assert!(!handle.complete());
        assert_eq!(handle.snapshot().status, JobStatus::Cancelled);
    }

    #[test]
    fn cancel_after_completion_is_a_no_op() {
        let registry = JobRegistry::new();
        let handle = registry.create("en", "es");
        handle.start();
        handle.complete();
        let job = registry.cancel(&handle.id()).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn error_is_only_set_on_failure() {
        let registry = JobRegistry::new();
        let handle = registry.create("en", "it");
        handle.start();
        assert!(handle.snapshot().error.is_none());
        handle.fail(JobError {
            kind: JobErrorKind::Extraction,
            detail: "bad xref".into(),
        });
        let job = handle.snapshot();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_ref().map(|e| e.kind), Some(JobErrorKind::Extraction));
    }

    #[test]
    fn dropping_an_unfinished_handle_fails_the_job() {
        let registry = JobRegistry::new();
        let handle = registry.create("en", "ja");
        let id = handle.id();
        handle.start();
        drop(handle);
        let job = registry.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.map(|e| e.kind), Some(JobErrorKind::Internal));
    }

    #[tokio::test]
    async fn waiters_wake_on_terminal_status() {
        let registry = Arc::new(JobRegistry::new());
        let handle = registry.create("en", "pt-BR");
        let id = handle.id();

        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.wait_until_finished(&id).await })
        };

        handle.start();
        handle.set_stage(JobStage::Translate);
        handle.complete();

        let job = waiter.await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn token_is_tripped_before_cancelled_status_is_visible() {
        let registry = Arc::new(JobRegistry::new());
        for _ in 0..50 {
            let handle = Arc::new(registry.create("en", "pt-BR"));
            handle.start();
            let mut rx = registry.subscribe(&handle.id()).unwrap();

            let watcher = {
                let handle = Arc::clone(&handle);
                tokio::spawn(async move {
                    let _ = rx.wait_for(|job| job.status == JobStatus::Cancelled).await;
                    handle.is_cancelled()
                })
            };
            registry.cancel(&handle.id()).unwrap();
            assert!(watcher.await.unwrap(), "status was cancelled but the token was not");
        }
    }

    #[tokio::test]
    async fn cancelled_future_wakes_on_cancel() {
        let registry = Arc::new(JobRegistry::new());
        let handle = registry.create("en", "pt-BR");
        let id = handle.id();

        let canceller = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                registry.cancel(&id)
            })
        };

        tokio::time::timeout(std::time::Duration::from_secs(5), handle.cancelled())
            .await
            .expect("cancellation was not observed");
        assert!(canceller.await.unwrap().is_ok());
        assert!(handle.is_cancelled());
    }
}
