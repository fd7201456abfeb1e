//! Job orchestration: the state machine that drives one job to a terminal state.
//!
//! ```text
//! queued ──▶ extract_text ──▶ translate ──▶ render_pdf ──▶ completed
//!    └──────────────┴──────────────┴─────────────┴──▶ cancelled | failed
//! ```
//!
//! ## Cancellation
//!
//! Cancellation is cooperative. The registry flips the job to `cancelled`
//! and trips its token; the pipeline notices at its next checkpoint and
//! returns without touching the record again:
//!
//! * while waiting for a job slot;
//! * after extraction, before rendering and before publishing the output;
//! * in every page task: on entry, after the concurrency permit, and after
//!   the backend call returns.
//!
//! In-flight backend calls are not aborted; their results are dropped. A
//! cancelled job never leaves an output document behind.
//!
//! ## Concurrency
//!
//! A global semaphore caps how many jobs run their pipeline at once. Inside
//! a job, one future per page is polled by `join_all` on the job's own task,
//! gated by a per-job semaphore, so at most `translation_concurrency`
//! backend calls are outstanding. Results land in their page slot by index,
//! so completion order never affects the output.

use crate::config::ServiceConfig;
use crate::error::{JobError, TranslateError};
use crate::job::{JobRequest, JobStage, JobStatus};
use crate::pipeline::extract::{TextExtractor, TranslationUnit};
use crate::pipeline::render::{render_document, RenderSettings};
use crate::pipeline::translate::{TranslationBackend, TranslationClient};
use crate::registry::JobHandle;
use crate::storage::JobStorage;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Runs job pipelines. Shared by every job of a service.
pub struct Orchestrator {
    config: ServiceConfig,
    storage: JobStorage,
    extractor: Arc<dyn TextExtractor>,
    client: TranslationClient,
    job_slots: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(
        config: ServiceConfig,
        extractor: Arc<dyn TextExtractor>,
        backend: Arc<dyn TranslationBackend>,
    ) -> Self {
        let storage = JobStorage::new(config.storage_dir.clone());
        let job_slots = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        Self {
            config,
            storage,
            extractor,
            client: TranslationClient::new(backend),
            job_slots,
        }
    }

    pub fn storage(&self) -> &JobStorage {
        &self.storage
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Drive the job owned by `handle` to a terminal state.
    ///
    /// Fatal errors are recorded on the job as a [`JobError`]; nothing is
    /// returned to the caller.
    pub async fn run(&self, handle: JobHandle, request: JobRequest) {
        let start = Instant::now();
        if let Err(e) = self.drive(&handle, &request).await {
            handle.fail(JobError::from(&e));
        }
        let job = handle.snapshot();
        info!(
            "Job {}: finished as {} after {:.1}s ({}/{} pages)",
            job.id,
            job.status,
            start.elapsed().as_secs_f64(),
            job.translated_elements,
            job.total_elements
        );
    }

    async fn drive(&self, handle: &JobHandle, request: &JobRequest) -> Result<(), TranslateError> {
        let id = handle.id();

        // ── Step 1: Wait for a job slot ──────────────────────────────────────
        let _slot = tokio::select! {
            permit = Arc::clone(&self.job_slots).acquire_owned() => permit
                .map_err(|e| TranslateError::Internal(format!("job slots closed: {e}")))?,
            _ = handle.cancelled() => {
                info!("Job {}: cancelled while queued", id);
                return Ok(());
            }
        };
        if handle.is_cancelled() {
            return Ok(());
        }
        handle.start();
        info!(
            "Job {}: started ({} → {})",
            id, request.source_lang, request.target_lang
        );

        // ── Step 2: Extract page text ────────────────────────────────────────
        let units = self.extract(handle, request).await?;
        handle.set_total(units.len());
        if handle.is_cancelled() {
            return Ok(());
        }

        if units.is_empty() {
            info!("Job {}: no extractable text, output is the original", id);
            self.storage.copy_original_to_output(&id).await?;
            self.finish(handle, 0).await?;
            return Ok(());
        }

        // ── Step 3: Translate pages ──────────────────────────────────────────
        handle.set_stage(JobStage::Translate);
        let pages = self.translate_units(handle, &units, request).await;
        if handle.is_cancelled() {
            return Ok(());
        }

        // ── Step 4: Render translated document ───────────────────────────────
        handle.set_stage(JobStage::RenderPdf);
        let settings = RenderSettings::from(&self.config);
        let rendered = tokio::task::spawn_blocking(move || render_document(&pages, &settings))
            .await
            .map_err(|e| TranslateError::Internal(format!("render task panicked: {e}")))??;
        if handle.is_cancelled() {
            return Ok(());
        }

        // ── Step 5: Publish ──────────────────────────────────────────────────
        self.storage.write_output(&id, &rendered.bytes).await?;
        self.finish(handle, rendered.skipped_pages()).await
    }

    async fn extract(
        &self,
        handle: &JobHandle,
        request: &JobRequest,
    ) -> Result<Vec<TranslationUnit>, TranslateError> {
        let path = self.storage.original_path(&handle.id());
        let extractor = Arc::clone(&self.extractor);
        let (start_page, end_page) = (request.start_page, request.end_page);
        let max_window = self.config.max_window_pages;

        tokio::task::spawn_blocking(move || {
            extractor.extract_window(&path, start_page, end_page, max_window)
        })
        .await
        .map_err(|e| TranslateError::Internal(format!("extraction task panicked: {e}")))?
    }

    /// Translate every unit, returning page texts ordered by position.
    ///
    /// Pages skipped because of cancellation are left empty; the caller
    /// checks the token before using the result.
    async fn translate_units(
        &self,
        handle: &JobHandle,
        units: &[TranslationUnit],
        request: &JobRequest,
    ) -> Vec<String> {
        let permits = Semaphore::new(self.config.translation_concurrency.max(1));
        let total = units.len();

        let tasks = units.iter().map(|unit| {
            let permits = &permits;
            async move {
                if handle.is_cancelled() {
                    return None;
                }
                let _permit = permits.acquire().await.ok()?;
                if handle.is_cancelled() {
                    return None;
                }
                debug!(
                    "Job {}: translating page {} ({}/{})",
                    handle.id(),
                    unit.page_index + 1,
                    unit.position + 1,
                    total
                );
                let text = self
                    .client
                    .translate(&unit.text, &request.source_lang, &request.target_lang)
                    .await;
                if handle.is_cancelled() {
                    return None;
                }
                handle.page_translated();
                Some((unit.position, text))
            }
        });

        let mut pages = vec![String::new(); total];
        for (position, text) in join_all(tasks).await.into_iter().flatten() {
            pages[position] = text;
        }
        pages
    }

    /// Complete the job, or withdraw the output if it was cancelled meanwhile.
    async fn finish(&self, handle: &JobHandle, skipped_pages: usize) -> Result<(), TranslateError> {
        handle.set_skipped(skipped_pages);
        if !handle.complete() && handle.snapshot().status == JobStatus::Cancelled {
            debug!("Job {}: cancelled during publish, removing output", handle.id());
            self.storage.discard_output(&handle.id()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::translate::BackendReply;
    use crate::registry::JobRegistry;
    use async_trait::async_trait;
    use std::path::Path;

    struct NoPages;

    impl TextExtractor for NoPages {
        fn extract_window(
            &self,
            _pdf_path: &Path,
            _start_page: Option<i64>,
            _end_page: Option<i64>,
            _max_window: usize,
        ) -> Result<Vec<TranslationUnit>, TranslateError> {
            Ok(Vec::new())
        }
    }

    struct Silent;

    #[async_trait]
    impl TranslationBackend for Silent {
        async fn complete(&self, _prompt: &str) -> BackendReply {
            BackendReply::Text(String::new())
        }

        fn name(&self) -> String {
            "silent".into()
        }
    }

    fn orchestrator(dir: &Path) -> Orchestrator {
        let config = ServiceConfig::builder().storage_dir(dir).build().unwrap();
        Orchestrator::new(config, Arc::new(NoPages), Arc::new(Silent))
    }

    #[tokio::test]
    async fn finish_withdraws_output_of_a_job_cancelled_while_publishing() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let registry = JobRegistry::new();
        let handle = registry.create("en", "pt-BR");
        let id = handle.id();
        handle.start();
        handle.set_stage(JobStage::RenderPdf);

        orch.storage().write_output(&id, b"%PDF-1.5\n").await.unwrap();
        registry.cancel(&id).unwrap();
        orch.finish(&handle, 0).await.unwrap();

        assert_eq!(handle.snapshot().status, JobStatus::Cancelled);
        let err = orch.storage().read_output(&id).await.unwrap_err();
        assert!(matches!(err, TranslateError::OutputNotFound { .. }));
    }

    #[tokio::test]
    async fn finish_keeps_output_of_a_live_job() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let registry = JobRegistry::new();
        let handle = registry.create("en", "pt-BR");
        let id = handle.id();
        handle.start();

        orch.storage().write_output(&id, b"%PDF-1.5\n").await.unwrap();
        orch.finish(&handle, 2).await.unwrap();

        let job = handle.snapshot();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.skipped_pages, 2);
        assert_eq!(orch.storage().read_output(&id).await.unwrap(), b"%PDF-1.5\n");
    }
}
