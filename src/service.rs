//! The public face of the crate: submit, poll, cancel, download.

use crate::config::ServiceConfig;
use crate::error::{JobError, TranslateError};
use crate::job::{Job, JobId, JobRequest};
use crate::orchestrator::Orchestrator;
use crate::pipeline::extract::{PdfiumExtractor, TextExtractor};
use crate::pipeline::translate::{OllamaChatBackend, TranslationBackend};
use crate::registry::JobRegistry;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Translation job service.
///
/// Each submitted job runs on its own tokio task; every method here returns
/// immediately with a snapshot, except [`download_result`] (file read) and
/// [`wait_until_finished`].
///
/// [`download_result`]: TranslationService::download_result
/// [`wait_until_finished`]: TranslationService::wait_until_finished
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf_translate::{JobRequest, ServiceConfig, TranslationService};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = TranslationService::with_defaults(ServiceConfig::default())?;
///     let bytes = std::fs::read("paper.pdf")?;
///     let job = service.create_job(&bytes, JobRequest::new("en", "pt-BR")).await?;
///     let done = service.wait_until_finished(&job.id).await?;
///     println!("{} ({}/{})", done.status, done.translated_elements, done.total_elements);
///     std::fs::write("paper.pt-BR.pdf", service.download_result(&job.id).await?)?;
///     Ok(())
/// }
/// ```
pub struct TranslationService {
    registry: Arc<JobRegistry>,
    orchestrator: Arc<Orchestrator>,
}

impl TranslationService {
    pub fn new(
        config: ServiceConfig,
        extractor: Arc<dyn TextExtractor>,
        backend: Arc<dyn TranslationBackend>,
    ) -> Self {
        Self {
            registry: Arc::new(JobRegistry::new()),
            orchestrator: Arc::new(Orchestrator::new(config, extractor, backend)),
        }
    }

    /// pdfium extraction plus the `/api/chat` backend configured from the
    /// `TRANSLATION_LLM_*` environment variables.
    pub fn with_defaults(config: ServiceConfig) -> Result<Self, TranslateError> {
        let backend = OllamaChatBackend::from_env()?;
        Ok(Self::new(
            config,
            Arc::new(PdfiumExtractor::new()),
            Arc::new(backend),
        ))
    }

    pub fn config(&self) -> &ServiceConfig {
        self.orchestrator.config()
    }

    /// Store the upload, register a `pending` job and start its pipeline.
    ///
    /// If the upload cannot be stored the job is recorded as `failed` and the
    /// storage error is returned.
    pub async fn create_job(&self, file_bytes: &[u8], request: JobRequest) -> Result<Job, TranslateError> {
        let handle = self
            .registry
            .create(request.source_lang.clone(), request.target_lang.clone());
        let id = handle.id();

        if let Err(e) = self.orchestrator.storage().save_original(&id, file_bytes).await {
            handle.fail(JobError::from(&e));
            return Err(e);
        }

        let snapshot = handle.snapshot();
        info!(
            "Job {}: accepted ({} bytes, {} → {}, pages {:?}..{:?})",
            id,
            file_bytes.len(),
            request.source_lang,
            request.target_lang,
            request.start_page,
            request.end_page
        );

        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move {
            orchestrator.run(handle, request).await;
        });

        Ok(snapshot)
    }

    pub fn get_job(&self, id: &JobId) -> Result<Job, TranslateError> {
        self.registry.get(id)
    }

    /// Request cancellation. Idempotent; a finished job is returned unchanged.
    pub fn cancel_job(&self, id: &JobId) -> Result<Job, TranslateError> {
        self.registry.cancel(id)
    }

    /// Bytes of the translated document.
    pub async fn download_result(&self, id: &JobId) -> Result<Vec<u8>, TranslateError> {
        self.orchestrator.storage().read_output(id).await
    }

    /// Resolve once the job is `completed`, `failed` or `cancelled`.
    pub async fn wait_until_finished(&self, id: &JobId) -> Result<Job, TranslateError> {
        self.registry.wait_until_finished(id).await
    }

    /// Observe every change to a job's record.
    pub fn subscribe(&self, id: &JobId) -> Result<watch::Receiver<Job>, TranslateError> {
        self.registry.subscribe(id)
    }
}
