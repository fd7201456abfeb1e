//! # edgequake-pdf-translate
//!
//! Translate PDF documents page by page through a language model.
//!
//! A caller submits a document and a language pair and gets a job back
//! immediately. The job runs in the background: page text is extracted with
//! pdfium, each page is translated by a model, and the translations are set
//! into a new, plain-text PDF. The caller polls or awaits the job, may
//! cancel it at any point, and downloads the result once it completes.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Queue      wait for one of `max_concurrent_jobs` slots
//!  ├─ 2. Extract    resolve the page window, read page text (spawn_blocking)
//!  ├─ 3. Translate  concurrent model calls, `translation_concurrency` at a time
//!  ├─ 4. Render     sanitise, wrap, retry-or-skip, write with lopdf
//!  └─ 5. Publish    atomic write to storage/output/{id}.pdf
//! ```
//!
//! A page the model could not translate is replaced by a short diagnostic in
//! the target language; a page whose text cannot be laid out is left blank
//! and counted in `skipped_pages`. Neither fails the job.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf_translate::{JobRequest, JobStatus, ServiceConfig, TranslationService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Backend from TRANSLATION_LLM_BASE_URL / TRANSLATION_LLM_MODEL_NAME
//!     let service = TranslationService::with_defaults(ServiceConfig::default())?;
//!
//!     let request = JobRequest::new("en", "pt-BR").pages(Some(1), Some(5));
//!     let job = service.create_job(&std::fs::read("report.pdf")?, request).await?;
//!
//!     let job = service.wait_until_finished(&job.id).await?;
//!     if job.status == JobStatus::Completed {
//!         std::fs::write("report.pt-BR.pdf", service.download_result(&job.id).await?)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-translate` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf-translate = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

mod cancel;
pub mod config;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod registry;
pub mod service;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OllamaConfig, PageGeometry, ServiceConfig, ServiceConfigBuilder};
pub use error::{JobError, JobErrorKind, TranslateError};
pub use job::{Job, JobId, JobRequest, JobStage, JobStatus, TranslationStrategy};
pub use pipeline::extract::{PdfiumExtractor, TextExtractor, TranslationUnit};
pub use pipeline::translate::{
    BackendReply, OllamaChatBackend, ProviderBackend, TranslationBackend, TranslationClient,
};
pub use pipeline::window::PageWindow;
pub use service::TranslationService;
