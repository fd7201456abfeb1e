//! Error types for the edgequake-pdf-translate library.
//!
//! Two layers of error reflect two audiences:
//!
//! * [`TranslateError`] — **Fatal** for the operation that returned it: an
//!   unknown job id, an unreadable PDF, a storage fault. Returned as
//!   `Err(TranslateError)` from the service and pipeline functions.
//!
//! * [`JobError`] — the **recorded** form of a fatal pipeline error. When the
//!   orchestrator hits a `TranslateError` it stores a `JobError` (a
//!   machine-readable [`JobErrorKind`] plus a human-readable detail) on the
//!   job record, and the job becomes `failed`. Callers polling the job see
//!   the failure only through that field.
//!
//! Per-page faults never reach either type. A translation backend fault is
//! downgraded to diagnostic text by [`crate::pipeline::translate`], and a
//! layout fault ([`crate::pipeline::layout::LayoutError`]) is absorbed by the
//! render fallback in [`crate::pipeline::render`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf-translate library.
#[derive(Debug, Error)]
pub enum TranslateError {
    // ── Lookup errors ─────────────────────────────────────────────────────
    /// No job with this id was ever registered.
    #[error("Job '{id}' not found")]
    JobNotFound { id: String },

    /// The job exists (or existed) but has no translated document yet.
    #[error("Translated PDF for job '{id}' not found")]
    OutputNotFound { id: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password; uploads are never decrypted.
    #[error("PDF '{path}' is encrypted and requires a password")]
    PasswordRequired { path: PathBuf },

    /// pdfium could not produce the text layer of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    ExtractionFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH (or --pdfium-lib-path) to the directory holding libpdfium."
    )]
    PdfiumBindingFailed(String),

    /// Writing the translated document failed at the PDF-object level.
    #[error("Failed to build translated PDF: {0}")]
    RenderFailed(String),

    // ── Storage errors ────────────────────────────────────────────────────
    /// Reading or writing a job's original/output file failed.
    #[error("Storage I/O failed for '{path}': {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Backend / config errors ───────────────────────────────────────────
    /// The configured LLM provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (panicked blocking task, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TranslateError {
    /// `true` for the two lookup failures a front-end maps to "404".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TranslateError::JobNotFound { .. } | TranslateError::OutputNotFound { .. }
        )
    }

    /// Machine-readable classification used when the error is recorded on a job.
    pub fn kind(&self) -> JobErrorKind {
        match self {
            TranslateError::JobNotFound { .. } | TranslateError::OutputNotFound { .. } => {
                JobErrorKind::NotFound
            }
            TranslateError::CorruptPdf { .. }
            | TranslateError::PasswordRequired { .. }
            | TranslateError::ExtractionFailed { .. }
            | TranslateError::PdfiumBindingFailed(_) => JobErrorKind::Extraction,
            TranslateError::RenderFailed(_) => JobErrorKind::RenderLayout,
            TranslateError::Storage { .. } => JobErrorKind::Storage,
            TranslateError::ProviderNotConfigured { .. } => JobErrorKind::TranslationBackend,
            TranslateError::InvalidConfig(_) | TranslateError::Internal(_) => {
                JobErrorKind::Internal
            }
        }
    }
}

/// Classification of a recorded job failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobErrorKind {
    NotFound,
    TranslationBackend,
    RenderLayout,
    Extraction,
    Storage,
    Internal,
}

impl fmt::Display for JobErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobErrorKind::NotFound => "not_found",
            JobErrorKind::TranslationBackend => "translation_backend",
            JobErrorKind::RenderLayout => "render_layout",
            JobErrorKind::Extraction => "extraction",
            JobErrorKind::Storage => "storage",
            JobErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// The failure stored on a `failed` job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: JobErrorKind,
    pub detail: String,
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl From<&TranslateError> for JobError {
    fn from(e: &TranslateError) -> Self {
        JobError {
            kind: e.kind(),
            detail: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants_are_flagged() {
        assert!(TranslateError::JobNotFound { id: "x".into() }.is_not_found());
        assert!(TranslateError::OutputNotFound { id: "x".into() }.is_not_found());
        assert!(!TranslateError::Internal("boom".into()).is_not_found());
    }

    #[test]
    fn extraction_errors_classify_as_extraction() {
        let e = TranslateError::ExtractionFailed {
            page: 3,
            detail: "no text layer".into(),
        };
        assert_eq!(e.kind(), JobErrorKind::Extraction);
        assert!(e.to_string().contains("page 3"));
    }

    #[test]
    fn job_error_keeps_kind_and_detail() {
        let e = TranslateError::Storage {
            path: PathBuf::from("/tmp/out.pdf"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        let recorded = JobError::from(&e);
        assert_eq!(recorded.kind, JobErrorKind::Storage);
        assert!(recorded.detail.contains("disk full"), "got: {}", recorded.detail);
        assert!(recorded.to_string().starts_with("storage: "));
    }

    #[test]
    fn job_error_kind_serialises_snake_case() {
        let json = serde_json::to_string(&JobErrorKind::RenderLayout).unwrap();
        assert_eq!(json, "\"render_layout\"");
    }
}
