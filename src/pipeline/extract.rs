//! Per-page text extraction.
//!
//! Extraction sits behind the [`TextExtractor`] trait so the orchestrator
//! can be driven by a fake in tests. The production implementation,
//! [`PdfiumExtractor`], reads the text layer with pdfium. pdfium is a
//! blocking C library, so callers run `extract_window` inside
//! `tokio::task::spawn_blocking`.

use crate::error::TranslateError;
use crate::pipeline::window::resolve;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One retained page of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationUnit {
    /// Index among retained pages; the ordering key for rendering.
    pub position: usize,
    /// Zero-based page index in the source document.
    pub page_index: usize,
    /// Trimmed, non-empty page text.
    pub text: String,
}

/// Source of page text for a stored document.
pub trait TextExtractor: Send + Sync {
    /// Resolve the page window for `pdf_path` and return the non-empty pages
    /// inside it, in page order.
    fn extract_window(
        &self,
        pdf_path: &Path,
        start_page: Option<i64>,
        end_page: Option<i64>,
        max_window: usize,
    ) -> Result<Vec<TranslationUnit>, TranslateError>;
}

/// Shared window → units logic for extractor implementations.
///
/// `page_text` is called once per page index inside the resolved window and
/// may return `None` for a page without a text layer.
pub fn collect_units<F>(
    page_count: usize,
    start_page: Option<i64>,
    end_page: Option<i64>,
    max_window: usize,
    mut page_text: F,
) -> Result<Vec<TranslationUnit>, TranslateError>
where
    F: FnMut(usize) -> Result<Option<String>, TranslateError>,
{
    let Some(window) = resolve(start_page, end_page, page_count, max_window) else {
        info!("Document has no pages; nothing to extract");
        return Ok(Vec::new());
    };
    debug!(
        "Page window {}..={} of {} pages",
        window.start + 1,
        window.end + 1,
        page_count
    );

    let mut units = Vec::with_capacity(window.page_count());
    for page_index in window.indices() {
        let text = page_text(page_index)?.unwrap_or_default();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("Page {}: no text, dropped", page_index + 1);
            continue;
        }
        units.push(TranslationUnit {
            position: units.len(),
            page_index,
            text: trimmed.to_string(),
        });
    }

    info!(
        "Extracted {} non-empty pages from window of {}",
        units.len(),
        window.page_count()
    );
    Ok(units)
}

/// pdfium-backed extractor.
///
/// The library is located from, in order: the explicit `lib_path`, the
/// `PDFIUM_LIB_PATH` environment variable, then the system search path.
/// Either path may name the library file itself or its directory.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    lib_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            lib_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, TranslateError> {
        let configured = self
            .lib_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let bindings = match configured {
            Some(path) => {
                let lib = if path.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(&path)
                } else {
                    path
                };
                debug!("Binding pdfium from {}", lib.display());
                Pdfium::bind_to_library(&lib).map_err(|e| {
                    TranslateError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e))
                })?
            }
            None => Pdfium::bind_to_system_library()
                .map_err(|e| TranslateError::PdfiumBindingFailed(format!("{:?}", e)))?,
        };
        Ok(Pdfium::new(bindings))
    }
}

impl TextExtractor for PdfiumExtractor {
    fn extract_window(
        &self,
        pdf_path: &Path,
        start_page: Option<i64>,
        end_page: Option<i64>,
        max_window: usize,
    ) -> Result<Vec<TranslationUnit>, TranslateError> {
        let pdfium = self.bind()?;

        let document = pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                TranslateError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                TranslateError::CorruptPdf {
                    path: pdf_path.to_path_buf(),
                    detail: err_str,
                }
            }
        })?;

        let pages = document.pages();
        let page_count = pages.len() as usize;
        info!("PDF loaded: {} pages", page_count);

        collect_units(page_count, start_page, end_page, max_window, |idx| {
            let page = pages
                .get(idx as u16)
                .map_err(|e| TranslateError::ExtractionFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?;
            let text = page.text().map_err(|e| TranslateError::ExtractionFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;
            Ok(Some(text.all()))
        })
    }
}
