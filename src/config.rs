//! Configuration types for the translation service.
//!
//! Service-wide behaviour is controlled through [`ServiceConfig`], built via
//! its [`ServiceConfigBuilder`]. Backend connection settings live in
//! [`OllamaConfig`] (for the HTTP backend) so the service config stays free
//! of transport details.

use crate::error::TranslateError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default backend base URL when `TRANSLATION_LLM_BASE_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11534";

/// Default backend model when `TRANSLATION_LLM_MODEL_NAME` is unset.
pub const DEFAULT_MODEL: &str = "translategemma";

/// Configuration for the translation service.
///
/// # Example
/// ```rust
/// use edgequake_pdf_translate::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .storage_dir("/var/lib/pdf-translate")
///     .max_window_pages(5)
///     .translation_concurrency(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_window_pages, 5);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Root of the per-job storage areas (`original/`, `output/`). Default: `storage`.
    pub storage_dir: PathBuf,

    /// Hard ceiling on the number of pages one job translates. Default: 10.
    ///
    /// Applied by the page window resolver after the caller's own range, so a
    /// request for pages 1–500 still translates at most this many pages.
    pub max_window_pages: usize,

    /// In-flight backend calls per job. Default: 2.
    ///
    /// Local model servers serialise requests internally; more than two
    /// outstanding calls only grows their queue.
    pub translation_concurrency: usize,

    /// Jobs allowed to run their pipeline at the same time. Default: 4.
    ///
    /// Further jobs stay `pending` until a slot frees.
    pub max_concurrent_jobs: usize,

    /// Page geometry and typography of the rendered translation.
    pub page: PageGeometry,

    /// Render fallback: tokens longer than this (in characters) are split. Default: 80.
    pub long_token_threshold: usize,

    /// Render fallback: chunk length used when splitting long tokens. Default: 40.
    pub token_chunk_len: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("storage"),
            max_window_pages: 10,
            translation_concurrency: 2,
            max_concurrent_jobs: 4,
            page: PageGeometry::default(),
            long_token_threshold: 80,
            token_chunk_len: 40,
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = dir.into();
        self
    }

    pub fn max_window_pages(mut self, n: usize) -> Self {
        self.config.max_window_pages = n.max(1);
        self
    }

    pub fn translation_concurrency(mut self, n: usize) -> Self {
        self.config.translation_concurrency = n.max(1);
        self
    }

    pub fn max_concurrent_jobs(mut self, n: usize) -> Self {
        self.config.max_concurrent_jobs = n.max(1);
        self
    }

    pub fn page(mut self, page: PageGeometry) -> Self {
        self.config.page = page;
        self
    }

    pub fn long_token_threshold(mut self, chars: usize) -> Self {
        self.config.long_token_threshold = chars;
        self
    }

    pub fn token_chunk_len(mut self, chars: usize) -> Self {
        self.config.token_chunk_len = chars.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, TranslateError> {
        let c = &self.config;
        if c.token_chunk_len > c.long_token_threshold {
            return Err(TranslateError::InvalidConfig(format!(
                "token chunk length ({}) must not exceed the long-token threshold ({})",
                c.token_chunk_len, c.long_token_threshold
            )));
        }
        if c.page.text_width() <= 0.0 || c.page.lines_per_page() == 0 {
            return Err(TranslateError::InvalidConfig(format!(
                "page margins leave no room for text: {:?}",
                c.page
            )));
        }
        if c.page.font_size <= 0.0 {
            return Err(TranslateError::InvalidConfig(
                "font size must be > 0".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Page geometry in PDF points (1/72 inch).
///
/// Defaults to A4 portrait with 15 mm margins, 11 pt Helvetica and 5 mm
/// line spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub font_size: f32,
    pub line_height: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: 595.28,
            height: 841.89,
            margin: mm_to_pt(15.0),
            font_size: 11.0,
            line_height: mm_to_pt(5.0),
        }
    }
}

impl PageGeometry {
    /// Horizontal space available to a line of text.
    pub fn text_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Number of text lines that fit between the top and bottom margins.
    pub fn lines_per_page(&self) -> usize {
        let usable = self.height - 2.0 * self.margin;
        if usable <= 0.0 || self.line_height <= 0.0 {
            return 0;
        }
        (usable / self.line_height).floor() as usize
    }
}

fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

/// Connection settings for the Ollama-style `/api/chat` backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    /// Per-request timeout in seconds. Default: 120.
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
        }
    }
}

impl OllamaConfig {
    /// Defaults overridden by `TRANSLATION_LLM_BASE_URL` and
    /// `TRANSLATION_LLM_MODEL_NAME` when set and non-empty.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("TRANSLATION_LLM_BASE_URL") {
            if !url.is_empty() {
                config.base_url = url;
            }
        }
        if let Ok(model) = std::env::var("TRANSLATION_LLM_MODEL_NAME") {
            if !model.is_empty() {
                config.model = model;
            }
        }
        config
    }
}
