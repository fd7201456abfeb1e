//! The job record and the request that creates it.
//!
//! A [`Job`] is a plain snapshot: the registry owns the live record and hands
//! out clones, so a `Job` in the caller's hands never changes underneath it.

use crate::error::JobError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque job identity, rendered as 32 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub(crate) fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(JobId)
    }
}

impl Serialize for JobId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// The pipeline step a job is in; finer-grained than [`JobStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Queued,
    ExtractText,
    Translate,
    RenderPdf,
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStage::Queued => "queued",
            JobStage::ExtractText => "extract_text",
            JobStage::Translate => "translate",
            JobStage::RenderPdf => "render_pdf",
            JobStage::Completed => "completed",
            JobStage::Failed => "failed",
            JobStage::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Snapshot of a translation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub stage: JobStage,
    /// Non-empty pages scheduled for translation.
    pub total_elements: usize,
    /// Pages whose translation has completed.
    pub translated_elements: usize,
    /// Pages emitted without a body because their text could not be laid out.
    pub skipped_pages: usize,
    pub source_lang: String,
    pub target_lang: String,
    pub error: Option<JobError>,
}

impl Job {
    pub(crate) fn new(id: JobId, source_lang: String, target_lang: String) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            stage: JobStage::Queued,
            total_elements: 0,
            translated_elements: 0,
            skipped_pages: 0,
            source_lang,
            target_lang,
            error: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

/// How the document's content is handed to the model.
///
/// Only page-by-page plain-text translation exists today; the field is kept
/// on the request so front-ends can pass their selection through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStrategy {
    #[default]
    Auto,
}

/// Everything a caller supplies besides the document bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub source_lang: String,
    pub target_lang: String,
    #[serde(default)]
    pub strategy: TranslationStrategy,
    /// First page to translate, 1-indexed. `None` or ≤ 0 means page 1.
    pub start_page: Option<i64>,
    /// Last page to translate, 1-indexed, inclusive.
    pub end_page: Option<i64>,
}

impl JobRequest {
    pub fn new(source_lang: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            strategy: TranslationStrategy::default(),
            start_page: None,
            end_page: None,
        }
    }

    pub fn pages(mut self, start: Option<i64>, end: Option<i64>) -> Self {
        self.start_page = start;
        self.end_page = end;
        self
    }
}
