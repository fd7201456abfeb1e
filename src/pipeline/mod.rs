//! Pipeline stages for PDF translation.
//!
//! Each submodule implements exactly one step; the orchestrator strings
//! them together for a job.
//!
//! ## Data Flow
//!
//! ```text
//! window ──▶ extract ──▶ translate ──▶ sanitize ──▶ layout ──▶ render
//! (pages)    (pdfium)    (LLM)         (Latin-1)    (wrap)     (lopdf)
//! ```
//!
//! 1. [`window`]    — clamp the requested page range to the document
//! 2. [`extract`]   — per-page text; runs in `spawn_blocking` because pdfium
//!    is a blocking C library
//! 3. [`translate`] — one model call per page, faults become placeholder text
//! 4. [`postprocess`] — cleanup of successful model replies
//! 5. [`sanitize`]  — map text onto the single-byte output font
//! 6. [`layout`]    — greedy word wrap with Helvetica metrics
//! 7. [`render`]    — retry/skip fallback and PDF writing

pub mod extract;
pub mod layout;
pub mod postprocess;
pub mod render;
pub mod sanitize;
pub mod translate;
pub mod window;
