//! Render translated pages into a new PDF, with a retry-then-skip fallback.
//!
//! ## Fallback policy
//!
//! Each translated page is sanitised and laid out. If layout fails (a token
//! wider than the line), overlong tokens are split with
//! [`rewrap_long_tokens`] and layout is retried once. If that also fails the
//! page is emitted with no body and reported as [`PageOutcome::Skipped`]. One
//! bad page never aborts the document.
//!
//! ## Output
//!
//! Pages are written in input order with `lopdf`, one or more output pages
//! per translated page (text that overflows the first page continues on the
//! next). The font is the standard Helvetica with WinAnsi encoding, which is
//! why text goes through [`sanitize`] first.

use crate::config::{PageGeometry, ServiceConfig};
use crate::error::TranslateError;
use crate::pipeline::layout::{layout_lines, rewrap_long_tokens, LayoutError};
use crate::pipeline::sanitize::sanitize;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, warn};

/// Layout settings taken from the service configuration.
#[derive(Debug, Clone, Copy)]
pub struct RenderSettings {
    pub page: PageGeometry,
    pub long_token_threshold: usize,
    pub token_chunk_len: usize,
}

impl From<&ServiceConfig> for RenderSettings {
    fn from(c: &ServiceConfig) -> Self {
        Self {
            page: c.page,
            long_token_threshold: c.long_token_threshold,
            token_chunk_len: c.token_chunk_len,
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::from(&ServiceConfig::default())
    }
}

/// How one translated page made it into the document.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Laid out on the first attempt.
    LaidOut,
    /// Laid out after splitting overlong tokens.
    Rewrapped,
    /// Both attempts failed; the page was emitted without a body.
    Skipped(LayoutError),
}

/// The finished document plus per-page fallback outcomes.
#[derive(Debug)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub outcomes: Vec<PageOutcome>,
}

impl RenderedDocument {
    pub fn skipped_pages(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, PageOutcome::Skipped(_)))
            .count()
    }
}

/// Sanitise and lay out one page, applying the fallback policy.
pub fn lay_out_page(page_num: usize, text: &str, settings: &RenderSettings) -> (Vec<String>, PageOutcome) {
    let safe = sanitize(text);
    match layout_lines(&safe, &settings.page) {
        Ok(lines) => (lines, PageOutcome::LaidOut),
        Err(first) => {
            debug!("Page {}: layout failed ({}), re-wrapping long tokens", page_num, first);
            let rewrapped =
                rewrap_long_tokens(&safe, settings.long_token_threshold, settings.token_chunk_len);
            match layout_lines(&rewrapped, &settings.page) {
                Ok(lines) => (lines, PageOutcome::Rewrapped),
                Err(second) => {
                    warn!("Page {}: layout failed after re-wrap, emitting empty page — {}", page_num, second);
                    (Vec::new(), PageOutcome::Skipped(second))
                }
            }
        }
    }
}

/// Render translated pages (in index order) into PDF bytes.
///
/// This is CPU-bound; the orchestrator runs it inside `spawn_blocking`.
pub fn render_document(
    pages: &[String],
    settings: &RenderSettings,
) -> Result<RenderedDocument, TranslateError> {
    let mut writer = PdfWriter::new(settings.page);
    let mut outcomes = Vec::with_capacity(pages.len());

    for (idx, text) in pages.iter().enumerate() {
        let (lines, outcome) = lay_out_page(idx + 1, text, settings);
        writer.add_text(&lines)?;
        outcomes.push(outcome);
    }

    let bytes = writer.finish()?;
    let rendered = RenderedDocument { bytes, outcomes };
    info!(
        "Rendered {} translated pages ({} skipped, {} bytes)",
        pages.len(),
        rendered.skipped_pages(),
        rendered.bytes.len()
    );
    Ok(rendered)
}

/// Minimal single-font PDF builder over `lopdf`.
struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    kids: Vec<Object>,
    page: PageGeometry,
}

impl PdfWriter {
    fn new(page: PageGeometry) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        Self {
            doc,
            pages_id,
            resources_id,
            kids: Vec::new(),
            page,
        }
    }

    /// Append one translated page's lines, starting a new output page and
    /// continuing onto further pages when they do not fit.
    fn add_text(&mut self, lines: &[String]) -> Result<(), TranslateError> {
        if lines.is_empty() {
            return self.add_page(&[]);
        }
        let per_page = self.page.lines_per_page().max(1);
        for chunk in lines.chunks(per_page) {
            self.add_page(chunk)?;
        }
        Ok(())
    }

    fn add_page(&mut self, lines: &[String]) -> Result<(), TranslateError> {
        let mut operations = Vec::new();
        if !lines.is_empty() {
            let x = self.page.margin;
            let y = self.page.height - self.page.margin - self.page.font_size;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), self.page.font_size.into()]));
            operations.push(Operation::new("TL", vec![self.page.line_height.into()]));
            operations.push(Operation::new("Td", vec![x.into(), y.into()]));
            for (i, line) in lines.iter().enumerate() {
                if i > 0 {
                    operations.push(Operation::new("T*", vec![]));
                }
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(encode_win_ansi(line))],
                ));
            }
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations }
            .encode()
            .map_err(|e| TranslateError::RenderFailed(format!("content stream: {e}")))?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>, TranslateError> {
        let count = self.kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids,
            "Count" => count,
            "Resources" => self.resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                self.page.width.into(),
                self.page.height.into(),
            ],
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| TranslateError::RenderFailed(format!("serialise: {e}")))?;
        Ok(buf)
    }
}

/// WinAnsi bytes for sanitised text; anything still outside Latin-1 becomes `?`.
fn encode_win_ansi(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
