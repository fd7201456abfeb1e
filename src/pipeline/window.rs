//! Page window resolution: which pages of the document a job translates.
//!
//! Callers send loosely validated 1-indexed page numbers (missing, zero,
//! negative, reversed, past the end). [`resolve`] turns any combination into
//! a valid zero-based inclusive window no larger than the service ceiling.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Zero-based inclusive page interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    pub start: usize,
    pub end: usize,
}

impl PageWindow {
    /// Number of pages in the window (always at least one).
    pub fn page_count(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn indices(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Resolve a requested 1-indexed page range against the document.
///
/// Rules, in order:
/// 1. a missing or non-positive start becomes page 1;
/// 2. a missing end, or one before the start, becomes `start + max_window - 1`;
/// 3. the end is clamped so the window spans at most `max_window` pages;
/// 4. both bounds are clamped to the page count (a start past the end of the
///    document collapses onto the last page);
/// 5. the result is converted to zero-based indices.
///
/// Returns `None` only when the document has no pages. A `max_window` of 0
/// is treated as 1.
pub fn resolve(
    requested_start: Option<i64>,
    requested_end: Option<i64>,
    page_count: usize,
    max_window: usize,
) -> Option<PageWindow> {
    if page_count == 0 {
        return None;
    }
    let max_window = max_window.max(1);
    let span = max_window - 1;

    let start = match requested_start {
        Some(s) if s > 0 => usize::try_from(s).unwrap_or(usize::MAX),
        _ => 1,
    };

    let default_end = start.saturating_add(span);
    let end = match requested_end {
        Some(e) if e > 0 && usize::try_from(e).unwrap_or(usize::MAX) >= start => {
            usize::try_from(e).unwrap_or(usize::MAX)
        }
        _ => default_end,
    };
    let end = end.min(default_end);

    let start = start.min(page_count);
    let end = end.min(page_count);

    Some(PageWindow {
        start: start - 1,
        end: end - 1,
    })
}
