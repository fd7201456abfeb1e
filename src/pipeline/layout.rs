//! Plain-text line layout for the rendered translation.
//!
//! Text is set in Helvetica at a fixed size and wrapped greedily at spaces.
//! A single token wider than the line cannot be wrapped and fails the layout
//! with [`LayoutError::TokenTooWide`]; [`rewrap_long_tokens`] is the repair
//! the render fallback applies before its one retry.

use crate::config::PageGeometry;
use thiserror::Error;

/// A page's text could not be laid out.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("token of {chars} characters is {width:.1}pt wide but lines are {available:.1}pt")]
    TokenTooWide {
        chars: usize,
        width: f32,
        available: f32,
    },
}

/// Helvetica advance widths (1/1000 em) for U+0020..=U+007E.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Helvetica advance widths for U+00A0..=U+00FF, which WinAnsiEncoding maps
/// one to one.
const HELVETICA_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // nbsp..macron
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // degree..questiondown
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 'À'..'Ï'
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 'Ð'..'ß'
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // 'à'..'ï'
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // 'ð'..'ÿ'
];

/// Anything else is written as `?`.
const HELVETICA_QUESTION: u16 = 556;

fn glyph_width(c: char) -> u16 {
    match c as u32 {
        code @ 0x20..=0x7E => HELVETICA_ASCII[(code - 0x20) as usize],
        code @ 0xA0..=0xFF => HELVETICA_LATIN1[(code - 0xA0) as usize],
        _ => HELVETICA_QUESTION,
    }
}

/// Width of `text` in points at `font_size`.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(glyph_width(c))).sum();
    units as f32 * font_size / 1000.0
}

/// Wrap `text` into lines that fit the page's text width.
///
/// Line breaks in the input are kept; blank input lines stay blank output
/// lines. Runs of spaces and tabs collapse into one space.
pub fn layout_lines(text: &str, page: &PageGeometry) -> Result<Vec<String>, LayoutError> {
    let available = page.text_width();
    let space = text_width(" ", page.font_size);
    let mut lines = Vec::new();

    for source_line in text.lines() {
        let mut current = String::new();
        let mut current_width = 0.0_f32;

        for token in source_line
            .split([' ', '\t', '\r'])
            .filter(|t| !t.is_empty())
        {
            let width = text_width(token, page.font_size);
            if width > available {
                return Err(LayoutError::TokenTooWide {
                    chars: token.chars().count(),
                    width,
                    available,
                });
            }
            if current.is_empty() {
                current.push_str(token);
                current_width = width;
            } else if current_width + space + width <= available {
                current.push(' ');
                current.push_str(token);
                current_width += space + width;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(token);
                current_width = width;
            }
        }
        lines.push(current);
    }

    Ok(lines)
}

/// Split every space-separated token longer than `threshold` characters into
/// `chunk_len`-character pieces joined by spaces, keeping line structure.
pub fn rewrap_long_tokens(text: &str, threshold: usize, chunk_len: usize) -> String {
    let chunk_len = chunk_len.max(1);
    text.lines()
        .map(|line| {
            line.split(' ')
                .map(|token| {
                    if token.chars().count() > threshold {
                        let chars: Vec<char> = token.chars().collect();
                        chars
                            .chunks(chunk_len)
                            .map(|c| c.iter().collect::<String>())
                            .collect::<Vec<_>>()
                            .join(" ")
                    } else {
                        token.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
