//! Reduce translated text to what the PDF writer can show.
//!
//! The output document uses the standard Helvetica font with WinAnsi
//! encoding, so only single-byte characters survive. This is a lossy
//! normalisation, not an encoding converter: typographic dashes and quotes
//! become their ASCII look-alikes and everything else outside the range
//! becomes `?`.

/// Make `text` safe for the single-byte PDF font.
///
/// * control characters are dropped, except `\n`, `\r` and `\t`. This
///   includes DEL and U+0080..=U+009F, which WinAnsi would otherwise print
///   as unrelated glyphs such as `€`;
/// * `–`, `—`, `−` → `-`;
/// * `“`, `”`, `„`, `‟` → `"`;
/// * `‘`, `’`, `‚`, `‛` → `'`;
/// * any other character above U+00FF → `?`.
pub fn sanitize(text: &str) -> String {
    text.chars().filter_map(map_char).collect()
}

fn map_char(c: char) -> Option<char> {
    if c.is_control() {
        return matches!(c, '\n' | '\r' | '\t').then_some(c);
    }
    if (c as u32) <= 0xFF {
        return Some(c);
    }
    Some(match c {
        '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
        _ => '?',
    })
}
