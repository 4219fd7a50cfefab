//! Fixed-column text layout for the printer's physical paper width.
//!
//! The paper is measured in display columns, not characters: CJK glyphs
//! render double width on the receipt, so all accounting here goes
//! through `unicode-width`.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Paper width in display columns for the poem body.
pub const POEM_COLUMNS: usize = 32;

/// Wrap `text` to at most `width` display columns per line, breaking at
/// whitespace where possible and hard-breaking tokens wider than a whole
/// line. Blank lines (stanza breaks) pass through verbatim.
pub fn wrap(text: &str, width: usize) -> impl Iterator<Item = String> + '_ {
    text.split('\n').flat_map(move |line| wrap_line(line, width))
}

fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if line.trim().is_empty() {
        return vec![String::new()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in line.split_whitespace() {
        let word_width = word.width();

        // A token wider than the paper gets broken mid-word; the last
        // fragment stays open so following words can fill the line.
        if word_width > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            let mut pieces = break_token(word, width);
            if let Some(last) = pieces.pop() {
                current_width = last.width();
                current = last;
            }
            lines.extend(pieces);
            continue;
        }

        let sep = usize::from(!current.is_empty());
        if current_width + sep + word_width <= width {
            if sep == 1 {
                current.push(' ');
            }
            current.push_str(word);
            current_width += sep + word_width;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_width = word_width;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Split one oversized token into pieces of at most `width` columns.
fn break_token(token: &str, width: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut piece_width = 0;
    for ch in token.chars() {
        let w = ch.width().unwrap_or(0);
        if piece_width + w > width && !piece.is_empty() {
            pieces.push(std::mem::take(&mut piece));
            piece_width = 0;
        }
        piece.push(ch);
        piece_width += w;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}
