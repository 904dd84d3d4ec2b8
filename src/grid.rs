//! Grid sizing: the smallest terminal that shows a text without wrapping

use unicode_width::UnicodeWidthChar;

/// Columns and rows a terminal needs to display a text
///
/// `columns` may be zero when every line is empty; use
/// [`GridDimensions::terminal_columns`] when configuring the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDimensions {
    pub columns: usize,
    pub rows: usize,
}

impl GridDimensions {
    /// Column count clamped to what the terminal component accepts.
    pub fn terminal_columns(&self) -> usize {
        self.columns.max(1)
    }

    /// Row count clamped to what the terminal component accepts.
    pub fn terminal_rows(&self) -> usize {
        self.rows.max(1)
    }
}

/// Split on `\r\n`, `\r` or `\n`, each counting as a single break.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                lines.push(&text[start..i]);
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                start = i + 1;
            }
            b'\n' => {
                lines.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    lines.push(&text[start..]);
    lines
}

/// Distance between the terminal's default tab stops.
pub const TAB_WIDTH: usize = 8;

/// Display width of a line once styling escape sequences are removed.
///
/// A tab advances to the next multiple of [`TAB_WIDTH`].
pub fn visible_width(line: &str) -> usize {
    let mut column = 0;
    for (i, segment) in line.split('\t').enumerate() {
        if i > 0 {
            column = (column / TAB_WIDTH + 1) * TAB_WIDTH;
        }
        column += strip_ansi_escapes::strip_str(segment)
            .chars()
            .map(|c| c.width().unwrap_or(1))
            .sum::<usize>();
    }
    column
}

/// Compute the grid needed to show `text` without wrapping or truncation.
pub fn size(text: &str) -> GridDimensions {
    let lines = split_lines(text);
    let columns = lines.iter().map(|l| visible_width(l)).max().unwrap_or(0);
    GridDimensions {
        columns,
        rows: lines.len(),
    }
}
