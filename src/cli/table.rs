//! # ASCII Table Formatter
//!
//! Renders tabular results with plain ASCII borders.
//!
//! ```text
//! +----+-------+
//! | id | name  |
//! +----+-------+
//! | 1  | Alice |
//! | 2  | NULL  |
//! +----+-------+
//! ```
//!
//! ## Column Width Calculation
//!
//! A column is as wide as its widest cell or header (at least 1), capped at
//! [`MAX_COLUMN_WIDTH`]. Widths count characters, not bytes, so non-ASCII
//! values line up. Longer cells are cut and end in `...`.
//!
//! Cells are already display strings; rendering rules for composite values
//! live in [`crate::value`].

use crate::config::MAX_COLUMN_WIDTH;
use std::fmt::Write;

pub struct TableFormatter<'a> {
    headers: &'a [String],
    widths: Vec<usize>,
    rows: &'a [Vec<String>],
}

impl<'a> TableFormatter<'a> {
    pub fn new(headers: &'a [String], rows: &'a [Vec<String>]) -> Self {
        let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h).max(1)).collect();

        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(i) {
                    *width = (*width).max(display_width(cell));
                }
            }
        }
        for width in &mut widths {
            *width = (*width).min(MAX_COLUMN_WIDTH);
        }

        Self {
            headers,
            widths,
            rows,
        }
    }

    pub fn render(&self) -> String {
        let mut output = String::new();

        self.write_separator(&mut output);
        self.write_row(&mut output, self.headers);
        self.write_separator(&mut output);

        for row in self.rows {
            self.write_row(&mut output, row);
        }

        self.write_separator(&mut output);

        output
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn write_separator(&self, output: &mut String) {
        output.push('+');
        for width in &self.widths {
            output.push_str(&"-".repeat(width + 2));
            output.push('+');
        }
        output.push('\n');
    }

    fn write_row(&self, output: &mut String, cells: &[String]) {
        output.push('|');
        for (i, width) in self.widths.iter().enumerate() {
            let cell = truncate(cells.get(i).map(String::as_str).unwrap_or(""), *width);
            let pad = width.saturating_sub(display_width(&cell));
            let _ = write!(output, " {}{} |", cell, " ".repeat(pad));
        }
        output.push('\n');
    }
}

fn display_width(s: &str) -> usize {
    s.chars().count()
}

/// Line breaks are flattened so a row stays on one line.
fn truncate(s: &str, max_len: usize) -> String {
    let flat: String = s.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }).collect();
    if display_width(&flat) <= max_len {
        flat
    } else if max_len <= 3 {
        flat.chars().take(max_len).collect()
    } else {
        let mut result: String = flat.chars().take(max_len - 3).collect();
        result.push_str("...");
        result
    }
}
