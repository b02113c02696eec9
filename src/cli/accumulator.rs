//! # Statement Accumulator
//!
//! Turns physical input lines into complete commands.
//!
//! ```text
//!            empty line / meta token
//!               ┌──────┐
//!               ▼      │
//!           ┌──────────┴┐   line without ';'   ┌──────────────┐
//!   ───────►│   Idle    ├─────────────────────►│ Accumulating │◄──┐
//!           └───────────┘                      └──────┬───────┘   │
//!                 ▲          line ending in ';'       │  any line  │
//!                 └───────────────────────────────────┘───────────┘
//! ```
//!
//! Meta tokens are only looked up while idle, so `quit` inside a pending
//! statement is ordinary text. Lines are trimmed and joined with one space;
//! the trailing `;` is stripped before the statement is handed over.
//!
//! With [`Terminator::Newline`] every non-empty line is complete on its own.

use crate::cli::commands::{MetaCommand, MetaTable};

/// How a statement ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// A line ending in `;` completes the statement.
    Semicolon,
    /// Every line is a statement.
    Newline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Meta(MetaCommand),
    Query(String),
}

/// Raw buffered text and the number of physical lines it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statement {
    text: String,
    lines: usize,
}

impl Statement {
    fn push_line(&mut self, line: &str) {
        if self.lines > 0 {
            self.text.push(' ');
        }
        self.text.push_str(line);
        self.lines += 1;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines == 0
    }
}

pub struct StatementAccumulator {
    terminator: Terminator,
    meta: MetaTable,
    pending: Statement,
}

impl StatementAccumulator {
    pub fn new(terminator: Terminator, meta: MetaTable) -> Self {
        Self {
            terminator,
            meta,
            pending: Statement::default(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> &Statement {
        &self.pending
    }

    /// Drops a partially entered statement.
    pub fn reset(&mut self) {
        self.pending = Statement::default();
    }

    pub fn feed(&mut self, line: &str) -> Option<Command> {
        let line = line.trim();

        if self.is_idle() {
            if line.is_empty() {
                return None;
            }
            if let Some(meta) = self.meta.lookup(line) {
                return Some(Command::Meta(meta));
            }
        }

        self.pending.push_line(line);

        let complete = match self.terminator {
            Terminator::Semicolon => line.ends_with(';'),
            Terminator::Newline => true,
        };
        if !complete {
            return None;
        }

        let statement = std::mem::take(&mut self.pending);
        let text = strip_delimiter(statement.text());
        if text.is_empty() {
            return None;
        }
        Some(Command::Query(text.to_string()))
    }
}

fn strip_delimiter(text: &str) -> &str {
    let text = text.trim();
    text.strip_suffix(';').unwrap_or(text).trim()
}
