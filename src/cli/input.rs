//! Line sources feeding the shell loop.
//!
//! An interactive terminal gets rustyline editing with in-memory history
//! (nothing is written to disk). Piped input is read line by line without
//! echoing prompts; bytes that are not UTF-8 are replaced, not rejected.

use eyre::{Result, WrapErr};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C: abandon the pending statement, keep the shell.
    Interrupted,
    Eof,
    Failed(String),
}

pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> ReadOutcome;
}

impl<L: LineSource + ?Sized> LineSource for Box<L> {
    fn read_line(&mut self, prompt: &str) -> ReadOutcome {
        (**self).read_line(prompt)
    }
}

pub struct TerminalInput {
    editor: DefaultEditor,
}

impl TerminalInput {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().wrap_err("failed to initialize line editor")?;
        Ok(Self { editor })
    }
}

impl LineSource for TerminalInput {
    fn read_line(&mut self, prompt: &str) -> ReadOutcome {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.trim()).ok();
                }
                ReadOutcome::Line(line)
            }
            Err(ReadlineError::Interrupted) => ReadOutcome::Interrupted,
            Err(ReadlineError::Eof) => ReadOutcome::Eof,
            Err(err) => ReadOutcome::Failed(err.to_string()),
        }
    }
}

pub struct ScriptInput<R> {
    reader: R,
}

impl<R: BufRead> ScriptInput<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ScriptInput<R> {
    fn read_line(&mut self, _prompt: &str) -> ReadOutcome {
        let mut bytes = Vec::new();
        match self.reader.read_until(b'\n', &mut bytes) {
            Ok(0) => ReadOutcome::Eof,
            Ok(_) => {
                let mut line = String::from_utf8_lossy(&bytes).into_owned();
                let trimmed = line.trim_end_matches(['\n', '\r']).len();
                line.truncate(trimmed);
                ReadOutcome::Line(line)
            }
            Err(err) => ReadOutcome::Failed(err.to_string()),
        }
    }
}
