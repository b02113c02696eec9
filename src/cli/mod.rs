//! # Shell Front End
//!
//! The backend-independent half of every shell: input, statement
//! accumulation, meta-commands, and display.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CLI Entry Point                        │
//! │                      (bin/dbshell.rs)                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                        Shell Loop                           │
//! │  - Reads lines from a terminal (rustyline) or a pipe        │
//! │  - Routes meta-commands vs statements                       │
//! │  - Times execution, polls for readiness, prints results     │
//! ├─────────────────────────────────────────────────────────────┤
//! │   Accumulator      │    Meta Commands     │  Table Formatter │
//! │  Idle/Accumulating │  help, quit, clear,  │  ASCII borders   │
//! │  ';' or newline    │  per-backend aliases │  char widths     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - `accumulator`: line-to-statement state machine
//! - `commands`: meta-command table and help text
//! - `input`: terminal and scripted line sources
//! - `repl`: the shell loop
//! - `table`: ASCII table formatter for tabular results

pub mod accumulator;
pub mod commands;
pub mod input;
pub mod repl;
pub mod table;

pub use accumulator::{Command, StatementAccumulator, Terminator};
pub use commands::{MetaCommand, MetaTable};
pub use input::{LineSource, ReadOutcome, ScriptInput, TerminalInput};
pub use repl::{Exit, Shell};
