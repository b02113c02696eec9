//! # Shell Loop
//!
//! One loop drives every backend:
//!
//! ```text
//! prompt ─► read line ─► accumulator ─┬─► meta-command ─► local action / list / describe
//!                                     └─► statement ───► execute ─► [readiness poll] ─► display
//! ```
//!
//! ## Sessions
//!
//! The loop owns the backend session. Eager profiles connect before the
//! first prompt and exit with status 1 when that fails. Lazy profiles
//! connect on the first command that needs the backend; a connection error
//! drops the session so the next command reconnects.
//!
//! ## Output
//!
//! Everything, errors included, goes to the loop's writer:
//!
//! ```text
//! +------+
//! | name |
//! +------+
//! | a    |
//! +------+
//!
//! (1 rows) Time: 4ms
//!
//! ✅ Query OK: 1 nodes created (12ms)
//! ❌ Error: execute failed on neo4j@http://localhost:7474: ...
//! ⚠️  Warning: books not ready after 60 attempts (59.012s)
//! ```
//!
//! No error raised while handling one command ends the loop. Only end of
//! input or a quit command does.

use crate::backend::{Backend, ClusterAspect, ConnectMode, Execution};
use crate::cli::accumulator::{Command, StatementAccumulator};
use crate::cli::commands::{help_text, plural, MetaCommand, MetaTable};
use crate::cli::input::{LineSource, ReadOutcome};
use crate::cli::table::TableFormatter;
use crate::error::{Result as ShellResult, ShellError};
use crate::poll::{PollOutcome, ReadinessPoller};
use crate::result::{entities_table, ClusterInfo, QueryResult};
use eyre::Result;
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Consecutive read failures after which the input is treated as closed.
const MAX_READ_FAILURES: u32 = 3;

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Normal,
    ConnectFailed,
}

impl Exit {
    pub fn code(self) -> i32 {
        match self {
            Exit::Normal => 0,
            Exit::ConnectFailed => 1,
        }
    }
}

pub struct Shell<B: Backend, W: Write> {
    backend: B,
    session: Option<B::Session>,
    accumulator: StatementAccumulator,
    poller: ReadinessPoller,
    out: W,
}

fn ensure_session<'s, B: Backend>(
    backend: &B,
    session: &'s mut Option<B::Session>,
) -> ShellResult<&'s mut B::Session> {
    if session.is_none() {
        debug!(backend = backend.profile().name, endpoint = %backend.endpoint(), "connecting");
        *session = Some(backend.connect()?);
    }
    session
        .as_mut()
        .ok_or_else(|| ShellError::connection(backend.endpoint(), "no session"))
}

/// `412ms` below one second, `1.204s` above.
pub fn format_elapsed(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{}ms", elapsed.as_millis())
    } else {
        format!("{:.3}s", elapsed.as_secs_f64())
    }
}

impl<B: Backend, W: Write> Shell<B, W> {
    pub fn new(backend: B, out: W) -> Self {
        let profile = backend.profile();
        let accumulator = StatementAccumulator::new(profile.terminator, MetaTable::for_profile(profile));

        Self {
            backend,
            session: None,
            accumulator,
            poller: ReadinessPoller::default(),
            out,
        }
    }

    pub fn with_poller(mut self, poller: ReadinessPoller) -> Self {
        self.poller = poller;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn run(&mut self, input: &mut impl LineSource) -> Result<Exit> {
        self.print_welcome()?;

        if self.backend.profile().connect == ConnectMode::Eager {
            match self.backend.connect() {
                Ok(session) => {
                    self.session = Some(session);
                    writeln!(self.out, "✅ Connected to {}", self.backend.endpoint())?;
                }
                Err(err) => {
                    writeln!(self.out, "❌ Failed to connect: {}", err)?;
                    writeln!(self.out, "{}", self.backend.profile().remediation)?;
                    return Ok(Exit::ConnectFailed);
                }
            }
        }

        writeln!(self.out, "\nType 'help' for commands, or enter statements")?;
        writeln!(self.out, "Type 'exit' or 'quit' to leave\n")?;

        let mut read_failures = 0;
        loop {
            let profile = self.backend.profile();
            let prompt = if self.accumulator.is_idle() {
                profile.primary_prompt
            } else {
                profile.continuation_prompt
            };
            self.out.flush()?;

            let outcome = input.read_line(prompt);
            if !matches!(outcome, ReadOutcome::Failed(_)) {
                read_failures = 0;
            }
            match outcome {
                ReadOutcome::Line(line) => match self.accumulator.feed(&line) {
                    None => {}
                    Some(Command::Meta(meta)) => {
                        if !self.execute_command(meta)? {
                            break;
                        }
                    }
                    Some(Command::Query(statement)) => self.execute_statement(&statement)?,
                },
                ReadOutcome::Interrupted => {
                    self.accumulator.reset();
                    writeln!(self.out, "^C")?;
                }
                ReadOutcome::Eof => break,
                ReadOutcome::Failed(err) => {
                    writeln!(self.out, "❌ Error reading input: {}", err)?;
                    read_failures += 1;
                    if read_failures >= MAX_READ_FAILURES {
                        warn!(failures = read_failures, "input keeps failing, treating as end of input");
                        break;
                    }
                }
            }
        }

        self.session = None;
        writeln!(self.out, "{}", self.backend.profile().farewell)?;
        self.out.flush()?;
        Ok(Exit::Normal)
    }

    /// Returns `false` when the loop should stop.
    fn execute_command(&mut self, command: MetaCommand) -> Result<bool> {
        match command {
            MetaCommand::Quit => return Ok(false),
            MetaCommand::Help => {
                write!(self.out, "{}", help_text(self.backend.profile()))?;
                writeln!(self.out)?;
            }
            MetaCommand::Clear => {
                write!(self.out, "{}", CLEAR_SCREEN)?;
                self.out.flush()?;
            }
            MetaCommand::ListEntities => self.list_entities()?,
            MetaCommand::Cluster(aspect) => self.describe_cluster(aspect)?,
            MetaCommand::Unknown(token) => {
                self.print_error(&ShellError::UnknownCommand(token))?;
            }
        }
        Ok(true)
    }

    fn list_entities(&mut self) -> Result<()> {
        let started = Instant::now();
        let listed = ensure_session(&self.backend, &mut self.session)
            .and_then(|session| self.backend.list_entities(session));

        match listed {
            Ok(entities) if entities.is_empty() => {
                let noun = plural(self.backend.profile().entity_noun);
                writeln!(self.out, "No {} found.\n", noun)?;
            }
            Ok(entities) => {
                let table = entities_table(self.backend.profile().entity_noun, &entities);
                self.print_result(&table, started.elapsed())?;
            }
            Err(err) => self.fail(err)?,
        }
        Ok(())
    }

    fn describe_cluster(&mut self, aspect: ClusterAspect) -> Result<()> {
        let described = ensure_session(&self.backend, &mut self.session)
            .and_then(|session| self.backend.describe_cluster(session, aspect));

        match described {
            Ok(info) => self.print_cluster(&info)?,
            Err(err) => self.fail(err)?,
        }
        Ok(())
    }

    fn execute_statement(&mut self, statement: &str) -> Result<()> {
        debug!(backend = self.backend.profile().name, %statement, "execute");
        let started = Instant::now();

        let executed = ensure_session(&self.backend, &mut self.session)
            .and_then(|session| self.backend.execute(session, statement));

        let Execution { result, readiness } = match executed {
            Ok(execution) => execution,
            Err(err) => return self.fail(err),
        };

        let mut warning = None;
        if let (Some(target), Some(session)) = (readiness, self.session.as_mut()) {
            let backend = &self.backend;
            let outcome = self.poller.poll(
                &target.target,
                || backend.check_readiness(session, &target),
                |status| backend.is_converged(status),
            );
            if let PollOutcome::TimedOut { attempts, elapsed } = outcome {
                warn!(entity = %target.target, attempts, ?elapsed, "not ready");
                warning = Some(format!(
                    "⚠️  Warning: {} not ready after {} attempts ({})",
                    target.target,
                    attempts,
                    format_elapsed(elapsed)
                ));
            }
        }

        self.print_result(&result, started.elapsed())?;
        if let Some(warning) = warning {
            writeln!(self.out, "{}\n", warning)?;
        }
        Ok(())
    }

    /// Reports `err`; connection failures also drop the session.
    fn fail(&mut self, err: ShellError) -> Result<()> {
        self.print_error(&err)?;
        if err.is_connection() {
            self.session = None;
            writeln!(self.out, "{}\n", self.backend.profile().remediation)?;
        }
        Ok(())
    }

    fn print_error(&mut self, err: &ShellError) -> Result<()> {
        writeln!(self.out, "❌ Error: {}\n", err)?;
        Ok(())
    }

    fn print_result(&mut self, result: &QueryResult, elapsed: Duration) -> Result<()> {
        let took = format_elapsed(elapsed);
        match result {
            QueryResult::Tabular { columns, rows } => {
                let formatter = TableFormatter::new(columns, rows);
                writeln!(self.out)?;
                write!(self.out, "{}", formatter.render())?;
                writeln!(self.out, "\n({} rows) Time: {}\n", formatter.row_count(), took)?;
            }
            QueryResult::Status { message } if message == "OK" => {
                writeln!(self.out, "\n✅ Query OK ({})\n", took)?;
            }
            QueryResult::Status { message } if message.contains('\n') => {
                writeln!(self.out, "\n{}", message)?;
                writeln!(self.out, "\n✅ Query OK ({})\n", took)?;
            }
            QueryResult::Status { message } => {
                writeln!(self.out, "\n✅ Query OK: {} ({})\n", message, took)?;
            }
            QueryResult::Empty => {
                writeln!(self.out, "\n✅ Query OK, no results ({})\n", took)?;
            }
        }
        Ok(())
    }

    fn print_cluster(&mut self, info: &ClusterInfo) -> Result<()> {
        writeln!(self.out, "\n{}:", info.title)?;
        for (key, value) in &info.fields {
            writeln!(self.out, "  {}: {}", key, value)?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn print_welcome(&mut self) -> Result<()> {
        for line in &self.backend.profile().banner {
            writeln!(self.out, "{}", line)?;
        }
        Ok(())
    }
}
