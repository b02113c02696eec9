//! # Shell Loop Scenarios
//!
//! Drives the complete shell (accumulator, meta-commands, execution,
//! readiness polling, display) against an in-memory backend and checks what
//! an operator would see.
//!
//! ## Usage
//!
//! ```sh
//! cargo test --test shell_scenarios
//! ```

use dbshell::backend::neo4j::decode_response;
use dbshell::backend::{HEALTH_ALIASES, INFO_ALIASES};
use dbshell::cli::{LineSource, ReadOutcome, ScriptInput, Terminator};
use dbshell::{
    Backend, ClusterAspect, ClusterInfo, Clock, ConnectMode, EntityDescriptor, Execution, Exit,
    PollStatus, Profile, QueryResult, ReadinessPoller, ReadinessTarget, ShellError, Shell, Value,
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::Cursor;
use std::rc::Rc;
use std::time::{Duration, Instant};

// ============================================================================
// HELPER TYPES
// ============================================================================

#[derive(Default)]
struct Log {
    connect_attempts: usize,
    failing_connects: usize,
    executed: Vec<String>,
    checks: u32,
    converge_after: Option<u32>,
    entities: Vec<EntityDescriptor>,
}

struct FakeSession;

struct FakeBackend {
    profile: Profile,
    log: Rc<RefCell<Log>>,
}

const CREATE_NODE_RESPONSE: &str = r#"{"results":[{"columns":[],"data":[],
    "stats":{"contains_updates":true,"nodes_created":1,"nodes_deleted":0}}],"errors":[]}"#;

impl FakeBackend {
    fn new(connect: ConnectMode) -> (Self, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let profile = Profile {
            name: "fake",
            primary_prompt: "fake> ",
            continuation_prompt: "   -> ",
            terminator: Terminator::Semicolon,
            connect,
            entity_noun: "table",
            entity_aliases: &["tables", "\\dt"],
            info_aliases: INFO_ALIASES,
            health_aliases: HEALTH_ALIASES,
            farewell: "Goodbye! 👋",
            banner: vec!["🚀 Fake CLI".to_string()],
            statement_help: "Examples:\n  SELECT 1;".to_string(),
            remediation: "💡 Start the fake store".to_string(),
        };

        (
            Self {
                profile,
                log: Rc::clone(&log),
            },
            log,
        )
    }

    fn respond(&self, statement: &str) -> dbshell::Result<Execution> {
        match statement {
            s if s.starts_with("CREATE (") => decode_response(CREATE_NODE_RESPONSE)
                .map(Execution::from)
                .map_err(|msg| ShellError::query("execute", self.endpoint(), msg)),
            "BOOM" => Err(ShellError::connection(self.endpoint(), "connection reset")),
            "FAIL" => Err(ShellError::query("execute", self.endpoint(), "boom")),
            "BAD" => Err(ShellError::malformed("create <table> [cf]")),
            "PUT /books" => Ok(Execution {
                result: QueryResult::status("{\n  \"acknowledged\": true\n}"),
                readiness: Some(ReadinessTarget {
                    target: "books".to_string(),
                }),
            }),
            "SELECT name FROM people" => Ok(QueryResult::tabular(
                vec!["name".to_string()],
                vec![vec!["Alice".to_string()], vec!["NULL".to_string()]],
            )
            .into()),
            "MATCH (n) RETURN n" => Ok(QueryResult::Empty.into()),
            _ => Ok(QueryResult::status("OK").into()),
        }
    }
}

impl Backend for FakeBackend {
    type Session = FakeSession;

    fn profile(&self) -> &Profile {
        &self.profile
    }

    fn endpoint(&self) -> String {
        "fake@mem".to_string()
    }

    fn connect(&self) -> dbshell::Result<FakeSession> {
        let mut log = self.log.borrow_mut();
        log.connect_attempts += 1;
        if log.failing_connects > 0 {
            log.failing_connects -= 1;
            return Err(ShellError::connection(self.endpoint(), "connection refused"));
        }
        Ok(FakeSession)
    }

    fn execute(&self, _session: &mut FakeSession, statement: &str) -> dbshell::Result<Execution> {
        self.log.borrow_mut().executed.push(statement.to_string());
        self.respond(statement)
    }

    fn list_entities(&self, _session: &mut FakeSession) -> dbshell::Result<Vec<EntityDescriptor>> {
        Ok(self.log.borrow().entities.clone())
    }

    fn describe_cluster(
        &self,
        _session: &mut FakeSession,
        aspect: ClusterAspect,
    ) -> dbshell::Result<ClusterInfo> {
        Ok(match aspect {
            ClusterAspect::Info => ClusterInfo::new("Cluster Information").field("Version", "1.2.3"),
            ClusterAspect::Health => ClusterInfo::new("Cluster Health").field("Status", "green"),
        })
    }

    fn check_readiness(
        &self,
        _session: &mut FakeSession,
        _target: &ReadinessTarget,
    ) -> dbshell::Result<PollStatus> {
        let mut log = self.log.borrow_mut();
        log.checks += 1;
        let ready = log.converge_after.is_some_and(|n| log.checks >= n);
        Ok(PollStatus {
            state: if ready { "green" } else { "yellow" }.to_string(),
            pending: if ready { 0 } else { 1 },
        })
    }
}

/// Clock that advances only when slept on.
struct SteppingClock {
    origin: Instant,
    offset: Cell<Duration>,
}

impl SteppingClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Cell::new(Duration::ZERO),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.offset.set(self.offset.get() + duration);
    }
}

/// Replays a fixed sequence of read outcomes, then reports end of input.
struct Replay(VecDeque<ReadOutcome>);

impl LineSource for Replay {
    fn read_line(&mut self, _prompt: &str) -> ReadOutcome {
        self.0.pop_front().unwrap_or(ReadOutcome::Eof)
    }
}

fn run_with(backend: FakeBackend, input: &mut impl LineSource) -> (Exit, String) {
    let poller = ReadinessPoller::new(3, Duration::from_secs(1)).with_clock(SteppingClock::new());
    let mut shell = Shell::new(backend, Vec::new()).with_poller(poller);
    let exit = shell.run(input).expect("shell loop failed");
    let output = String::from_utf8(shell.into_output()).expect("output is not UTF-8");
    (exit, output)
}

fn run_script(backend: FakeBackend, script: &str) -> (Exit, String) {
    run_with(backend, &mut ScriptInput::new(Cursor::new(script.to_string())))
}

// ============================================================================
// END-TO-END SCENARIOS
// ============================================================================

#[test]
fn help_then_exit_never_connects() {
    let (backend, log) = FakeBackend::new(ConnectMode::Lazy);

    let (exit, output) = run_script(backend, "help\nexit\n");

    assert_eq!(exit, Exit::Normal);
    assert_eq!(exit.code(), 0);
    assert!(output.contains("📚 Available Commands:"), "{}", output);
    assert!(output.contains("SELECT 1;"));
    assert!(output.trim_end().ends_with("Goodbye! 👋"));
    assert_eq!(log.borrow().connect_attempts, 0);
}

#[test]
fn graph_create_reports_node_summary_not_table() {
    let (backend, log) = FakeBackend::new(ConnectMode::Eager);

    let (_, output) = run_script(backend, "CREATE (n:Person {name: 'Alice'});\n");

    assert_eq!(log.borrow().executed, vec!["CREATE (n:Person {name: 'Alice'})"]);
    assert!(output.contains("✅ Query OK: 1 nodes created ("), "{}", output);
    assert!(!output.contains("+--"));
}

#[test]
fn statement_split_over_two_lines_runs_once() {
    let (backend, log) = FakeBackend::new(ConnectMode::Lazy);

    run_script(backend, "SELECT * FROM t\n;\n");

    assert_eq!(log.borrow().executed, vec!["SELECT * FROM t"]);
}

// ============================================================================
// ACCUMULATION
// ============================================================================

#[test]
fn meta_token_inside_statement_is_statement_text() {
    let (backend, log) = FakeBackend::new(ConnectMode::Lazy);

    let (_, output) = run_script(backend, "SELECT\nexit\n;\n");

    assert_eq!(log.borrow().executed, vec!["SELECT exit"]);
    assert_eq!(output.matches("Goodbye! 👋").count(), 1);
}

#[test]
fn end_of_input_discards_partial_statement() {
    let (backend, log) = FakeBackend::new(ConnectMode::Lazy);

    let (exit, output) = run_script(backend, "SELECT 1\nFROM dual");

    assert_eq!(exit, Exit::Normal);
    assert!(log.borrow().executed.is_empty());
    assert!(output.trim_end().ends_with("Goodbye! 👋"));
}

#[test]
fn interrupt_clears_pending_statement() {
    let (backend, log) = FakeBackend::new(ConnectMode::Lazy);
    let mut input = Replay(VecDeque::from(vec![
        ReadOutcome::Line("SELECT 1".into()),
        ReadOutcome::Interrupted,
        ReadOutcome::Line("SELECT 2;".into()),
    ]));

    let (_, output) = run_with(backend, &mut input);

    assert_eq!(log.borrow().executed, vec!["SELECT 2"]);
    assert!(output.contains("^C"));
}

#[test]
fn invalid_utf8_line_does_not_end_the_script() {
    let (backend, log) = FakeBackend::new(ConnectMode::Lazy);
    let script: &[u8] = b"SELECT 1;\n\xff\xfe\n;\nSELECT 2;\n";

    let (exit, output) = run_with(backend, &mut ScriptInput::new(Cursor::new(script)));

    assert_eq!(exit, Exit::Normal);
    assert_eq!(log.borrow().executed, vec!["SELECT 1", "\u{fffd}\u{fffd}", "SELECT 2"]);
    assert!(!output.contains("Error reading input"), "{}", output);
}

#[test]
fn read_failure_is_reported_and_reading_continues() {
    let (backend, log) = FakeBackend::new(ConnectMode::Lazy);
    let mut input = Replay(VecDeque::from(vec![
        ReadOutcome::Line("SELECT 1;".into()),
        ReadOutcome::Failed("stream did not contain valid UTF-8".into()),
        ReadOutcome::Line("SELECT 2;".into()),
    ]));

    let (exit, output) = run_with(backend, &mut input);

    assert_eq!(exit, Exit::Normal);
    assert_eq!(log.borrow().executed, vec!["SELECT 1", "SELECT 2"]);
    assert!(output.contains("❌ Error reading input: stream did not contain valid UTF-8"));
}

#[test]
fn persistent_read_failure_ends_like_end_of_input() {
    let (backend, log) = FakeBackend::new(ConnectMode::Lazy);
    let mut input = Replay(VecDeque::from(vec![
        ReadOutcome::Failed("broken pipe".into()),
        ReadOutcome::Failed("broken pipe".into()),
        ReadOutcome::Failed("broken pipe".into()),
        ReadOutcome::Line("SELECT 1;".into()),
    ]));

    let (exit, output) = run_with(backend, &mut input);

    assert_eq!(exit, Exit::Normal);
    assert!(log.borrow().executed.is_empty());
    assert_eq!(output.matches("❌ Error reading input").count(), 3);
    assert!(output.trim_end().ends_with("Goodbye! 👋"));
}

// ============================================================================
// CONNECTIONS
// ============================================================================

#[test]
fn eager_connect_failure_exits_with_code_one() {
    let (backend, log) = FakeBackend::new(ConnectMode::Eager);
    log.borrow_mut().failing_connects = 1;

    let (exit, output) = run_script(backend, "SELECT 1;\n");

    assert_eq!(exit, Exit::ConnectFailed);
    assert_eq!(exit.code(), 1);
    assert!(output.contains("❌ Failed to connect: cannot connect to fake@mem: connection refused"));
    assert!(output.contains("💡 Start the fake store"));
    assert!(log.borrow().executed.is_empty());
}

#[test]
fn lazy_connect_failure_aborts_only_that_command() {
    let (backend, log) = FakeBackend::new(ConnectMode::Lazy);
    log.borrow_mut().failing_connects = 1;

    let (exit, output) = run_script(backend, "SELECT 1;\nSELECT 2;\n");

    assert_eq!(exit, Exit::Normal);
    assert!(output.contains("❌ Error: cannot connect to fake@mem"));
    assert_eq!(log.borrow().connect_attempts, 2);
    assert_eq!(log.borrow().executed, vec!["SELECT 2"]);
}

#[test]
fn connection_error_drops_session_and_reconnects() {
    let (backend, log) = FakeBackend::new(ConnectMode::Eager);

    let (_, output) = run_script(backend, "BOOM;\nSELECT 1;\n");

    assert!(output.contains("connection reset"));
    assert_eq!(log.borrow().connect_attempts, 2);
    assert_eq!(log.borrow().executed, vec!["BOOM", "SELECT 1"]);
}

// ============================================================================
// ERRORS
// ============================================================================

#[test]
fn query_error_is_reported_and_loop_continues() {
    let (backend, log) = FakeBackend::new(ConnectMode::Lazy);

    let (exit, output) = run_script(backend, "FAIL;\nSELECT 1;\n");

    assert_eq!(exit, Exit::Normal);
    assert!(output.contains("❌ Error: execute failed on fake@mem: boom"));
    assert_eq!(log.borrow().executed, vec!["FAIL", "SELECT 1"]);
    assert_eq!(log.borrow().connect_attempts, 1);
}

#[test]
fn malformed_command_prints_usage() {
    let (backend, _) = FakeBackend::new(ConnectMode::Lazy);

    let (_, output) = run_script(backend, "BAD;\n");

    assert!(output.contains("❌ Error: Usage: create <table> [cf]"));
}

#[test]
fn unknown_backslash_command_never_reaches_backend() {
    let (backend, log) = FakeBackend::new(ConnectMode::Lazy);

    let (_, output) = run_script(backend, "\\zz\n");

    assert!(output.contains("❌ Error: Unknown command: \\zz"));
    assert_eq!(log.borrow().connect_attempts, 0);
}

// ============================================================================
// READINESS POLLING
// ============================================================================

#[test]
fn readiness_timeout_warns_and_keeps_going() {
    let (backend, log) = FakeBackend::new(ConnectMode::Lazy);

    let (exit, output) = run_script(backend, "PUT /books;\nSELECT 1;\n");

    assert_eq!(exit, Exit::Normal);
    assert_eq!(log.borrow().checks, 3);
    assert!(output.contains("\"acknowledged\": true"));
    assert!(output.contains("⚠️  Warning: books not ready after 3 attempts (2.000s)"), "{}", output);
    assert_eq!(log.borrow().executed, vec!["PUT /books", "SELECT 1"]);

    let ok = output.find("✅ Query OK (").unwrap_or(usize::MAX);
    let warning = output.find("⚠️").unwrap_or(0);
    assert!(ok < warning, "result is printed before the warning");
}

#[test]
fn converged_readiness_prints_no_warning() {
    let (backend, log) = FakeBackend::new(ConnectMode::Lazy);
    log.borrow_mut().converge_after = Some(2);

    let (_, output) = run_script(backend, "PUT /books;\n");

    assert_eq!(log.borrow().checks, 2);
    assert!(!output.contains("Warning"));
}

// ============================================================================
// DISPLAY
// ============================================================================

#[test]
fn tabular_result_has_table_and_row_count() {
    let (backend, _) = FakeBackend::new(ConnectMode::Lazy);

    let (_, output) = run_script(backend, "SELECT name FROM people;\n");

    assert!(output.contains("| name  |"), "{}", output);
    assert!(output.contains("| Alice |"));
    assert!(output.contains("| NULL  |"));
    assert!(output.contains("(2 rows) Time: "));
}

#[test]
fn empty_result_says_no_results() {
    let (backend, _) = FakeBackend::new(ConnectMode::Lazy);

    let (_, output) = run_script(backend, "MATCH (n) RETURN n;\n");

    assert!(output.contains("✅ Query OK, no results ("));
}

#[test]
fn entity_listing_uses_profile_noun() {
    let (backend, log) = FakeBackend::new(ConnectMode::Lazy);
    log.borrow_mut().entities = vec![
        EntityDescriptor::named("users").detail("schema", Value::text("public")),
        EntityDescriptor::named("orders").detail("schema", Value::text("public")),
    ];

    let (_, output) = run_script(backend, "TABLES\n");

    assert!(output.contains("| table  | schema |"), "{}", output);
    assert!(output.contains("| orders | public |"));
    assert!(output.contains("(2 rows) Time: "));
}

#[test]
fn empty_entity_listing() {
    let (backend, _) = FakeBackend::new(ConnectMode::Lazy);

    let (_, output) = run_script(backend, "\\dt\n");

    assert!(output.contains("No tables found."));
}

#[test]
fn cluster_info_and_health() {
    let (backend, _) = FakeBackend::new(ConnectMode::Lazy);

    let (_, output) = run_script(backend, "\\i\nhealth\n");

    assert!(output.contains("Cluster Information:\n  Version: 1.2.3"));
    assert!(output.contains("Cluster Health:\n  Status: green"));
}

#[test]
fn clear_emits_escape_sequence() {
    let (backend, _) = FakeBackend::new(ConnectMode::Lazy);

    let (_, output) = run_script(backend, "clear\n");

    assert!(output.contains("\x1b[2J\x1b[H"));
}
