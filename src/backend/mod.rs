//! # Backend Adapters
//!
//! The shell engine talks to every data store through [`Backend`]. An
//! adapter contributes its transport, its value shapes, and a [`Profile`]
//! (prompts, aliases, help text); the loop in [`crate::cli::repl`] never
//! special-cases a variant outside this contract.
//!
//! ## Variants
//!
//! | Module            | Store                        | Transport              |
//! |-------------------|------------------------------|------------------------|
//! | [`bigtable`]      | wide-column tables           | gRPC (emulator)        |
//! | [`elasticsearch`] | documents and search         | HTTP/JSON              |
//! | [`neo4j`]         | property graph               | HTTP transactional API |
//! | [`postgres`]      | relational (two profiles)    | PostgreSQL wire        |
//! | [`qdrant`]        | vector search                | HTTP/JSON              |
//!
//! ## Sessions
//!
//! `connect` returns the adapter's session value. The shell owns it and lends
//! it mutably to each call; adapters keep no connection state of their own.

pub mod bigtable;
pub mod document;
pub mod elasticsearch;
pub mod http;
pub mod neo4j;
pub mod postgres;
pub mod qdrant;

use crate::cli::accumulator::Terminator;
use crate::error::{Result, ShellError};
use crate::result::{ClusterInfo, EntityDescriptor, QueryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectMode {
    /// Connect before the first prompt; failure exits the process.
    Eager,
    /// Connect on the first command that needs a session; failure aborts
    /// only that command.
    Lazy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterAspect {
    Info,
    Health,
}

/// Static description of one shell flavour.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: &'static str,
    pub primary_prompt: &'static str,
    pub continuation_prompt: &'static str,
    pub terminator: Terminator,
    pub connect: ConnectMode,
    /// Column header for entity listings ("table", "index", ...).
    pub entity_noun: &'static str,
    pub entity_aliases: &'static [&'static str],
    pub info_aliases: &'static [&'static str],
    pub health_aliases: &'static [&'static str],
    pub farewell: &'static str,
    pub banner: Vec<String>,
    /// Backend statement reference appended to the shared command list.
    pub statement_help: String,
    /// Printed after a failed connection.
    pub remediation: String,
}

pub const INFO_ALIASES: &[&str] = &["info", "\\i", "\\info"];
pub const HEALTH_ALIASES: &[&str] = &["health", "\\health"];

/// Target of a convergence-sensitive mutation, e.g. a freshly created index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessTarget {
    pub target: String,
}

/// One observation of a watched target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollStatus {
    /// Backend health word: `green`, `yellow`, `red`, ...
    pub state: String,
    /// Units of work still pending (initializing shards, optimizing segments).
    pub pending: u64,
}

/// Outcome of one statement before display.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub result: QueryResult,
    pub readiness: Option<ReadinessTarget>,
}

impl From<QueryResult> for Execution {
    fn from(result: QueryResult) -> Self {
        Self {
            result,
            readiness: None,
        }
    }
}

pub trait Backend {
    type Session;

    fn profile(&self) -> &Profile;

    /// Human-readable target used in error context (`name@host:port`).
    fn endpoint(&self) -> String;

    fn connect(&self) -> Result<Self::Session>;

    /// Forwards `statement` verbatim. No syntax checks happen locally.
    fn execute(&self, session: &mut Self::Session, statement: &str) -> Result<Execution>;

    fn list_entities(&self, session: &mut Self::Session) -> Result<Vec<EntityDescriptor>>;

    fn describe_cluster(
        &self,
        session: &mut Self::Session,
        aspect: ClusterAspect,
    ) -> Result<ClusterInfo>;

    fn check_readiness(
        &self,
        _session: &mut Self::Session,
        target: &ReadinessTarget,
    ) -> Result<PollStatus> {
        Err(ShellError::Unsupported {
            operation: format!("readiness check for {}", target.target),
            backend: self.profile().name.to_string(),
        })
    }

    fn is_converged(&self, status: &PollStatus) -> bool {
        status.state == "green" && status.pending == 0
    }
}

/// Splits `METHOD /path [body]` the way the HTTP shells accept statements.
pub(crate) fn split_http_statement(statement: &str) -> Result<(String, String, Option<String>)> {
    let statement = statement.trim();
    let (method, rest) = statement
        .split_once(char::is_whitespace)
        .unwrap_or((statement, ""));
    let rest = rest.trim_start();
    let (path, body) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));

    if method.is_empty() || path.is_empty() {
        return Err(ShellError::malformed("METHOD /path [body]"));
    }

    let body = Some(body.trim()).filter(|b| !b.is_empty()).map(str::to_string);
    Ok((method.to_ascii_uppercase(), path.to_string(), body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_statement_splits_method_path_and_body() {
        let (method, path, body) =
            split_http_statement("put /idx {\"settings\": {\"number_of_shards\": 1}}").unwrap();
        assert_eq!(method, "PUT");
        assert_eq!(path, "/idx");
        assert_eq!(body.as_deref(), Some("{\"settings\": {\"number_of_shards\": 1}}"));
    }

    #[test]
    fn http_statement_without_body() {
        let (method, path, body) = split_http_statement("GET /_cat/indices").unwrap();
        assert_eq!((method.as_str(), path.as_str(), body), ("GET", "/_cat/indices", None));
    }

    #[test]
    fn http_statement_tolerates_repeated_spaces() {
        let (method, path, body) = split_http_statement("DELETE   /books  ").unwrap();
        assert_eq!((method.as_str(), path.as_str(), body), ("DELETE", "/books", None));
    }

    #[test]
    fn http_statement_needs_method_and_path() {
        let err = split_http_statement("GET").unwrap_err();
        assert!(matches!(err, ShellError::MalformedCommand { .. }));
        assert!(err.to_string().contains("METHOD /path [body]"));
    }

    #[test]
    fn default_convergence_requires_green_and_nothing_pending() {
        struct Stub;
        impl Backend for Stub {
            type Session = ();
            fn profile(&self) -> &Profile {
                unreachable!()
            }
            fn endpoint(&self) -> String {
                String::new()
            }
            fn connect(&self) -> Result<()> {
                Ok(())
            }
            fn execute(&self, _: &mut (), _: &str) -> Result<Execution> {
                Ok(QueryResult::Empty.into())
            }
            fn list_entities(&self, _: &mut ()) -> Result<Vec<EntityDescriptor>> {
                Ok(vec![])
            }
            fn describe_cluster(&self, _: &mut (), _: ClusterAspect) -> Result<ClusterInfo> {
                Ok(ClusterInfo::new("x"))
            }
        }

        let green = PollStatus { state: "green".into(), pending: 0 };
        let busy = PollStatus { state: "green".into(), pending: 2 };
        let yellow = PollStatus { state: "yellow".into(), pending: 0 };
        assert!(Stub.is_converged(&green));
        assert!(!Stub.is_converged(&busy));
        assert!(!Stub.is_converged(&yellow));
    }
}
