//! # dbshell - Interactive Shells for Data Stores
//!
//! One shell engine, six profiles: a wide-column store (Bigtable), a
//! document/search engine (Elasticsearch), a graph database (Neo4j), two
//! relational endpoints (PostgreSQL and PGAdapter), and a vector search
//! engine (Qdrant). Mostly used for poking at emulators and local instances.
//!
//! ## Quick Start
//!
//! ```ignore
//! use dbshell::backend::qdrant::{Qdrant, QdrantConfig};
//! use dbshell::cli::{ScriptInput, Shell};
//!
//! let backend = Qdrant::new(QdrantConfig::from_env());
//! let mut shell = Shell::new(backend, std::io::stdout());
//! let mut input = ScriptInput::new(std::io::stdin().lock());
//! let exit = shell.run(&mut input)?;
//! std::process::exit(exit.code());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │       Shell loop (cli::repl)         │
//! ├──────────────────┬──────────────────┤
//! │ Accumulator and  │ Readiness poller │
//! │ meta-commands    │ (poll)           │
//! ├──────────────────┴──────────────────┤
//! │   Backend trait and adapters         │
//! ├─────────────────────────────────────┤
//! │   Result normalization (result,      │
//! │   value)                             │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`backend`]: the `Backend` contract and its adapters
//! - [`cli`]: shell loop, accumulator, meta-commands, table output
//! - [`config`]: environment lookup and tuning constants
//! - [`error`]: `ShellError`
//! - [`poll`]: bounded readiness polling with an injectable clock
//! - [`result`]: `QueryResult` and record normalization
//! - [`value`]: closed value model with recursive rendering

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod poll;
pub mod result;
pub mod value;

pub use backend::{Backend, ClusterAspect, ConnectMode, Execution, PollStatus, Profile, ReadinessTarget};
pub use cli::{Exit, Shell};
pub use error::{Result, ShellError};
pub use poll::{Clock, PollOutcome, ReadinessPoller, SystemClock};
pub use result::{normalize, ClusterInfo, EntityDescriptor, QueryResult, Record, SideEffects};
pub use value::Value;
