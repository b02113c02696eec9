//! # dbshell Entry Point
//!
//! ```bash
//! # Graph shell against a local Neo4j
//! dbshell neo4j
//!
//! # Pipe a script through the document shell with request tracing
//! dbshell elasticsearch --verbose < setup.txt
//! ```
//!
//! Backend settings come from environment variables (`PGHOST`,
//! `QDRANT_PORT`, ...). Tracing goes to stderr; `--verbose` or
//! `DBSHELL_VERBOSE=1` turns on debug events, otherwise `RUST_LOG` applies.

use clap::{Parser, ValueEnum};
use dbshell::backend::bigtable::{Bigtable, BigtableConfig};
use dbshell::backend::elasticsearch::{Elasticsearch, ElasticsearchConfig};
use dbshell::backend::neo4j::{Neo4j, Neo4jConfig};
use dbshell::backend::postgres::{Flavor, Postgres, PostgresConfig};
use dbshell::backend::qdrant::{Qdrant, QdrantConfig};
use dbshell::cli::{LineSource, ScriptInput, TerminalInput};
use dbshell::config;
use dbshell::{Backend, Exit, Shell};
use eyre::{Result, WrapErr};
use std::io::{self, IsTerminal};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    Bigtable,
    Elasticsearch,
    Neo4j,
    Postgres,
    Pgadapter,
    Qdrant,
}

#[derive(Debug, Parser)]
#[command(name = "dbshell", version)]
#[command(about = "Interactive shells for Bigtable, Elasticsearch, Neo4j, PostgreSQL, PGAdapter and Qdrant")]
struct Cli {
    #[arg(value_enum)]
    backend: BackendKind,

    /// Trace requests, responses and readiness checks to stderr
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    match run(cli) {
        Ok(exit) => std::process::exit(exit.code()),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let verbose = verbose || config::verbose_from_lookup(&config::process_env);
    let filter = if verbose {
        EnvFilter::new("dbshell=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(verbose)
        .init();
}

fn run(cli: Cli) -> Result<Exit> {
    init_tracing(cli.verbose);

    match cli.backend {
        BackendKind::Bigtable => run_shell(Bigtable::new(BigtableConfig::from_env())),
        BackendKind::Elasticsearch => run_shell(Elasticsearch::new(ElasticsearchConfig::from_env())),
        BackendKind::Neo4j => run_shell(Neo4j::new(Neo4jConfig::from_env())),
        BackendKind::Postgres => run_shell(Postgres::new(PostgresConfig::from_env(Flavor::Postgres))),
        BackendKind::Pgadapter => run_shell(Postgres::new(PostgresConfig::from_env(Flavor::PgAdapter))),
        BackendKind::Qdrant => run_shell(Qdrant::new(QdrantConfig::from_env())),
    }
}

fn run_shell<B: Backend>(backend: B) -> Result<Exit> {
    let mut input: Box<dyn LineSource> = if io::stdin().is_terminal() {
        Box::new(TerminalInput::new()?)
    } else {
        Box::new(ScriptInput::new(io::stdin().lock()))
    };

    let mut shell = Shell::new(backend, io::stdout());
    shell
        .run(&mut input)
        .wrap_err("shell terminated unexpectedly")
}
