//! # Relational Store Adapter
//!
//! Serves two shell profiles over the PostgreSQL wire protocol:
//!
//! - `postgres`: a stock PostgreSQL server
//! - `pgadapter`: PGAdapter in front of the Spanner emulator
//!
//! Statements go through the simple-query protocol, so whether a statement
//! produced rows or a row count is decided by what the server sends back
//! (a row description, then rows, then a command tag), never by inspecting
//! the SQL text. Every value arrives in text form; SQL NULL is shown as
//! `NULL`.

use crate::backend::{Backend, ClusterAspect, ConnectMode, Execution, Profile, HEALTH_ALIASES, INFO_ALIASES};
use crate::cli::accumulator::Terminator;
use crate::config::{self, var_opt, var_or, CONNECT_TIMEOUT};
use crate::error::{Result, ShellError};
use crate::result::{ClusterInfo, EntityDescriptor, QueryResult};
use crate::value::Value;
use native_tls::TlsConnector;
use postgres::config::SslMode;
use postgres::{Client, NoTls, SimpleQueryMessage};
use postgres_native_tls::MakeTlsConnector;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Postgres,
    PgAdapter,
}

impl Flavor {
    fn name(self) -> &'static str {
        match self {
            Flavor::Postgres => "postgres",
            Flavor::PgAdapter => "pgadapter",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub flavor: Flavor,
    pub host: String,
    pub port: String,
    pub user: String,
    pub database: String,
    pub ssl_mode: String,
    pub password: Option<String>,
    /// Host-side port PGAdapter is usually published on.
    pub host_port_hint: Option<String>,
}

impl PostgresConfig {
    pub fn from_env(flavor: Flavor) -> Self {
        Self::from_lookup(flavor, config::process_env)
    }

    pub fn from_lookup<F>(flavor: Flavor, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let (port, user, database) = match flavor {
            Flavor::Postgres => ("5433", "postgres", "postgres"),
            Flavor::PgAdapter => ("5432", "user", "test-instance"),
        };

        Self {
            flavor,
            host: var_or(&lookup, "PGHOST", "localhost"),
            port: var_or(&lookup, "PGPORT", port),
            user: var_or(&lookup, "PGUSER", user),
            database: var_or(&lookup, "PGDATABASE", database),
            ssl_mode: var_or(&lookup, "PGSSLMODE", "disable"),
            password: var_opt(&lookup, "PGPASSWORD"),
            host_port_hint: match flavor {
                Flavor::Postgres => None,
                Flavor::PgAdapter => Some(var_or(&lookup, "PGADAPTER_PORT", "55432")),
            },
        }
    }

    pub fn tls_policy(&self) -> TlsPolicy {
        TlsPolicy::parse(&self.ssl_mode)
    }
}

/// TLS behaviour named after libpq's `sslmode` values. `allow` is treated
/// as `prefer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPolicy {
    Disable,
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl TlsPolicy {
    pub fn parse(mode: &str) -> Self {
        match mode.to_ascii_lowercase().as_str() {
            "disable" => Self::Disable,
            "require" => Self::Require,
            "verify-ca" => Self::VerifyCa,
            "verify-full" => Self::VerifyFull,
            _ => Self::Prefer,
        }
    }

    fn ssl_mode(self) -> SslMode {
        match self {
            Self::Disable => SslMode::Disable,
            Self::Prefer => SslMode::Prefer,
            Self::Require | Self::VerifyCa | Self::VerifyFull => SslMode::Require,
        }
    }

    /// `prefer` and `require` encrypt without checking the certificate,
    /// `verify-ca` checks the chain only.
    fn connector(self) -> std::result::Result<Option<MakeTlsConnector>, native_tls::Error> {
        let mut builder = TlsConnector::builder();
        match self {
            Self::Disable => return Ok(None),
            Self::Prefer | Self::Require => {
                builder.danger_accept_invalid_certs(true);
                builder.danger_accept_invalid_hostnames(true);
            }
            Self::VerifyCa => {
                builder.danger_accept_invalid_hostnames(true);
            }
            Self::VerifyFull => {}
        }
        Ok(Some(MakeTlsConnector::new(builder.build()?)))
    }
}

/// One protocol message reduced to what the display cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Columns(Vec<String>),
    Row(Vec<Option<String>>),
    Complete(u64),
}

fn frames(messages: Vec<SimpleQueryMessage>) -> Vec<Frame> {
    let mut out = Vec::with_capacity(messages.len());
    let mut described = false;

    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(columns) => {
                described = true;
                out.push(Frame::Columns(columns.iter().map(|c| c.name().to_string()).collect()));
            }
            SimpleQueryMessage::Row(row) => {
                if !described {
                    described = true;
                    out.push(Frame::Columns(
                        row.columns().iter().map(|c| c.name().to_string()).collect(),
                    ));
                }
                out.push(Frame::Row((0..row.len()).map(|i| row.get(i).map(str::to_string)).collect()));
            }
            SimpleQueryMessage::CommandComplete(n) => {
                described = false;
                out.push(Frame::Complete(n));
            }
            _ => {}
        }
    }

    out
}

/// Folds the frames of a (possibly multi-statement) query into one result.
/// The last statement that described columns wins; otherwise the last
/// command tag's row count is reported.
pub fn fold_frames(frames: impl IntoIterator<Item = Frame>) -> QueryResult {
    let mut table: Option<(Vec<String>, Vec<Vec<String>>)> = None;
    let mut pending: Option<(Vec<String>, Vec<Vec<String>>)> = None;
    let mut affected = None;

    for frame in frames {
        match frame {
            Frame::Columns(columns) => pending = Some((columns, Vec::new())),
            Frame::Row(values) => {
                if let Some((_, rows)) = pending.as_mut() {
                    rows.push(values.iter().map(|v| Value::from(v.as_deref()).render()).collect());
                }
            }
            Frame::Complete(n) => match pending.take() {
                Some(set) => table = Some(set),
                None => affected = Some(n),
            },
        }
    }

    if let Some(set) = pending {
        table = Some(set);
    }

    match (table, affected) {
        (Some((columns, rows)), _) => QueryResult::tabular(columns, rows),
        (None, Some(n)) => QueryResult::status(format!("{} rows affected", n)),
        (None, None) => QueryResult::Empty,
    }
}

pub struct Postgres {
    config: PostgresConfig,
    profile: Profile,
}

const POSTGRES_HELP: &str = r#"SQL Examples (end with semicolon):
  CREATE TABLE users (id BIGINT PRIMARY KEY, name VARCHAR(100));
  INSERT INTO users (id, name) VALUES (1, 'John Doe');
  SELECT * FROM users;"#;

const PGADAPTER_HELP: &str = r#"SQL Examples (Spanner types):
  CREATE TABLE users (
    id INT64 NOT NULL,
    name STRING(100),
    created_at TIMESTAMP
  ) PRIMARY KEY (id);

PostgreSQL dialect on pgAdapter (recommended):
  CREATE TABLE users (
    id BIGINT PRIMARY KEY,
    name VARCHAR(100),
    created_at TIMESTAMPTZ
  );

  INSERT INTO users (id, name, created_at)
  VALUES (1, 'John Doe', CURRENT_TIMESTAMP);

  SELECT * FROM users;

pgAdapter/Spanner notes:
  - Every table must have a PRIMARY KEY
  - SERIAL/SEQUENCE are generally unsupported
  - Some PostgreSQL features may be limited vs stock PostgreSQL"#;

impl Postgres {
    pub fn new(config: PostgresConfig) -> Self {
        let (banner, help, remediation) = match config.flavor {
            Flavor::Postgres => (
                vec!["🚀 PostgreSQL CLI".to_string(), "=================".to_string()],
                POSTGRES_HELP,
                format!("💡 Ensure PostgreSQL is reachable at {}:{}", config.host, config.port),
            ),
            Flavor::PgAdapter => (
                vec![
                    "🚀 pgAdapter CLI for Spanner Emulator".to_string(),
                    "======================================".to_string(),
                ],
                PGADAPTER_HELP,
                format!(
                    "💡 Target: {}:{}\n💡 Host access hint: localhost:{} (override with PGADAPTER_PORT)",
                    config.host,
                    config.port,
                    config.host_port_hint.as_deref().unwrap_or("55432")
                ),
            ),
        };

        let profile = Profile {
            name: config.flavor.name(),
            primary_prompt: match config.flavor {
                Flavor::Postgres => "postgres> ",
                Flavor::PgAdapter => "pgadapter> ",
            },
            continuation_prompt: "      -> ",
            terminator: Terminator::Semicolon,
            connect: ConnectMode::Eager,
            entity_noun: "table",
            entity_aliases: &["tables", "\\dt"],
            info_aliases: INFO_ALIASES,
            health_aliases: HEALTH_ALIASES,
            farewell: "Goodbye! 👋",
            banner,
            statement_help: help.to_string(),
            remediation,
        };

        Self { config, profile }
    }

    fn failure(&self, operation: &str, client: &Client, err: postgres::Error) -> ShellError {
        if err.is_closed() || client.is_closed() {
            return ShellError::connection(self.endpoint(), err);
        }
        let message = match err.as_db_error() {
            Some(db) => format!("{}: {}", db.severity(), db.message()),
            None => err.to_string(),
        };
        ShellError::query(operation, self.endpoint(), message)
    }

    fn run(&self, client: &mut Client, operation: &str, sql: &str) -> Result<Vec<Frame>> {
        debug!(backend = self.profile.name, sql, "simple query");
        match client.simple_query(sql) {
            Ok(messages) => Ok(frames(messages)),
            Err(err) => Err(self.failure(operation, client, err)),
        }
    }

    fn list_tables_sql(&self) -> &'static str {
        match self.config.flavor {
            Flavor::Postgres => {
                "SELECT table_schema, table_name FROM information_schema.tables \
                 WHERE table_type = 'BASE TABLE' \
                 AND table_schema NOT IN ('pg_catalog', 'information_schema') \
                 ORDER BY table_schema, table_name"
            }
            Flavor::PgAdapter => {
                "SELECT table_schema, table_name FROM information_schema.tables \
                 WHERE table_schema = '' ORDER BY table_name"
            }
        }
    }
}

impl Backend for Postgres {
    type Session = Client;

    fn profile(&self) -> &Profile {
        &self.profile
    }

    fn endpoint(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.profile.name, self.config.host, self.config.port, self.config.database
        )
    }

    fn connect(&self) -> Result<Client> {
        let port: u16 = self
            .config
            .port
            .parse()
            .map_err(|_| ShellError::connection(self.endpoint(), format!("invalid port '{}'", self.config.port)))?;

        let policy = self.config.tls_policy();
        let mut pg = postgres::Config::new();
        pg.host(&self.config.host)
            .port(port)
            .user(&self.config.user)
            .dbname(&self.config.database)
            .ssl_mode(policy.ssl_mode())
            .connect_timeout(CONNECT_TIMEOUT);
        if let Some(password) = &self.config.password {
            pg.password(password);
        }

        let connector = policy
            .connector()
            .map_err(|e| ShellError::connection(self.endpoint(), format!("TLS setup failed: {}", e)))?;
        let client = match connector {
            Some(tls) => pg.connect(tls),
            None => pg.connect(NoTls),
        };
        client.map_err(|e| ShellError::connection(self.endpoint(), e))
    }

    fn execute(&self, client: &mut Client, statement: &str) -> Result<Execution> {
        let frames = self.run(client, "execute", statement)?;
        Ok(fold_frames(frames).into())
    }

    fn list_entities(&self, client: &mut Client) -> Result<Vec<EntityDescriptor>> {
        let frames = self.run(client, "list tables", self.list_tables_sql())?;
        Ok(frames
            .into_iter()
            .filter_map(|frame| match frame {
                Frame::Row(values) => {
                    let schema = values.first().cloned().flatten().unwrap_or_default();
                    let table = values.get(1).cloned().flatten().unwrap_or_default();
                    Some(EntityDescriptor::named(table).detail("schema", Value::text(schema)))
                }
                _ => None,
            })
            .collect())
    }

    fn describe_cluster(&self, client: &mut Client, aspect: ClusterAspect) -> Result<ClusterInfo> {
        match aspect {
            ClusterAspect::Info => {
                let frames = self.run(
                    client,
                    "server info",
                    "SELECT version(), current_database(), current_user",
                )?;
                let row = frames
                    .into_iter()
                    .find_map(|f| match f {
                        Frame::Row(values) => Some(values),
                        _ => None,
                    })
                    .unwrap_or_default();
                let cell = |i: usize| row.get(i).cloned().flatten().unwrap_or_default();

                Ok(ClusterInfo::new("Cluster Information")
                    .field("Server", format!("{}:{}", self.config.host, self.config.port))
                    .field("Version", cell(0))
                    .field("Database", cell(1))
                    .field("User", cell(2)))
            }
            ClusterAspect::Health => {
                let started = Instant::now();
                self.run(client, "health check", "SELECT 1")?;
                let latency = started.elapsed();

                Ok(ClusterInfo::new("Cluster Health")
                    .field("Status", if client.is_closed() { "closed" } else { "ok" })
                    .field("Latency", format!("{}ms", latency.as_millis())))
            }
        }
    }
}
