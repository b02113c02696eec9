//! # Wide-Column Store Adapter
//!
//! A verb shell over the Bigtable gRPC API, aimed at the local emulator
//! (`BIGTABLE_EMULATOR_HOST`). Each input line is one command; there is no
//! multi-line accumulation.
//!
//! | Verb | Arguments | Effect |
//! |------|-----------|--------|
//! | `init` | `[instance] [cluster] [zone] [nodes]` | ensure the instance exists |
//! | `create` | `<table> [cf]` | create table and column family |
//! | `delete` | `<table>` | drop table |
//! | `put` | `<table> <row> <family:col> <value...>` | write one cell |
//! | `get` | `<table> <row> [family:col]` | read one row |
//! | `scan` | `<table> [limit]` | read the first rows |
//!
//! `ReadRows` answers with a stream of cell chunks that are reassembled by
//! [`ChunkAssembler`]: a chunk inherits row key, family and qualifier from
//! the previous chunk of the same row, and a cell value may be split over
//! several chunks (`value_size` announces the remainder).
//!
//! The emulator implements the data and table-admin services only, so
//! `init` and `health` treat an `UNIMPLEMENTED` instance-admin answer as an
//! emulator that serves every instance.

pub mod grpc;
pub mod proto;

use crate::backend::{Backend, ClusterAspect, ConnectMode, Execution, Profile, HEALTH_ALIASES, INFO_ALIASES};
use crate::cli::accumulator::Terminator;
use crate::config::{self, var_or, CONNECT_TIMEOUT, DEFAULT_SCAN_LIMIT, WIDE_COLUMN_REQUEST_TIMEOUT};
use crate::error::{Result, ShellError};
use crate::result::{ClusterInfo, EntityDescriptor, QueryResult};
use grpc::{GrpcChannel, RpcFailure};
use proto::{CellChunk, ReadRowsResponse, RowStatus};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tonic::Code;

const DEFAULT_EMULATOR_HOST: &str = "localhost:8086";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigtableConfig {
    pub project: String,
    pub instance: String,
    /// `host:port` of the emulator.
    pub emulator_host: String,
}

impl BigtableConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(config::process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            project: var_or(&lookup, "BIGTABLE_PROJECT", "test-project"),
            instance: var_or(&lookup, "BIGTABLE_INSTANCE", "test-instance"),
            emulator_host: var_or(&lookup, "BIGTABLE_EMULATOR_HOST", DEFAULT_EMULATOR_HOST),
        }
    }

    /// gRPC target URI; a bare `host:port` is dialed in plaintext.
    pub fn target(&self) -> String {
        if self.emulator_host.contains("://") {
            self.emulator_host.clone()
        } else {
            format!("http://{}", self.emulator_host)
        }
    }

    fn instance_name(&self, instance: &str) -> String {
        format!("projects/{}/instances/{}", self.project, instance)
    }

    fn table_name(&self, table: &str) -> String {
        format!("{}/tables/{}", self.instance_name(&self.instance), table)
    }
}

/// One parsed verb line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WideColumnCommand {
    Init {
        instance: String,
        cluster: String,
        zone: String,
        nodes: u32,
    },
    Create {
        table: String,
        family: String,
    },
    Delete {
        table: String,
    },
    Put {
        table: String,
        row: String,
        family: String,
        qualifier: String,
        value: String,
    },
    Get {
        table: String,
        row: String,
        column: Option<(String, String)>,
    },
    Scan {
        table: String,
        limit: u32,
    },
}

const PUT_USAGE: &str = "put <table> <row> <family:col> <value>";

impl WideColumnCommand {
    pub fn parse(line: &str, default_instance: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let verb = parts.first().map(|v| v.to_lowercase()).unwrap_or_default();
        let arg = |i: usize| parts.get(i).map(|s| s.to_string());

        match verb.as_str() {
            "init" | "init-instance" => Ok(Self::Init {
                instance: arg(1).unwrap_or_else(|| default_instance.to_string()),
                cluster: arg(2).unwrap_or_else(|| "test-cluster".to_string()),
                zone: arg(3).unwrap_or_else(|| "us-central1-f".to_string()),
                nodes: parts.get(4).and_then(|n| n.parse().ok()).unwrap_or(1),
            }),
            "create" => match arg(1) {
                Some(table) => Ok(Self::Create {
                    table,
                    family: arg(2).unwrap_or_else(|| "cf1".to_string()),
                }),
                None => Err(ShellError::malformed("create <table> [cf]")),
            },
            "delete" => match arg(1) {
                Some(table) => Ok(Self::Delete { table }),
                None => Err(ShellError::malformed("delete <table>")),
            },
            "put" => {
                if parts.len() < 5 {
                    return Err(ShellError::malformed(PUT_USAGE));
                }
                let (family, qualifier) =
                    split_column(parts[3]).ok_or_else(|| ShellError::malformed(PUT_USAGE))?;
                Ok(Self::Put {
                    table: parts[1].to_string(),
                    row: parts[2].to_string(),
                    family,
                    qualifier,
                    value: parts[4..].join(" "),
                })
            }
            "get" => {
                if parts.len() < 3 {
                    return Err(ShellError::malformed("get <table> <row> [family:col]"));
                }
                Ok(Self::Get {
                    table: parts[1].to_string(),
                    row: parts[2].to_string(),
                    column: parts.get(3).and_then(|c| split_column(c)),
                })
            }
            "scan" => match arg(1) {
                Some(table) => Ok(Self::Scan {
                    table,
                    limit: parts
                        .get(2)
                        .and_then(|n| n.parse().ok())
                        .filter(|n| *n > 0)
                        .unwrap_or(DEFAULT_SCAN_LIMIT),
                }),
                None => Err(ShellError::malformed("scan <table> [limit]")),
            },
            _ => Err(ShellError::UnknownCommand(verb)),
        }
    }
}

fn split_column(column: &str) -> Option<(String, String)> {
    column.split_once(':')
        .map(|(f, c)| (f.to_string(), c.to_string()))
}

/// A fully assembled cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub family: String,
    pub qualifier: Vec<u8>,
    pub timestamp_micros: i64,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCells {
    pub key: Vec<u8>,
    pub cells: Vec<Cell>,
}

/// Folds `ReadRows` chunks into committed rows.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    rows: Vec<RowCells>,
    current: Option<RowCells>,
    family: String,
    qualifier: Vec<u8>,
    timestamp: i64,
    pending: Vec<u8>,
    // inside a value split across chunks
    splitting: bool,
}

impl ChunkAssembler {
    pub fn push(&mut self, chunk: CellChunk) -> std::result::Result<(), String> {
        if let Some(RowStatus::ResetRow(true)) = chunk.row_status {
            self.current = None;
            self.pending.clear();
            self.splitting = false;
            return Ok(());
        }

        if !chunk.row_key.is_empty()
            && self.current.as_ref().map(|r| r.key != chunk.row_key).unwrap_or(true)
        {
            self.current = Some(RowCells {
                key: chunk.row_key,
                cells: Vec::new(),
            });
        }
        if let Some(name) = chunk.family_name {
            self.family = name.value;
        }
        if let Some(q) = chunk.qualifier {
            self.qualifier = q.value;
        }
        if !self.splitting {
            self.timestamp = chunk.timestamp_micros;
        }
        self.pending.extend(chunk.value);

        let row = self
            .current
            .as_mut()
            .ok_or_else(|| "cell chunk without a row key".to_string())?;
        self.splitting = chunk.value_size > 0;
        if !self.splitting {
            row.cells.push(Cell {
                family: self.family.clone(),
                qualifier: self.qualifier.clone(),
                timestamp_micros: self.timestamp,
                value: std::mem::take(&mut self.pending),
            });
        }

        if let Some(RowStatus::CommitRow(true)) = chunk.row_status {
            if let Some(done) = self.current.take() {
                self.rows.push(done);
            }
        }
        Ok(())
    }

    /// Committed rows; an uncommitted trailing row is dropped.
    pub fn finish(self) -> Vec<RowCells> {
        self.rows
    }
}

pub fn assemble_rows(responses: Vec<ReadRowsResponse>) -> std::result::Result<Vec<RowCells>, String> {
    let mut assembler = ChunkAssembler::default();
    for chunk in responses.into_iter().flat_map(|r| r.chunks) {
        assembler.push(chunk)?;
    }
    Ok(assembler.finish())
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// `Family | Column | Timestamp(us) | Value` for one row, optionally
/// narrowed to a single `family:qualifier`.
pub fn row_table(rows: &[RowCells], column: Option<&(String, String)>) -> QueryResult {
    let columns = ["Family", "Column", "Timestamp(us)", "Value"]
        .iter()
        .map(|c| c.to_string())
        .collect();

    let body = rows
        .iter()
        .flat_map(|row| &row.cells)
        .filter(|cell| match column {
            Some((family, qualifier)) => {
                &cell.family == family && cell.qualifier == qualifier.as_bytes()
            }
            None => true,
        })
        .map(|cell| {
            vec![
                cell.family.clone(),
                format!("{}:{}", cell.family, lossy(&cell.qualifier)),
                cell.timestamp_micros.to_string(),
                lossy(&cell.value),
            ]
        })
        .collect();

    QueryResult::tabular(columns, body)
}

/// `RowKey | Family | Column | Value` across scanned rows.
pub fn scan_table(rows: &[RowCells]) -> QueryResult {
    let columns = ["RowKey", "Family", "Column", "Value"]
        .iter()
        .map(|c| c.to_string())
        .collect();

    let body = rows
        .iter()
        .flat_map(|row| {
            row.cells.iter().map(move |cell| {
                vec![
                    lossy(&row.key),
                    cell.family.clone(),
                    format!("{}:{}", cell.family, lossy(&cell.qualifier)),
                    lossy(&cell.value),
                ]
            })
        })
        .collect();

    QueryResult::tabular(columns, body)
}

/// Current time in microseconds at millisecond granularity, the finest
/// granularity a default table accepts.
fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64 * 1000)
        .unwrap_or_default()
}

pub struct BigtableSession {
    channel: GrpcChannel,
}

pub struct Bigtable {
    config: BigtableConfig,
    profile: Profile,
}

const STATEMENT_HELP: &str = r#"Wide-column commands (one per line):
  init [instance] [cluster] [zone] [nodes] - Ensure instance/cluster exist (defaults: test-instance, test-cluster, us-central1-f, 1)
  create <table> [cf]    - Create table with column family (default: cf1)
  delete <table>         - Delete table
  put <table> <row> <family:col> <value>  - Write a cell
  get <table> <row> [family:col]         - Read a row/cell
  scan <table> [limit]   - Scan first N rows (default 10)

Env:
  BIGTABLE_EMULATOR_HOST=host:port (default: localhost:8086)
  BIGTABLE_PROJECT (default: test-project)
  BIGTABLE_INSTANCE (default: test-instance)"#;

impl Bigtable {
    pub fn new(config: BigtableConfig) -> Self {
        let banner = vec![
            "🚀 Bigtable CLI (Emulator)".to_string(),
            "======================================".to_string(),
            format!("Project: {}  Instance: {}", config.project, config.instance),
            format!("Emulator: {}", config.emulator_host),
        ];

        let profile = Profile {
            name: "bigtable",
            primary_prompt: "bigtable> ",
            continuation_prompt: "bigtable> ",
            terminator: Terminator::Newline,
            connect: ConnectMode::Lazy,
            entity_noun: "table",
            entity_aliases: &["tables", "\\lt"],
            info_aliases: INFO_ALIASES,
            health_aliases: HEALTH_ALIASES,
            farewell: "Goodbye! 👋",
            banner,
            statement_help: STATEMENT_HELP.to_string(),
            remediation: "💡 Ensure emulator is running and instance exists, or run 'help'.".to_string(),
        };

        Self { config, profile }
    }

    fn failure(&self, operation: &str, err: RpcFailure) -> ShellError {
        match err {
            RpcFailure::Transport(msg) => ShellError::connection(self.endpoint(), msg),
            status => ShellError::query(operation, self.endpoint(), status),
        }
    }

    fn init(&self, session: &BigtableSession, instance: &str, cluster: &str, zone: &str, nodes: u32) -> Result<QueryResult> {
        let name = self.config.instance_name(instance);
        let lookup: std::result::Result<proto::Instance, RpcFailure> = session
            .channel
            .unary(proto::GET_INSTANCE, proto::GetInstanceRequest { name });

        match lookup {
            Ok(_) => {}
            Err(err) if err.code() == Some(Code::Unimplemented) => {
                return Ok(QueryResult::status(format!(
                    "Instance {} ready with cluster {} (emulator)",
                    instance, cluster
                )));
            }
            Err(err @ RpcFailure::Transport(_)) => return Err(self.failure("get instance", err)),
            Err(_) => {
                let mut clusters = HashMap::new();
                clusters.insert(
                    cluster.to_string(),
                    proto::Cluster {
                        name: String::new(),
                        location: format!("projects/{}/locations/{}", self.config.project, zone),
                        serve_nodes: nodes as i32,
                    },
                );
                let request = proto::CreateInstanceRequest {
                    parent: format!("projects/{}", self.config.project),
                    instance_id: instance.to_string(),
                    instance: Some(proto::Instance {
                        name: String::new(),
                        display_name: instance.to_string(),
                        state: 0,
                    }),
                    clusters,
                };
                let _: proto::Operation = session
                    .channel
                    .unary(proto::CREATE_INSTANCE, request)
                    .map_err(|e| self.failure("create instance", e))?;
            }
        }

        Ok(QueryResult::status(format!(
            "Instance {} ready with cluster {}",
            instance, cluster
        )))
    }

    fn create(&self, session: &BigtableSession, table: &str, family: &str) -> Result<QueryResult> {
        let create = proto::CreateTableRequest {
            parent: self.config.instance_name(&self.config.instance),
            table_id: table.to_string(),
            table: Some(proto::Table {
                name: String::new(),
                column_families: HashMap::new(),
            }),
        };
        match session.channel.unary::<_, proto::Table>(proto::CREATE_TABLE, create) {
            Ok(_) => {}
            Err(err) if err.already_exists() => {}
            Err(err) => return Err(self.failure("create table", err)),
        }

        let modify = proto::ModifyColumnFamiliesRequest {
            name: self.config.table_name(table),
            modifications: vec![proto::Modification {
                id: family.to_string(),
                kind: Some(proto::ModificationKind::Create(proto::ColumnFamily {})),
            }],
        };
        match session.channel.unary::<_, proto::Table>(proto::MODIFY_COLUMN_FAMILIES, modify) {
            Ok(_) => {}
            Err(err) if err.already_exists() => {}
            Err(err) => return Err(self.failure("create column family", err)),
        }

        Ok(QueryResult::status(format!("Table {} (cf={}) ready", table, family)))
    }

    fn read_rows(&self, session: &BigtableSession, request: proto::ReadRowsRequest) -> Result<Vec<RowCells>> {
        let responses = session
            .channel
            .read_rows(proto::READ_ROWS, request)
            .map_err(|e| self.failure("read rows", e))?;

        assemble_rows(responses).map_err(|msg| ShellError::query("read rows", self.endpoint(), msg))
    }

    fn table_names(&self, session: &BigtableSession) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut page_token = String::new();
        loop {
            let request = proto::ListTablesRequest {
                parent: self.config.instance_name(&self.config.instance),
                page_token,
            };
            let page: proto::ListTablesResponse = session
                .channel
                .unary(proto::LIST_TABLES, request)
                .map_err(|e| self.failure("list tables", e))?;

            names.extend(
                page.tables
                    .iter()
                    .map(|t| t.name.rsplit('/').next().unwrap_or(&t.name).to_string()),
            );
            if page.next_page_token.is_empty() {
                return Ok(names);
            }
            page_token = page.next_page_token;
        }
    }
}

impl Backend for Bigtable {
    type Session = BigtableSession;

    fn profile(&self) -> &Profile {
        &self.profile
    }

    fn endpoint(&self) -> String {
        format!("bigtable@{}/{}", self.config.emulator_host, self.config.instance)
    }

    /// Builds the channel without any network traffic; the first verb
    /// surfaces an unreachable emulator.
    fn connect(&self) -> Result<BigtableSession> {
        let channel = GrpcChannel::open(&self.config.target(), CONNECT_TIMEOUT, WIDE_COLUMN_REQUEST_TIMEOUT)
            .map_err(|e| ShellError::connection(self.endpoint(), e))?;
        Ok(BigtableSession { channel })
    }

    fn execute(&self, session: &mut BigtableSession, statement: &str) -> Result<Execution> {
        let command = WideColumnCommand::parse(statement, &self.config.instance)?;

        let result = match command {
            WideColumnCommand::Init {
                instance,
                cluster,
                zone,
                nodes,
            } => self.init(session, &instance, &cluster, &zone, nodes)?,
            WideColumnCommand::Create { table, family } => self.create(session, &table, &family)?,
            WideColumnCommand::Delete { table } => {
                let request = proto::DeleteTableRequest {
                    name: self.config.table_name(&table),
                };
                let _: proto::Empty = session
                    .channel
                    .unary(proto::DELETE_TABLE, request)
                    .map_err(|e| self.failure("delete table", e))?;
                QueryResult::status(format!("Dropped {}", table))
            }
            WideColumnCommand::Put {
                table,
                row,
                family,
                qualifier,
                value,
            } => {
                let request = proto::MutateRowRequest {
                    table_name: self.config.table_name(&table),
                    row_key: row.clone().into_bytes(),
                    mutations: vec![proto::Mutation {
                        mutation: Some(proto::MutationKind::SetCell(proto::SetCell {
                            family_name: family.clone(),
                            column_qualifier: qualifier.clone().into_bytes(),
                            timestamp_micros: now_micros(),
                            value: value.into_bytes(),
                        })),
                    }],
                    app_profile_id: String::new(),
                };
                let _: proto::Empty = session
                    .channel
                    .unary(proto::MUTATE_ROW, request)
                    .map_err(|e| self.failure("mutate row", e))?;
                QueryResult::status(format!("Wrote row={} {}:{}", row, family, qualifier))
            }
            WideColumnCommand::Get { table, row, column } => {
                let request = proto::ReadRowsRequest {
                    table_name: self.config.table_name(&table),
                    rows: Some(proto::RowSet {
                        row_keys: vec![row.into_bytes()],
                    }),
                    rows_limit: 0,
                    app_profile_id: String::new(),
                };
                let rows = self.read_rows(session, request)?;
                row_table(&rows, column.as_ref())
            }
            WideColumnCommand::Scan { table, limit } => {
                let request = proto::ReadRowsRequest {
                    table_name: self.config.table_name(&table),
                    rows: None,
                    rows_limit: i64::from(limit),
                    app_profile_id: String::new(),
                };
                let rows = self.read_rows(session, request)?;
                scan_table(&rows)
            }
        };

        Ok(result.into())
    }

    fn list_entities(&self, session: &mut BigtableSession) -> Result<Vec<EntityDescriptor>> {
        Ok(self
            .table_names(session)?
            .into_iter()
            .map(EntityDescriptor::named)
            .collect())
    }

    fn describe_cluster(&self, session: &mut BigtableSession, aspect: ClusterAspect) -> Result<ClusterInfo> {
        match aspect {
            ClusterAspect::Info => Ok(ClusterInfo::new("Cluster Information")
                .field("Project", &self.config.project)
                .field("Instance", &self.config.instance)
                .field("Endpoint", session.channel.target())
                .field("Emulator", &self.config.emulator_host)),
            ClusterAspect::Health => {
                let tables = self.table_names(session)?.len();
                let name = self.config.instance_name(&self.config.instance);
                let lookup: std::result::Result<proto::Instance, RpcFailure> = session
                    .channel
                    .unary(proto::GET_INSTANCE, proto::GetInstanceRequest { name: name.clone() });

                let info = ClusterInfo::new("Cluster Health");
                match lookup {
                    Ok(instance) => {
                        let clusters: proto::ListClustersResponse = session
                            .channel
                            .unary(proto::LIST_CLUSTERS, proto::ListClustersRequest { parent: name })
                            .map_err(|e| self.failure("list clusters", e))?;
                        Ok(info
                            .field("Instance", instance.display_name)
                            .field("State", proto::instance_state_name(instance.state))
                            .field("Clusters", clusters.clusters.len())
                            .field("Tables", tables))
                    }
                    Err(err) if err.code() == Some(Code::Unimplemented) => Ok(info
                        .field("Instance", &self.config.instance)
                        .field("State", "SERVING (emulator)")
                        .field("Tables", tables)),
                    Err(err) => Err(self.failure("get instance", err)),
                }
            }
        }
    }
}
