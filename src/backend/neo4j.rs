//! # Graph Store Adapter
//!
//! Cypher statements are sent to the HTTP transactional endpoint
//! (`POST /db/{database}/tx/commit`) with statistics and graph metadata
//! enabled, so one round trip yields columns, rows, graph entities, and the
//! write counters.
//!
//! ## Decoding Graph Values
//!
//! Row cells carry plain property maps; the parallel `meta` entries say what
//! each cell really is. Nodes and relationships are rebuilt from the
//! response's `graph` section (labels, relationship types); paths are
//! recognized by their alternating node/relationship meta list.
//!
//! ```text
//! row:  [{"name": "Alice"}]            meta: [{"id": 4, "type": "node"}]
//! graph.nodes: [{"id": "4", "labels": ["Person"], "properties": {...}}]
//!   => (:Person {name: Alice})
//! ```
//!
//! ## Write Summary
//!
//! A statement returning no rows is reported through its counters, e.g.
//! `1 nodes created, 1 properties set`.

use crate::backend::http::{HttpEndpoint, HttpFailure};
use crate::backend::{Backend, ClusterAspect, ConnectMode, Execution, Profile, INFO_ALIASES};
use crate::cli::accumulator::Terminator;
use crate::config::{self, var_opt, var_or, CONNECT_TIMEOUT, GRAPH_REQUEST_TIMEOUT};
use crate::error::{Result, ShellError};
use crate::result::{normalize, ClusterInfo, EntityDescriptor, QueryResult, Record, SideEffects};
use crate::value::Value;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Map, Value as Json};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neo4jConfig {
    pub http_uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Neo4jConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(config::process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let http_uri = var_opt(&lookup, "NEO4J_HTTP_URI")
            .or_else(|| var_opt(&lookup, "NEO4J_URI").map(|uri| http_uri_for(&uri)))
            .unwrap_or_else(|| "http://localhost:7474".to_string());

        Self {
            http_uri: http_uri.trim_end_matches('/').to_string(),
            username: var_or(&lookup, "NEO4J_USER", "neo4j"),
            password: var_or(&lookup, "NEO4J_PASSWORD", "password"),
            database: var_or(&lookup, "NEO4J_DATABASE", "neo4j"),
        }
    }
}

/// Maps a `bolt://host:7687`-style URI onto the HTTP endpoint of the same host.
pub fn http_uri_for(uri: &str) -> String {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        return uri.to_string();
    }

    let host = uri
        .split("://")
        .nth(1)
        .unwrap_or(uri)
        .split(['/', ':'])
        .next()
        .filter(|h| !h.is_empty())
        .unwrap_or("localhost");
    format!("http://{}:7474", host)
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxRow>,
    #[serde(default)]
    stats: TxStats,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    #[serde(default)]
    row: Vec<Json>,
    #[serde(default)]
    meta: Vec<Json>,
    #[serde(default)]
    graph: TxGraph,
}

#[derive(Debug, Default, Deserialize)]
struct TxGraph {
    #[serde(default)]
    nodes: Vec<GraphNode>,
    #[serde(default)]
    relationships: Vec<GraphRelationship>,
}

#[derive(Debug, Deserialize)]
struct GraphNode {
    id: String,
    #[serde(rename = "elementId", default)]
    element_id: Option<String>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    properties: Map<String, Json>,
}

#[derive(Debug, Deserialize)]
struct GraphRelationship {
    id: String,
    #[serde(rename = "elementId", default)]
    element_id: Option<String>,
    #[serde(rename = "type")]
    rel_type: String,
    #[serde(default)]
    properties: Map<String, Json>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TxStats {
    nodes_created: u64,
    nodes_deleted: u64,
    relationships_created: u64,
    relationships_deleted: u64,
    properties_set: u64,
    labels_added: u64,
    labels_removed: u64,
    indexes_added: u64,
    indexes_removed: u64,
    constraints_added: u64,
    constraints_removed: u64,
}

impl TxStats {
    fn side_effects(&self) -> SideEffects {
        SideEffects::new()
            .with("nodes created", self.nodes_created)
            .with("nodes deleted", self.nodes_deleted)
            .with("relationships created", self.relationships_created)
            .with("relationships deleted", self.relationships_deleted)
            .with("properties set", self.properties_set)
            .with("labels added", self.labels_added)
            .with("labels removed", self.labels_removed)
            .with("indexes added", self.indexes_added)
            .with("indexes removed", self.indexes_removed)
            .with("constraints added", self.constraints_added)
            .with("constraints removed", self.constraints_removed)
    }
}

/// Identifies a graph entity by element id when present, numeric id otherwise.
fn matches_meta(meta: &Map<String, Json>, id: &str, element_id: Option<&str>) -> bool {
    if let (Some(Json::String(wanted)), Some(have)) = (meta.get("elementId"), element_id) {
        return wanted == have;
    }
    match meta.get("id") {
        Some(Json::Number(n)) => n.to_string() == id,
        Some(Json::String(s)) => s == id,
        _ => false,
    }
}

fn properties(map: &Map<String, Json>) -> Vec<(String, Value)> {
    map.iter()
        .map(|(k, v)| (k.clone(), Value::from_json(v)))
        .collect()
}

fn meta_kind(meta: &Json) -> Option<&str> {
    meta.get("type").and_then(Json::as_str)
}

fn is_path(metas: &[Json]) -> bool {
    metas.len() >= 3
        && metas.len() % 2 == 1
        && metas.iter().enumerate().all(|(i, m)| {
            let expected = if i % 2 == 0 { "node" } else { "relationship" };
            meta_kind(m) == Some(expected)
        })
}

fn decode_cell(value: &Json, meta: &Json, graph: &TxGraph) -> Value {
    match meta {
        Json::Object(m) => match meta_kind(meta) {
            Some("node") => graph
                .nodes
                .iter()
                .find(|n| matches_meta(m, &n.id, n.element_id.as_deref()))
                .map(|n| Value::Node {
                    labels: n.labels.clone(),
                    properties: properties(&n.properties),
                })
                .unwrap_or_else(|| Value::Node {
                    labels: Vec::new(),
                    properties: value.as_object().map(properties).unwrap_or_default(),
                }),
            Some("relationship") => graph
                .relationships
                .iter()
                .find(|r| matches_meta(m, &r.id, r.element_id.as_deref()))
                .map(|r| Value::Relationship {
                    rel_type: r.rel_type.clone(),
                    properties: properties(&r.properties),
                })
                .unwrap_or_else(|| Value::Relationship {
                    rel_type: String::new(),
                    properties: value.as_object().map(properties).unwrap_or_default(),
                }),
            _ => Value::from_json(value),
        },
        Json::Array(metas) if is_path(metas) => Value::Path {
            nodes: metas.len() / 2 + 1,
            relationships: metas.len() / 2,
        },
        Json::Array(metas) => match value {
            Json::Array(items) if items.len() == metas.len() => Value::List(
                items
                    .iter()
                    .zip(metas)
                    .map(|(item, meta)| decode_cell(item, meta, graph))
                    .collect(),
            ),
            _ => Value::from_json(value),
        },
        _ => Value::from_json(value),
    }
}

fn decode_result(result: &TxResult) -> (Vec<Record>, SideEffects) {
    let records = result
        .data
        .iter()
        .map(|row| {
            let fields = result
                .columns
                .iter()
                .enumerate()
                .map(|(i, column)| {
                    let value = row.row.get(i).unwrap_or(&Json::Null);
                    let meta = row.meta.get(i).unwrap_or(&Json::Null);
                    (column.clone(), decode_cell(value, meta, &row.graph))
                })
                .collect();
            Record::from_fields(fields)
        })
        .collect();

    (records, result.stats.side_effects())
}

/// Decodes a transactional endpoint response into records and counters.
/// Server-reported errors come back as `Err("Code: message")`.
fn decode_body(body: &str) -> std::result::Result<(Vec<Record>, SideEffects), String> {
    let response: TxResponse = serde_json::from_str(body).map_err(|e| e.to_string())?;

    if let Some(err) = response.errors.first() {
        return Err(format!("{}: {}", err.code, err.message));
    }

    Ok(response
        .results
        .first()
        .map(decode_result)
        .unwrap_or_default())
}

pub fn decode_response(body: &str) -> std::result::Result<QueryResult, String> {
    let (records, effects) = decode_body(body)?;
    Ok(normalize(&records, &effects))
}

pub struct Neo4jSession {
    endpoint: HttpEndpoint,
    commit_path: String,
}

pub struct Neo4j {
    config: Neo4jConfig,
    profile: Profile,
}

const STATEMENT_HELP: &str = r#"Cypher Examples (end with semicolon):
  CREATE (n:Person {name: 'Alice', age: 30});

  CREATE (n:Person {name: 'Bob', age: 25})
  CREATE (m:Person {name: 'Alice', age: 30})
  CREATE (n)-[:KNOWS]->(m);

  MATCH (n:Person) RETURN n.name, n.age;

  MATCH (n:Person)-[r:KNOWS]->(m:Person)
  RETURN n.name AS person1, m.name AS person2;"#;

impl Neo4j {
    pub fn new(config: Neo4jConfig) -> Self {
        let profile = Profile {
            name: "neo4j",
            primary_prompt: "neo4j> ",
            continuation_prompt: "    -> ",
            terminator: Terminator::Semicolon,
            connect: ConnectMode::Eager,
            entity_noun: "label",
            entity_aliases: &["labels", "\\l"],
            info_aliases: INFO_ALIASES,
            health_aliases: &["health", "\\health", "schema", "\\s"],
            farewell: "Goodbye! 👋",
            banner: vec![
                "🚀 Neo4j CLI for Neo4j Emulator".to_string(),
                "======================================".to_string(),
            ],
            statement_help: STATEMENT_HELP.to_string(),
            remediation: format!("Make sure Neo4j is running on {}", config.http_uri),
        };

        Self { config, profile }
    }

    fn run(&self, session: &mut Neo4jSession, operation: &str, statement: &str) -> Result<(Vec<Record>, SideEffects)> {
        let payload = json!({
            "statements": [{
                "statement": statement,
                "includeStats": true,
                "resultDataContents": ["row", "graph"],
            }]
        });

        let reply = session
            .endpoint
            .send("POST", &session.commit_path, Some(&payload.to_string()))
            .map_err(|e| match e {
                HttpFailure::Transport(msg) => ShellError::connection(self.endpoint(), msg),
                other => ShellError::query(operation, self.endpoint(), other),
            })?;

        decode_body(&reply.body).map_err(|msg| ShellError::query(operation, self.endpoint(), msg))
    }

    fn names(&self, session: &mut Neo4jSession, operation: &str, statements: &[&str]) -> Result<Vec<String>> {
        let mut last_err = None;
        for statement in statements {
            match self.run(session, operation, statement) {
                Ok((records, _)) => {
                    return Ok(records
                        .iter()
                        .filter_map(|r| r.names().next().and_then(|n| r.get(n)).map(Value::render))
                        .collect())
                }
                Err(err) if err.is_connection() => return Err(err),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| ShellError::query(operation, self.endpoint(), "no statement")))
    }
}

impl Backend for Neo4j {
    type Session = Neo4jSession;

    fn profile(&self) -> &Profile {
        &self.profile
    }

    fn endpoint(&self) -> String {
        format!("neo4j@{}", self.config.http_uri)
    }

    fn connect(&self) -> Result<Neo4jSession> {
        let credentials = STANDARD.encode(format!("{}:{}", self.config.username, self.config.password));
        let endpoint = HttpEndpoint::new(self.config.http_uri.clone(), CONNECT_TIMEOUT, GRAPH_REQUEST_TIMEOUT)
            .with_header("Authorization", format!("Basic {}", credentials))
            .with_header("Accept", "application/json");
        let commit_path = format!("/db/{}/tx/commit", self.config.database);

        let verify = json!({ "statements": [] }).to_string();
        match endpoint.send("POST", &commit_path, Some(&verify)) {
            Ok(_) => Ok(Neo4jSession {
                endpoint,
                commit_path,
            }),
            Err(HttpFailure::Status { code: 401, .. }) => Err(ShellError::connection(
                self.endpoint(),
                format!("authentication failed for user '{}'", self.config.username),
            )),
            Err(err) => Err(ShellError::connection(self.endpoint(), err)),
        }
    }

    fn execute(&self, session: &mut Neo4jSession, statement: &str) -> Result<Execution> {
        let (records, effects) = self.run(session, "execute", statement)?;
        Ok(normalize(&records, &effects).into())
    }

    fn list_entities(&self, session: &mut Neo4jSession) -> Result<Vec<EntityDescriptor>> {
        let labels = self.names(
            session,
            "list labels",
            &["CALL db.labels() YIELD label RETURN label ORDER BY label"],
        )?;
        Ok(labels.into_iter().map(EntityDescriptor::named).collect())
    }

    fn describe_cluster(&self, session: &mut Neo4jSession, aspect: ClusterAspect) -> Result<ClusterInfo> {
        match aspect {
            ClusterAspect::Info => {
                let (records, _) = self.run(
                    session,
                    "server info",
                    "CALL dbms.components() YIELD name, versions, edition RETURN name, versions, edition",
                )?;
                let mut info = ClusterInfo::new("Cluster Information")
                    .field("URI", &self.config.http_uri)
                    .field("Database", &self.config.database);
                for record in &records {
                    for name in record.names() {
                        let value = record.get(name).map(Value::render).unwrap_or_default();
                        info = info.field(capitalize(name), value);
                    }
                }
                Ok(info)
            }
            ClusterAspect::Health => {
                let constraints = self.names(
                    session,
                    "list constraints",
                    &["SHOW CONSTRAINTS YIELD name RETURN name", "CALL db.constraints()"],
                )?;
                let indexes = self.names(
                    session,
                    "list indexes",
                    &["SHOW INDEXES YIELD name RETURN name", "CALL db.indexes()"],
                )?;
                Ok(ClusterInfo::new("Schema")
                    .field("Constraints", join_or_none(&constraints))
                    .field("Indexes", join_or_none(&indexes)))
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bolt_uri_maps_to_http_port() {
        assert_eq!(http_uri_for("bolt://graph.local:7687"), "http://graph.local:7474");
        assert_eq!(http_uri_for("neo4j://localhost"), "http://localhost:7474");
        assert_eq!(http_uri_for("http://x:8474"), "http://x:8474");
    }

    #[test]
    fn config_defaults() {
        let config = Neo4jConfig::from_lookup(|_| None);
        assert_eq!(config.http_uri, "http://localhost:7474");
        assert_eq!(config.username, "neo4j");
        assert_eq!(config.password, "password");
        assert_eq!(config.database, "neo4j");
    }

    #[test]
    fn create_without_rows_reports_counters() {
        let body = r#"{"results":[{"columns":[],"data":[],"stats":{
            "contains_updates":true,"nodes_created":1,"nodes_deleted":0,
            "properties_set":1,"relationships_created":0,"labels_added":1}}],
            "errors":[]}"#;
        assert_eq!(
            decode_response(body).unwrap(),
            QueryResult::status("1 nodes created, 1 properties set, 1 labels added")
        );
    }

    #[test]
    fn plain_create_of_one_node_says_nodes_created() {
        let body = r#"{"results":[{"columns":[],"data":[],"stats":{"nodes_created":1}}],"errors":[]}"#;
        assert_eq!(decode_response(body).unwrap(), QueryResult::status("1 nodes created"));
    }

    #[test]
    fn empty_match_is_ok() {
        let body = r#"{"results":[{"columns":["n"],"data":[],"stats":{"contains_updates":false}}],"errors":[]}"#;
        assert_eq!(decode_response(body).unwrap(), QueryResult::status("OK"));
    }

    #[test]
    fn nodes_and_relationships_are_rebuilt_from_graph() {
        let body = r#"{"results":[{"columns":["n","r","name"],"data":[{
            "row":[{"name":"Alice"},{"since":2020},"Alice"],
            "meta":[{"id":4,"elementId":"4:x:4","type":"node","deleted":false},
                    {"id":9,"elementId":"5:x:9","type":"relationship","deleted":false},
                    null],
            "graph":{"nodes":[{"id":"4","elementId":"4:x:4","labels":["Person"],"properties":{"name":"Alice"}}],
                     "relationships":[{"id":"9","elementId":"5:x:9","type":"KNOWS","startNode":"4","endNode":"5","properties":{"since":2020}}]}
        }]}],"errors":[]}"#;

        match decode_response(body).unwrap() {
            QueryResult::Tabular { columns, rows } => {
                assert_eq!(columns, vec!["n", "r", "name"]);
                assert_eq!(rows[0], vec!["(:Person {name: Alice})", "[:KNOWS {since: 2020}]", "Alice"]);
            }
            other => panic!("Expected Tabular, got {:?}", other),
        }
    }

    #[test]
    fn path_meta_yields_counts() {
        let body = r#"{"results":[{"columns":["p"],"data":[{
            "row":[[{"name":"A"},{},{"name":"B"}]],
            "meta":[[{"id":1,"type":"node"},{"id":2,"type":"relationship"},{"id":3,"type":"node"}]],
            "graph":{"nodes":[],"relationships":[]}
        }]}],"errors":[]}"#;

        match decode_response(body).unwrap() {
            QueryResult::Tabular { rows, .. } => assert_eq!(rows[0][0], "Path[2 nodes, 1 relationships]"),
            other => panic!("Expected Tabular, got {:?}", other),
        }
    }

    #[test]
    fn list_of_nodes_decodes_each_member() {
        let body = r#"{"results":[{"columns":["ns"],"data":[{
            "row":[[{"name":"A"},{"name":"B"}]],
            "meta":[[{"id":1,"type":"node"},{"id":2,"type":"node"}]],
            "graph":{"nodes":[{"id":"1","labels":["X"],"properties":{"name":"A"}},
                              {"id":"2","labels":["Y"],"properties":{"name":"B"}}],"relationships":[]}
        }]}],"errors":[]}"#;

        match decode_response(body).unwrap() {
            QueryResult::Tabular { rows, .. } => {
                assert_eq!(rows[0][0], "[(:X {name: A}), (:Y {name: B})]")
            }
            other => panic!("Expected Tabular, got {:?}", other),
        }
    }

    #[test]
    fn server_errors_surface_code_and_message() {
        let body = r#"{"results":[],"errors":[{"code":"Neo.ClientError.Statement.SyntaxError","message":"Invalid input"}]}"#;
        assert_eq!(
            decode_response(body).unwrap_err(),
            "Neo.ClientError.Statement.SyntaxError: Invalid input"
        );
    }

    #[test]
    fn capitalize_first_letter() {
        assert_eq!(capitalize("versions"), "Versions");
        assert_eq!(capitalize(""), "");
    }
}
