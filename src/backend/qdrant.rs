//! # Vector Search Store Adapter
//!
//! Same statement form as the document store, `METHOD /path [json body]`:
//!
//! ```text
//! PUT /collections/demo {"vectors": {"size": 4, "distance": "Cosine"}};
//! POST /collections/demo/points/search {"vector": [0.1, 0.2, 0.3, 0.4], "limit": 5};
//! ```
//!
//! Search hits and scrolled points are tabulated with their payload fields
//! spliced in. Creating a collection is convergence-sensitive: the shell
//! waits for the collection status to turn green.

use crate::backend::document::{
    body_status, lookup, lookup_str, lookup_u64, records_from_objects, table_or_body,
};
use crate::backend::http::{HttpEndpoint, HttpFailure};
use crate::backend::{
    split_http_statement, Backend, ClusterAspect, ConnectMode, Execution, PollStatus, Profile,
    ReadinessTarget, HEALTH_ALIASES, INFO_ALIASES,
};
use crate::cli::accumulator::Terminator;
use crate::config::{self, var_opt, var_or, CONNECT_TIMEOUT, VECTOR_REQUEST_TIMEOUT};
use crate::error::{Result, ShellError};
use crate::result::{ClusterInfo, EntityDescriptor, QueryResult};
use crate::value::Value;
use serde_json::Value as Json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QdrantConfig {
    pub host: String,
    pub port: String,
    pub api_key: Option<String>,
}

impl QdrantConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(config::process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            host: var_or(&lookup, "QDRANT_HOST", "localhost"),
            port: var_or(&lookup, "QDRANT_PORT", "6333"),
            api_key: var_opt(&lookup, "QDRANT_API_KEY"),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

pub struct Qdrant {
    config: QdrantConfig,
    profile: Profile,
}

const STATEMENT_HELP: &str = r#"API Commands (end with semicolon):
  GET /collections;
  GET /collections/{collection_name};
  PUT /collections/{collection_name} {"vectors": {"size": 4, "distance": "Cosine"}};
  DELETE /collections/{collection_name};
  PUT /collections/{collection_name}/points {"points": [...]};
  POST /collections/{collection_name}/points/search {"vector": [...], "limit": 10};

Examples:
  PUT /collections/test_collection {"vectors": {"size": 4, "distance": "Cosine"}};
  PUT /collections/test_collection/points {"points": [{"id": 1, "vector": [0.1, 0.2, 0.3, 0.4]}]};
  POST /collections/test_collection/points/search {"vector": [0.1, 0.2, 0.3, 0.4], "limit": 5};"#;

impl Qdrant {
    pub fn new(config: QdrantConfig) -> Self {
        let profile = Profile {
            name: "qdrant",
            primary_prompt: "qdrant> ",
            continuation_prompt: "... ",
            terminator: Terminator::Semicolon,
            connect: ConnectMode::Lazy,
            entity_noun: "collection",
            entity_aliases: &["\\l", "\\collections", "collections"],
            info_aliases: INFO_ALIASES,
            health_aliases: HEALTH_ALIASES,
            farewell: "Bye!",
            banner: vec![format!("Connected to Qdrant at {}:{}", config.host, config.port)],
            statement_help: STATEMENT_HELP.to_string(),
            remediation: format!(
                "Make sure Qdrant is reachable at {}:{} (QDRANT_HOST, QDRANT_PORT)",
                config.host, config.port
            ),
        };

        Self { config, profile }
    }

    fn failure(&self, operation: &str, err: HttpFailure) -> ShellError {
        match err {
            HttpFailure::Transport(msg) => ShellError::connection(self.endpoint(), msg),
            other => ShellError::query(operation, self.endpoint(), other),
        }
    }
}

/// Collection name when `method path` creates a collection.
pub fn created_collection(method: &str, path: &str) -> Option<String> {
    if method != "PUT" {
        return None;
    }

    let path = path.split('?').next().unwrap_or(path);
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        ["collections", name] if !name.is_empty() => Some(name.to_string()),
        _ => None,
    }
}

pub fn normalize_response(body: &str) -> QueryResult {
    let json: Json = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(_) => return body_status(body),
    };

    let hits = match lookup(&json, "result") {
        Some(Json::Array(items)) => Some(items),
        Some(result) => ["points", "collections"]
            .iter()
            .find_map(|key| result.get(key).and_then(Json::as_array)),
        None => None,
    };

    match hits {
        Some(items) => table_or_body(&records_from_objects(items, &["payload"]), body),
        None => body_status(body),
    }
}

impl Backend for Qdrant {
    type Session = HttpEndpoint;

    fn profile(&self) -> &Profile {
        &self.profile
    }

    fn endpoint(&self) -> String {
        format!("qdrant@{}:{}", self.config.host, self.config.port)
    }

    fn connect(&self) -> Result<HttpEndpoint> {
        let mut session =
            HttpEndpoint::new(self.config.base_url(), CONNECT_TIMEOUT, VECTOR_REQUEST_TIMEOUT);
        if let Some(key) = &self.config.api_key {
            session = session.with_header("api-key", key.clone());
        }
        session
            .ping("/")
            .map_err(|e| ShellError::connection(self.endpoint(), e))?;
        Ok(session)
    }

    fn execute(&self, session: &mut HttpEndpoint, statement: &str) -> Result<Execution> {
        let (method, path, body) = split_http_statement(statement)?;
        let reply = session
            .send(&method, &path, body.as_deref())
            .map_err(|e| self.failure(&format!("{} {}", method, path), e))?;

        Ok(Execution {
            result: normalize_response(&reply.body),
            readiness: created_collection(&method, &path).map(|target| ReadinessTarget { target }),
        })
    }

    fn list_entities(&self, session: &mut HttpEndpoint) -> Result<Vec<EntityDescriptor>> {
        let json = session
            .get_json("/collections")
            .map_err(|e| self.failure("list collections", e))?;

        let names: Vec<String> = lookup(&json, "result.collections")
            .and_then(Json::as_array)
            .map(|items| items.iter().map(|c| lookup_str(c, "name")).collect())
            .unwrap_or_default();

        let mut entities = Vec::with_capacity(names.len());
        for name in names {
            let details = session
                .get_json(&format!("/collections/{}", name))
                .map_err(|e| self.failure(&format!("describe collection {}", name), e))?;
            let result = details.get("result").cloned().unwrap_or(Json::Null);

            let config = format!(
                "size={}, distance={}",
                lookup_str(&result, "config.params.vectors.size"),
                lookup_str(&result, "config.params.vectors.distance")
            );
            entities.push(
                EntityDescriptor::named(name)
                    .detail("status", Value::text(lookup_str(&result, "status")))
                    .detail("points", Value::Int(lookup_u64(&result, "points_count") as i64))
                    .detail("vectors", Value::from_json(lookup(&result, "vectors_count").unwrap_or(&Json::Null)))
                    .detail("config", Value::text(config)),
            );
        }
        Ok(entities)
    }

    fn describe_cluster(&self, session: &mut HttpEndpoint, aspect: ClusterAspect) -> Result<ClusterInfo> {
        match aspect {
            ClusterAspect::Info => {
                let json = session.get_json("/").map_err(|e| self.failure("cluster info", e))?;
                Ok(ClusterInfo::new("Cluster Information")
                    .field("Title", lookup_str(&json, "title"))
                    .field("Version", lookup_str(&json, "version"))
                    .field("Commit", lookup_str(&json, "commit")))
            }
            ClusterAspect::Health => {
                let ready = session
                    .send("GET", "/readyz", None)
                    .map_err(|e| self.failure("readiness check", e))?;
                let cluster = session
                    .get_json("/cluster")
                    .map_err(|e| self.failure("cluster status", e))?;
                Ok(ClusterInfo::new("Cluster Health")
                    .field("Ready", ready.body.trim())
                    .field("Cluster Mode", lookup_str(&cluster, "result.status"))
                    .field("Peer ID", lookup_str(&cluster, "result.peer_id")))
            }
        }
    }

    fn check_readiness(&self, session: &mut HttpEndpoint, target: &ReadinessTarget) -> Result<PollStatus> {
        let json = session
            .get_json(&format!("/collections/{}", target.target))
            .map_err(|e| self.failure("collection status", e))?;

        Ok(collection_poll_status(&json))
    }
}

/// A collection is ready once its `status` reads green; the optimizer may
/// still be running.
fn collection_poll_status(json: &Json) -> PollStatus {
    PollStatus {
        state: lookup_str(json, "result.status"),
        pending: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = QdrantConfig::from_lookup(|_| None);
        assert_eq!(config.base_url(), "http://localhost:6333");
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn collection_creation_is_detected() {
        assert_eq!(created_collection("PUT", "/collections/demo"), Some("demo".to_string()));
        assert_eq!(created_collection("PUT", "/collections/demo/points"), None);
        assert_eq!(created_collection("DELETE", "/collections/demo"), None);
        assert_eq!(created_collection("PUT", "/collections/"), None);
    }

    #[test]
    fn green_collection_converges_while_optimizing() {
        let backend = Qdrant::new(QdrantConfig::from_lookup(|_| None));
        let status = |body: &str| collection_poll_status(&serde_json::from_str(body).unwrap());

        let optimizing = status(r#"{"result": {"status": "green", "optimizer_status": {"error": "indexing"}}}"#);
        assert!(backend.is_converged(&optimizing));

        let yellow = status(r#"{"result": {"status": "yellow", "optimizer_status": "ok"}}"#);
        assert!(!backend.is_converged(&yellow));

        assert_eq!(status(r#"{"status": "ok"}"#).state, "");
    }

    #[test]
    fn search_hits_splice_payload() {
        let body = r#"{"result": [
            {"id": 1, "version": 0, "score": 0.99, "payload": {"city": "Berlin"}},
            {"id": 2, "version": 0, "score": 0.5, "payload": {"city": "London"}}
        ], "status": "ok", "time": 0.001}"#;

        match normalize_response(body) {
            QueryResult::Tabular { columns, rows } => {
                assert_eq!(columns, vec!["id", "version", "score", "city"]);
                assert_eq!(rows[0], vec!["1", "0", "0.99", "Berlin"]);
            }
            other => panic!("Expected Tabular, got {:?}", other),
        }
    }

    #[test]
    fn scrolled_points_become_rows() {
        let body = r#"{"result": {"points": [{"id": 7, "payload": {"tags": ["a", null]}}], "next_page_offset": null}}"#;
        match normalize_response(body) {
            QueryResult::Tabular { columns, rows } => {
                assert_eq!(columns, vec!["id", "tags"]);
                assert_eq!(rows[0], vec!["7", "[a, NULL]"]);
            }
            other => panic!("Expected Tabular, got {:?}", other),
        }
    }

    #[test]
    fn operation_result_is_pretty_status() {
        let body = r#"{"result":true,"status":"ok","time":0.02}"#;
        match normalize_response(body) {
            QueryResult::Status { message } => assert!(message.contains("\"status\": \"ok\"")),
            other => panic!("Expected Status, got {:?}", other),
        }
    }
}
