//! # Document / Search Store Adapter
//!
//! Statements are raw REST calls: `METHOD /path [json body]`, for example
//! `GET /books/_search {"query": {"match_all": {}}};`.
//!
//! ## Result Shapes
//!
//! - search responses (`hits.hits`) become a table of `_index`, `_id`,
//!   `_score` followed by the `_source` fields of the first hit
//! - JSON arrays of objects (`_cat/*?format=json`) become a table
//! - everything else is shown pretty-printed
//!
//! ## Convergence
//!
//! `PUT /<index>` creates an index whose shards start asynchronously. The
//! shell then polls `/_cluster/health/<index>` until the status is green or
//! yellow with no initializing shards.

use crate::backend::document::{
    body_status, lookup, lookup_str, lookup_u64, records_from_objects, table_or_body,
};
use crate::backend::http::{HttpEndpoint, HttpFailure};
use crate::backend::{
    split_http_statement, Backend, ClusterAspect, ConnectMode, Execution, PollStatus, Profile,
    ReadinessTarget, HEALTH_ALIASES, INFO_ALIASES,
};
use crate::cli::accumulator::Terminator;
use crate::config::{self, var_or, CONNECT_TIMEOUT, DOCUMENT_REQUEST_TIMEOUT};
use crate::error::{Result, ShellError};
use crate::result::{ClusterInfo, EntityDescriptor, QueryResult};
use crate::value::Value;
use serde_json::Value as Json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElasticsearchConfig {
    pub host: String,
    pub port: String,
}

impl ElasticsearchConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(config::process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            host: var_or(&lookup, "ELASTICSEARCH_HOST", "localhost"),
            port: var_or(&lookup, "ELASTICSEARCH_PORT", "9200"),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

pub struct Elasticsearch {
    config: ElasticsearchConfig,
    profile: Profile,
}

impl Elasticsearch {
    pub fn new(config: ElasticsearchConfig) -> Self {
        let profile = Profile {
            name: "elasticsearch",
            primary_prompt: "elasticsearch> ",
            continuation_prompt: "... ",
            terminator: Terminator::Semicolon,
            connect: ConnectMode::Lazy,
            entity_noun: "index",
            entity_aliases: &["\\l", "\\indices", "indices"],
            info_aliases: INFO_ALIASES,
            health_aliases: HEALTH_ALIASES,
            farewell: "Bye!",
            banner: vec![format!(
                "Connected to Elasticsearch at {}:{}",
                config.host, config.port
            )],
            statement_help: STATEMENT_HELP.to_string(),
            remediation: format!(
                "Make sure Elasticsearch is reachable at {}:{} (ELASTICSEARCH_HOST, ELASTICSEARCH_PORT)",
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

const STATEMENT_HELP: &str = r#"API Commands (end with semicolon):
  GET /_cat/indices;
  GET /{index};
  PUT /{index} {"settings": {...}, "mappings": {...}};
  DELETE /{index};
  POST /{index}/_doc {"field": "value"};
  GET /{index}/_search {"query": {...}};

Examples:
  PUT /test_index {"settings": {"number_of_shards": 1}};
  POST /test_index/_doc {"title": "Test Document"};
  GET /test_index/_search {"query": {"match_all": {}}};"#;

/// Index name when `method path` creates an index, `None` otherwise.
pub fn created_index(method: &str, path: &str) -> Option<String> {
    if method != "PUT" || !path.starts_with('/') || path.contains("/_") {
        return None;
    }

    let path = path.split('?').next().unwrap_or(path);
    path.trim_start_matches('/')
        .split('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Normalizes a response body into a table or a status.
pub fn normalize_response(body: &str) -> QueryResult {
    let json: Json = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(_) => return body_status(body),
    };

    if let Some(Json::Array(hits)) = lookup(&json, "hits.hits") {
        return table_or_body(&records_from_objects(hits, &["_source"]), body);
    }

    if let Json::Array(items) = &json {
        return table_or_body(&records_from_objects(items, &[]), body);
    }

    body_status(body)
}

impl Backend for Elasticsearch {
    type Session = HttpEndpoint;

    fn profile(&self) -> &Profile {
        &self.profile
    }

    fn endpoint(&self) -> String {
        format!("elasticsearch@{}:{}", self.config.host, self.config.port)
    }

    fn connect(&self) -> Result<HttpEndpoint> {
        let session = HttpEndpoint::new(
            self.config.base_url(),
            CONNECT_TIMEOUT,
            DOCUMENT_REQUEST_TIMEOUT,
        );
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
            readiness: created_index(&method, &path).map(|target| ReadinessTarget { target }),
        })
    }

    fn list_entities(&self, session: &mut HttpEndpoint) -> Result<Vec<EntityDescriptor>> {
        let json = session
            .get_json("/_cat/indices?format=json")
            .map_err(|e| self.failure("list indices", e))?;

        let indices = json.as_array().cloned().unwrap_or_default();
        Ok(indices
            .iter()
            .map(|index| {
                EntityDescriptor::named(lookup_str(index, "index"))
                    .detail("health", Value::text(lookup_str(index, "health")))
                    .detail("status", Value::text(lookup_str(index, "status")))
                    .detail("docs.count", Value::text(lookup_str(index, "docs.count")))
                    .detail("store.size", Value::text(lookup_str(index, "store.size")))
                    .detail("pri", Value::text(lookup_str(index, "pri")))
            })
            .collect())
    }

    fn describe_cluster(&self, session: &mut HttpEndpoint, aspect: ClusterAspect) -> Result<ClusterInfo> {
        match aspect {
            ClusterAspect::Info => {
                let json = session.get_json("/").map_err(|e| self.failure("cluster info", e))?;
                Ok(ClusterInfo::new("Cluster Information")
                    .field("Name", lookup_str(&json, "name"))
                    .field("Cluster Name", lookup_str(&json, "cluster_name"))
                    .field("Cluster UUID", lookup_str(&json, "cluster_uuid"))
                    .field("Version", lookup_str(&json, "version.number"))
                    .field("Build Type", lookup_str(&json, "version.build_type"))
                    .field("Build Hash", lookup_str(&json, "version.build_hash")))
            }
            ClusterAspect::Health => {
                let json = session
                    .get_json("/_cluster/health")
                    .map_err(|e| self.failure("cluster health", e))?;
                Ok(ClusterInfo::new("Cluster Health")
                    .field("Cluster Name", lookup_str(&json, "cluster_name"))
                    .field("Status", lookup_str(&json, "status"))
                    .field("Number of Nodes", lookup_u64(&json, "number_of_nodes"))
                    .field("Number of Data Nodes", lookup_u64(&json, "number_of_data_nodes"))
                    .field("Active Primary Shards", lookup_u64(&json, "active_primary_shards"))
                    .field("Active Shards", lookup_u64(&json, "active_shards"))
                    .field("Relocating Shards", lookup_u64(&json, "relocating_shards"))
                    .field("Initializing Shards", lookup_u64(&json, "initializing_shards"))
                    .field("Unassigned Shards", lookup_u64(&json, "unassigned_shards")))
            }
        }
    }

    fn check_readiness(&self, session: &mut HttpEndpoint, target: &ReadinessTarget) -> Result<PollStatus> {
        let json = session
            .get_json(&format!("/_cluster/health/{}", target.target))
            .map_err(|e| self.failure("index health", e))?;

        Ok(PollStatus {
            state: lookup_str(&json, "status"),
            pending: lookup_u64(&json, "initializing_shards"),
        })
    }

    fn is_converged(&self, status: &PollStatus) -> bool {
        matches!(status.state.as_str(), "green" | "yellow") && status.pending == 0
    }
}
