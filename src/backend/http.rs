//! Blocking JSON-over-HTTP plumbing shared by the HTTP adapters.
//!
//! Every request is bounded by the agent's connect and request timeouts.
//! Requests and responses are traced at debug level.

use crate::config::TRACE_BODY_PREVIEW;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpFailure {
    /// The request never produced a response.
    Transport(String),
    /// The server answered with status >= 400.
    Status { code: u16, body: String },
    /// The response body was not the JSON we expected.
    Decode(String),
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpFailure::Transport(msg) => write!(f, "{}", msg),
            HttpFailure::Status { code, body } if body.trim().is_empty() => {
                write!(f, "HTTP {}", code)
            }
            HttpFailure::Status { code, body } => write!(f, "HTTP {}: {}", code, body.trim()),
            HttpFailure::Decode(msg) => write!(f, "invalid response: {}", msg),
        }
    }
}

#[derive(Clone)]
pub struct HttpEndpoint {
    agent: ureq::Agent,
    base_url: String,
    headers: Vec<(String, String)>,
}

impl fmt::Debug for HttpEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEndpoint")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpEndpoint {
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .timeout(timeout)
            .build();

        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub fn send(&self, method: &str, path: &str, body: Option<&str>) -> Result<HttpReply, HttpFailure> {
        let url = self.url(path);
        let mut request = self.agent.request(method, &url);
        for (name, value) in &self.headers {
            request = request.set(name, value);
        }

        match body {
            Some(b) if b.len() > TRACE_BODY_PREVIEW => {
                debug!(target: "dbshell::http", %method, %path, body_bytes = b.len(), "request")
            }
            Some(b) => debug!(target: "dbshell::http", %method, %path, body = %b, "request"),
            None => debug!(target: "dbshell::http", %method, %path, "request"),
        }

        let started = Instant::now();
        let outcome = match body {
            Some(b) => request
                .set("Content-Type", "application/json")
                .send_string(b),
            None => request.call(),
        };
        let took = started.elapsed();

        match outcome {
            Ok(response) => {
                let status = response.status();
                let body = response
                    .into_string()
                    .map_err(|e| HttpFailure::Transport(format!("failed to read response body: {}", e)))?;
                debug!(target: "dbshell::http", status, ?took, bytes = body.len(), "response");
                Ok(HttpReply { status, body })
            }
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                debug!(target: "dbshell::http", status = code, ?took, bytes = body.len(), "response");
                Err(HttpFailure::Status { code, body })
            }
            Err(ureq::Error::Transport(transport)) => {
                debug!(target: "dbshell::http", ?took, error = %transport, "request failed");
                Err(HttpFailure::Transport(transport.to_string()))
            }
        }
    }

    pub fn json(
        &self,
        method: &str,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, HttpFailure> {
        let body = body.map(|b| b.to_string());
        let reply = self.send(method, path, body.as_deref())?;
        if reply.body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&reply.body).map_err(|e| HttpFailure::Decode(e.to_string()))
    }

    pub fn get_json(&self, path: &str) -> Result<serde_json::Value, HttpFailure> {
        self.json("GET", path, None)
    }

    /// Succeeds when the server answers at all, whatever the status code.
    pub fn ping(&self, path: &str) -> Result<(), HttpFailure> {
        match self.send("GET", path, None) {
            Ok(_) | Err(HttpFailure::Status { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// Pretty-prints a JSON body, falling back to the raw text.
pub fn pretty_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| body.trim().to_string())
}
