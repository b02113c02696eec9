//! Blocking gRPC calls over one lazily dialed channel.
//!
//! The shell loop is synchronous, so every RPC runs to completion on a
//! current-thread runtime owned by the session.

use super::proto::ReadRowsResponse;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};
use tracing::debug;

#[derive(Debug)]
pub enum RpcFailure {
    /// Channel could not be built or the server is unreachable.
    Transport(String),
    Status(Status),
}

impl RpcFailure {
    pub fn code(&self) -> Option<Code> {
        match self {
            Self::Status(status) => Some(status.code()),
            Self::Transport(_) => None,
        }
    }

    pub fn already_exists(&self) -> bool {
        match self {
            Self::Status(status) => {
                status.code() == Code::AlreadyExists
                    || status.message().to_lowercase().contains("already exists")
            }
            Self::Transport(_) => false,
        }
    }
}

impl From<Status> for RpcFailure {
    fn from(status: Status) -> Self {
        // tonic reports dial failures as UNAVAILABLE, or as UNKNOWN wrapping
        // a transport error.
        let dial_failure = status.code() == Code::Unavailable
            || (status.code() == Code::Unknown && status.message().contains("transport error"));
        if dial_failure {
            Self::Transport(status.message().to_string())
        } else {
            Self::Status(status)
        }
    }
}

impl std::fmt::Display for RpcFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "{}", msg),
            Self::Status(status) => write!(f, "{:?}: {}", status.code(), status.message()),
        }
    }
}

pub struct GrpcChannel {
    runtime: Runtime,
    channel: Channel,
    target: String,
}

impl GrpcChannel {
    /// Builds the runtime and a lazy channel; nothing is sent until the
    /// first call.
    pub fn open(target: &str, connect_timeout: Duration, request_timeout: Duration) -> Result<Self, RpcFailure> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RpcFailure::Transport(e.to_string()))?;

        let endpoint = Endpoint::from_shared(target.to_string())
            .map_err(|e| RpcFailure::Transport(format!("invalid endpoint {}: {}", target, e)))?
            .connect_timeout(connect_timeout)
            .timeout(request_timeout);

        let channel = {
            let _guard = runtime.enter();
            endpoint.connect_lazy()
        };

        Ok(Self {
            runtime,
            channel,
            target: target.to_string(),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn unary<Req, Resp>(&self, path: &'static str, request: Req) -> Result<Resp, RpcFailure>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        debug!(target: "dbshell::grpc", rpc = path, "unary call");
        self.runtime.block_on(async {
            let mut grpc = Grpc::new(self.channel.clone());
            grpc.ready()
                .await
                .map_err(|e| RpcFailure::Transport(e.to_string()))?;
            let codec: ProstCodec<Req, Resp> = ProstCodec::default();
            let response = grpc
                .unary(tonic::Request::new(request), PathAndQuery::from_static(path), codec)
                .await?;
            Ok::<_, RpcFailure>(response.into_inner())
        })
    }

    /// Drains a `ReadRows` stream into memory.
    pub fn read_rows<Req>(&self, path: &'static str, request: Req) -> Result<Vec<ReadRowsResponse>, RpcFailure>
    where
        Req: prost::Message + Send + Sync + 'static,
    {
        debug!(target: "dbshell::grpc", rpc = path, "streaming call");
        self.runtime.block_on(async {
            let mut grpc = Grpc::new(self.channel.clone());
            grpc.ready()
                .await
                .map_err(|e| RpcFailure::Transport(e.to_string()))?;
            let codec: ProstCodec<Req, ReadRowsResponse> = ProstCodec::default();
            let mut stream = grpc
                .server_streaming(tonic::Request::new(request), PathAndQuery::from_static(path), codec)
                .await?
                .into_inner();

            let mut responses = Vec::new();
            while let Some(message) = stream.message().await? {
                responses.push(message);
            }
            Ok::<_, RpcFailure>(responses)
        })
    }
}
