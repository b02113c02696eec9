//! Error kinds surfaced by backend adapters.
//!
//! None of these terminate the shell loop. `Connection` additionally drops
//! the current session so the next command reconnects.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShellError>;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("cannot connect to {backend}: {message}")]
    Connection { backend: String, message: String },

    #[error("{operation} failed on {target}: {message}")]
    Query {
        operation: String,
        target: String,
        message: String,
    },

    #[error("Usage: {usage}")]
    MalformedCommand { usage: String },

    #[error("Unknown command: {0}. Type 'help' for available commands.")]
    UnknownCommand(String),

    #[error("{operation} is not supported by {backend}")]
    Unsupported { operation: String, backend: String },
}

impl ShellError {
    pub fn connection(backend: impl Into<String>, message: impl ToString) -> Self {
        Self::Connection {
            backend: backend.into(),
            message: message.to_string(),
        }
    }

    pub fn query(
        operation: impl Into<String>,
        target: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self::Query {
            operation: operation.into(),
            target: target.into(),
            message: message.to_string(),
        }
    }

    pub fn malformed(usage: impl Into<String>) -> Self {
        Self::MalformedCommand {
            usage: usage.into(),
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}
