//! # Shell Configuration Constants
//!
//! Timeouts, polling defaults, and display limits shared by every backend
//! profile. Values that constrain each other are kept next to each other and
//! checked at compile time.
//!
//! ```text
//! DEFAULT_POLL_ATTEMPTS (60) x DEFAULT_POLL_INTERVAL (1s)
//!       │
//!       └─> worst-case convergence wait after a convergence-sensitive
//!           mutation; must stay below MAX_POLL_BUDGET
//!
//! CONNECT_TIMEOUT (5s)
//!       │
//!       └─> must be <= every per-request timeout, otherwise a slow connect
//!           would be reported as a request timeout
//! ```

use std::time::Duration;

// ============================================================================
// READINESS POLLING
// ============================================================================

/// Status checks issued before a convergence-sensitive mutation is reported
/// as not ready.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 60;

/// Sleep between two status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound on `DEFAULT_POLL_ATTEMPTS * DEFAULT_POLL_INTERVAL`.
pub const MAX_POLL_BUDGET: Duration = Duration::from_secs(120);

const _: () = assert!(
    DEFAULT_POLL_ATTEMPTS as u64 * DEFAULT_POLL_INTERVAL.as_secs() <= MAX_POLL_BUDGET.as_secs(),
    "default readiness poll must fit in MAX_POLL_BUDGET"
);

// ============================================================================
// TRANSPORT TIMEOUTS
// ============================================================================

/// Bound on establishing a TCP connection to any backend.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Whole-request bound for the document store (index creation can be slow).
pub const DOCUMENT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Whole-request bound for the vector store.
pub const VECTOR_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Whole-request bound for the graph store HTTP endpoint.
pub const GRAPH_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-RPC deadline for the wide-column gRPC calls.
pub const WIDE_COLUMN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const _: () = assert!(
    CONNECT_TIMEOUT.as_secs() <= VECTOR_REQUEST_TIMEOUT.as_secs()
        && CONNECT_TIMEOUT.as_secs() <= WIDE_COLUMN_REQUEST_TIMEOUT.as_secs(),
    "CONNECT_TIMEOUT must not exceed request timeouts"
);

// ============================================================================
// DISPLAY
// ============================================================================

/// Cells wider than this are truncated with "...".
pub const MAX_COLUMN_WIDTH: usize = 60;

/// Request bodies longer than this are summarized by size in debug traces.
pub const TRACE_BODY_PREVIEW: usize = 100;

/// Rows returned by `scan` when no limit is given.
pub const DEFAULT_SCAN_LIMIT: u32 = 10;
