//! # Shell Configuration
//!
//! Every backend reads its connection settings once at startup from named
//! environment variables. A missing or empty variable falls back to its
//! documented default; configuration never fails.
//!
//! Configs are built from a lookup function rather than `std::env` directly
//! so that tests can feed a fixed map:
//!
//! ```ignore
//! let config = ElasticsearchConfig::from_lookup(|key| match key {
//!     "ELASTICSEARCH_PORT" => Some("9201".to_string()),
//!     _ => None,
//! });
//! ```
//!
//! ## Module Organization
//!
//! - [`constants`]: timeouts, polling defaults, display limits

pub mod constants;
pub use constants::*;

use std::env;

/// Environment variable enabling debug tracing for every backend.
pub const VERBOSE_ENV_VAR: &str = "DBSHELL_VERBOSE";

/// Older per-backend switch still honoured for the document store.
pub const LEGACY_VERBOSE_ENV_VAR: &str = "ES_CLI_VERBOSE";

/// Reads a variable through `lookup`, treating empty values as absent.
pub fn var_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Like [`var_or`] but without a default.
pub fn var_opt<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Lookup backed by the process environment.
pub fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// True when `value` is one of the accepted "on" spellings (`1`, `true`).
pub fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true")
}

/// Whether verbose tracing was requested through the environment.
pub fn verbose_from_lookup<F>(lookup: &F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    [VERBOSE_ENV_VAR, LEGACY_VERBOSE_ENV_VAR]
        .iter()
        .filter_map(|key| lookup(key))
        .any(|value| is_truthy(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_variable_uses_default() {
        let lookup = lookup_from(&[]);
        assert_eq!(var_or(&lookup, "PGHOST", "localhost"), "localhost");
    }

    #[test]
    fn empty_variable_uses_default() {
        let lookup = lookup_from(&[("PGHOST", "  ")]);
        assert_eq!(var_or(&lookup, "PGHOST", "localhost"), "localhost");
        assert_eq!(var_opt(&lookup, "PGHOST"), None);
    }

    #[test]
    fn present_variable_wins() {
        let lookup = lookup_from(&[("PGHOST", "db.internal")]);
        assert_eq!(var_or(&lookup, "PGHOST", "localhost"), "db.internal");
    }

    #[test]
    fn verbose_accepts_both_switches() {
        assert!(verbose_from_lookup(&lookup_from(&[("DBSHELL_VERBOSE", "1")])));
        assert!(verbose_from_lookup(&lookup_from(&[("ES_CLI_VERBOSE", "TRUE")])));
        assert!(!verbose_from_lookup(&lookup_from(&[("ES_CLI_VERBOSE", "yes")])));
        assert!(!verbose_from_lookup(&lookup_from(&[])));
    }
}
