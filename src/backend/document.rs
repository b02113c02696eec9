//! JSON document responses to display shapes.
//!
//! The document and vector stores answer every statement with a JSON body.
//! Bodies that carry a list of hits or objects become tables; anything else
//! (acknowledgements, settings, errors) is shown pretty-printed as a status.

use crate::backend::http::pretty_body;
use crate::result::{normalize, QueryResult, Record, SideEffects};
use crate::value::Value;
use serde_json::Value as Json;

/// Turns JSON objects into records. Fields named in `inline` whose value is
/// an object are spliced into the record in place of the wrapper field.
pub fn records_from_objects(items: &[Json], inline: &[&str]) -> Vec<Record> {
    items
        .iter()
        .filter_map(Json::as_object)
        .map(|object| {
            let mut record = Record::new();
            for (key, value) in object {
                match value {
                    Json::Object(inner) if inline.contains(&key.as_str()) => {
                        for (k, v) in inner {
                            record.push(k.clone(), Value::from_json(v));
                        }
                    }
                    _ => record.push(key.clone(), Value::from_json(value)),
                }
            }
            record
        })
        .collect()
}

/// Table from records, or the pretty body when there is nothing to tabulate.
pub fn table_or_body(records: &[Record], body: &str) -> QueryResult {
    if records.is_empty() {
        body_status(body)
    } else {
        normalize(records, &SideEffects::new())
    }
}

pub fn body_status(body: &str) -> QueryResult {
    if body.trim().is_empty() {
        QueryResult::status("OK")
    } else {
        QueryResult::status(pretty_body(body))
    }
}

/// Looks up a dotted path (`hits.hits`) in a JSON document.
pub fn lookup<'a>(json: &'a Json, dotted: &str) -> Option<&'a Json> {
    dotted.split('.').try_fold(json, |node, key| node.get(key))
}

pub fn lookup_str(json: &Json, dotted: &str) -> String {
    match lookup(json, dotted) {
        Some(Json::String(s)) => s.clone(),
        Some(Json::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

pub fn lookup_u64(json: &Json, dotted: &str) -> u64 {
    match lookup(json, dotted) {
        Some(Json::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Json::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}
