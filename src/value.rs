//! # Cell Values
//!
//! Every backend converts its native cell representation into [`Value`], a
//! closed set of shapes rendered by one recursive function. Adding a new
//! composite shape means adding a variant here and a match arm in
//! [`Value::render`], nothing else.
//!
//! ## Rendering Rules
//!
//! | Shape          | Rendering                               |
//! |----------------|-----------------------------------------|
//! | absent         | `NULL`                                  |
//! | scalar         | natural string form (`3`, `3.5`, `true`)|
//! | list           | `[a, b, c]`                             |
//! | map            | `{k: v, k2: v2}`                        |
//! | graph node     | `(:Label1:Label2 {k: v})`               |
//! | relationship   | `[:TYPE {k: v}]` or `[:TYPE]`           |
//! | graph path     | `Path[N nodes, M relationships]`        |
//!
//! Composite members are rendered with the same rules, so a map holding a
//! list holding a null renders as `{k: [1, NULL]}`.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
    Node {
        labels: Vec<String>,
        properties: Vec<(String, Value)>,
    },
    Relationship {
        rel_type: String,
        properties: Vec<(String, Value)>,
    },
    Path {
        nodes: usize,
        relationships: usize,
    },
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn render(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::render).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Map(entries) => format!("{{{}}}", render_entries(entries)),
            Value::Node { labels, properties } => {
                let labels: String = labels.iter().map(|l| format!(":{}", l)).collect();
                if properties.is_empty() {
                    format!("({})", labels)
                } else {
                    format!("({} {{{}}})", labels, render_entries(properties))
                }
            }
            Value::Relationship {
                rel_type,
                properties,
            } => {
                if properties.is_empty() {
                    format!("[:{}]", rel_type)
                } else {
                    format!("[:{} {{{}}}]", rel_type, render_entries(properties))
                }
            }
            Value::Path {
                nodes,
                relationships,
            } => format!("Path[{} nodes, {} relationships]", nodes, relationships),
        }
    }

    /// Converts a JSON document into the closed value set, keeping object
    /// key order as the document listed it.
    pub fn from_json(json: &serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if n.is_u64() {
                    Value::Text(n.to_string())
                } else {
                    n.as_f64().map(Value::Float).unwrap_or(Value::Null)
                }
            }
            Json::String(s) => Value::Text(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<Option<&str>> for Value {
    fn from(cell: Option<&str>) -> Self {
        match cell {
            Some(s) => Value::Text(s.to_string()),
            None => Value::Null,
        }
    }
}

fn render_entries(entries: &[(String, Value)]) -> String {
    entries
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v.render()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_renders_as_four_letter_literal() {
        assert_eq!(Value::Null.render(), "NULL");
        assert_eq!(Value::from(None).render(), "NULL");
    }

    #[test]
    fn scalars_use_natural_form() {
        assert_eq!(Value::Int(42).render(), "42");
        assert_eq!(Value::Float(3.5).render(), "3.5");
        assert_eq!(Value::Float(3.0).render(), "3");
        assert_eq!(Value::Bool(false).render(), "false");
        assert_eq!(Value::text("Alice").render(), "Alice");
    }

    #[test]
    fn nested_map_of_list_of_null() {
        let value = Value::Map(vec![
            (
                "tags".to_string(),
                Value::List(vec![Value::Int(1), Value::Null, Value::text("x")]),
            ),
            ("owner".to_string(), Value::Null),
        ]);
        assert_eq!(value.render(), "{tags: [1, NULL, x], owner: NULL}");
    }

    #[test]
    fn node_renders_labels_and_properties() {
        let node = Value::Node {
            labels: vec!["Person".to_string(), "Admin".to_string()],
            properties: vec![
                ("name".to_string(), Value::text("Alice")),
                ("age".to_string(), Value::Int(30)),
            ],
        };
        assert_eq!(node.render(), "(:Person:Admin {name: Alice, age: 30})");

        let bare = Value::Node {
            labels: vec!["Tag".to_string()],
            properties: vec![],
        };
        assert_eq!(bare.render(), "(:Tag)");
    }

    #[test]
    fn relationship_omits_empty_property_map() {
        let rel = Value::Relationship {
            rel_type: "KNOWS".to_string(),
            properties: vec![],
        };
        assert_eq!(rel.render(), "[:KNOWS]");

        let rel = Value::Relationship {
            rel_type: "KNOWS".to_string(),
            properties: vec![("since".to_string(), Value::Int(2020))],
        };
        assert_eq!(rel.render(), "[:KNOWS {since: 2020}]");
    }

    #[test]
    fn path_renders_counts() {
        let path = Value::Path {
            nodes: 3,
            relationships: 2,
        };
        assert_eq!(path.render(), "Path[3 nodes, 2 relationships]");
    }

    #[test]
    fn composites_nest_inside_lists() {
        let value = Value::List(vec![
            Value::Node {
                labels: vec!["A".to_string()],
                properties: vec![("m".to_string(), Value::Map(vec![]))],
            },
            Value::Null,
        ]);
        assert_eq!(value.render(), "[(:A {m: {}}), NULL]");
    }

    #[test]
    fn json_keeps_document_key_order() {
        let doc = json!({"zeta": 1, "alpha": [true, null], "mid": {"b": 2.5, "a": "x"}});
        assert_eq!(
            Value::from_json(&doc).render(),
            "{zeta: 1, alpha: [true, NULL], mid: {b: 2.5, a: x}}"
        );
    }

    #[test]
    fn json_large_unsigned_keeps_digits() {
        let doc = json!(u64::MAX);
        assert_eq!(Value::from_json(&doc).render(), u64::MAX.to_string());
    }
}
