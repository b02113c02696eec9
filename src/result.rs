//! # Result Normalization
//!
//! Backends hand the shell heterogeneous results: typed cells with
//! timestamps, JSON documents, graph records, SQL rows with nullable columns,
//! vector-search hits. This module maps all of them onto one display shape,
//! [`QueryResult`].
//!
//! ## Normalization Rules
//!
//! 1. Zero records: the statement is treated as a mutation and reported as a
//!    [`QueryResult::Status`] built from the counted side effects
//!    (`"1 nodes created, 2 properties set"`), or `"OK"` when none were
//!    reported.
//! 2. One or more records: columns come from the first record's field order.
//!    Every later record is projected onto that order, whatever order the
//!    backend used for it. Fields the record lacks render as `NULL`.
//! 3. Cell rendering follows [`Value::render`].
//!
//! A first record without any fields yields [`QueryResult::Empty`].

use crate::value::Value;

/// One backend record: field names with values, in backend order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn has_layout(&self, columns: &[String]) -> bool {
        self.fields.len() == columns.len()
            && self.fields.iter().zip(columns).all(|((k, _), c)| k == c)
    }
}

/// Counted side effects of a mutation, in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SideEffects {
    counters: Vec<(String, u64)>,
}

impl SideEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, label: impl Into<String>, count: u64) -> Self {
        self.record(label, count);
        self
    }

    pub fn record(&mut self, label: impl Into<String>, count: u64) {
        self.counters.push((label.into(), count));
    }

    /// `"N label, M label"` over non-zero counters, or `"OK"`.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .counters
            .iter()
            .filter(|(_, n)| *n > 0)
            .map(|(label, n)| format!("{} {}", n, label))
            .collect();

        if parts.is_empty() {
            "OK".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Tabular {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Status {
        message: String,
    },
    Empty,
}

impl QueryResult {
    /// Builds a table, padding short rows with `NULL` and cutting long ones
    /// so every row has exactly one cell per column.
    pub fn tabular(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null.render());
                row
            })
            .collect();
        QueryResult::Tabular { columns, rows }
    }

    pub fn status(message: impl Into<String>) -> Self {
        QueryResult::Status {
            message: message.into(),
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            QueryResult::Tabular { rows, .. } => rows.len(),
            _ => 0,
        }
    }
}

/// Applies the normalization rules to a backend record set.
pub fn normalize(records: &[Record], effects: &SideEffects) -> QueryResult {
    let first = match records.first() {
        Some(first) => first,
        None => return QueryResult::status(effects.summary()),
    };

    if first.is_empty() {
        return QueryResult::Empty;
    }

    let columns: Vec<String> = first.names().map(str::to_string).collect();
    let rows = records
        .iter()
        .map(|record| project(record, &columns))
        .collect();

    QueryResult::tabular(columns, rows)
}

fn project(record: &Record, columns: &[String]) -> Vec<String> {
    // Same layout as the header: positional, which keeps duplicate names intact.
    if record.has_layout(columns) {
        return record.fields.iter().map(|(_, v)| v.render()).collect();
    }

    columns
        .iter()
        .map(|c| record.get(c).map(Value::render).unwrap_or_else(|| Value::Null.render()))
        .collect()
}

/// A top-level addressable object: table, index, label, or collection.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    pub name: String,
    pub details: Vec<(String, Value)>,
}

impl EntityDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            details: Vec::new(),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.push((key.into(), value));
        self
    }
}

/// Lays out entity descriptors as a table whose first column is `noun`.
pub fn entities_table(noun: &str, entities: &[EntityDescriptor]) -> QueryResult {
    let records: Vec<Record> = entities
        .iter()
        .map(|entity| {
            let mut record = Record::new();
            record.push(noun, Value::text(entity.name.clone()));
            for (key, value) in &entity.details {
                record.push(key.clone(), value.clone());
            }
            record
        })
        .collect();

    normalize(&records, &SideEffects::new())
}

/// Identity, version, and health fields reported by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterInfo {
    pub title: String,
    pub fields: Vec<(String, String)>,
}

impl ClusterInfo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
