use std::cmp::Ordering;
use std::io;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A stored record: one JSON object per row of a collection.
pub type Record = serde_json::Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Tables,
    Columns,
    Rows,
    Cells,
    Pages,
}

impl Collection {
    pub fn all() -> &'static [Self] {
        &[
            Self::Tables,
            Self::Columns,
            Self::Rows,
            Self::Cells,
            Self::Pages,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Tables => "database_tables",
            Self::Columns => "database_columns",
            Self::Rows => "database_rows",
            Self::Cells => "database_cells",
            Self::Pages => "pages",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("not authenticated")]
    Unauthenticated,
    #[error("{collection} rejected the request: {message}")]
    Rejected {
        collection: Collection,
        message: String,
    },
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug)]
enum Predicate {
    Eq(String, Value),
    In(String, Vec<Value>),
}

/// Conjunction of field predicates.
#[derive(Clone, Debug, Default)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub ascending: bool,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.predicates
            .push(Predicate::Eq(field.to_string(), value.into()));
        self
    }

    pub fn is_in<I, V>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.predicates.push(Predicate::In(
            field.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.predicates.iter().all(|predicate| match predicate {
            Predicate::Eq(field, value) => record.get(field) == Some(value),
            Predicate::In(field, values) => record
                .get(field)
                .is_some_and(|actual| values.contains(actual)),
        })
    }
}

impl Order {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            ascending: true,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            ascending: false,
        }
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let ordering = compare_json(a.get(&self.field), b.get(&self.field));
        if self.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    }
}

/// Generic collection access to the hosted relational store, plus the
/// identity of the signed-in user.
///
/// Deletes cascade along foreign keys: a table takes its columns and rows,
/// and a column or row takes its cells.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    async fn current_user(&self) -> Result<Option<String>, BackendError>;

    async fn select(
        &self,
        collection: Collection,
        filter: &Filter,
        order: Option<&Order>,
    ) -> Result<Vec<Record>, BackendError>;

    /// Inserts records and returns them as stored, with generated ids and
    /// timestamps filled in.
    async fn insert(
        &self,
        collection: Collection,
        records: Vec<Record>,
    ) -> Result<Vec<Record>, BackendError>;

    /// Merges `patch` into every matching record. Returns the match count.
    async fn update(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: Record,
    ) -> Result<usize, BackendError>;

    async fn delete(&self, collection: Collection, filter: &Filter) -> Result<usize, BackendError>;
}

fn compare_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(left)), Some(Value::Number(right))) => {
            let left = left.as_f64().unwrap_or(f64::NAN);
            let right = right.as_f64().unwrap_or(f64::NAN);
            left.partial_cmp(&right).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(left)), Some(Value::String(right))) => left.cmp(right),
        (Some(Value::Bool(left)), Some(Value::Bool(right))) => left.cmp(right),
        (Some(left), Some(right)) => left.to_string().cmp(&right.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => Record::new(),
        }
    }

    #[test]
    fn test_filter_eq_and_in() {
        let rec = record(json!({"table_id": "t1", "row_id": "r2"}));
        assert!(Filter::new().eq("table_id", "t1").matches(&rec));
        assert!(!Filter::new().eq("table_id", "t2").matches(&rec));
        assert!(Filter::new().is_in("row_id", ["r1", "r2"]).matches(&rec));
        assert!(!Filter::new()
            .eq("table_id", "t1")
            .is_in("row_id", ["r3"])
            .matches(&rec));
        assert!(!Filter::new().eq("missing", "x").matches(&rec));
    }

    #[test]
    fn test_order_compares_numbers_numerically() {
        let a = record(json!({"order": 2}));
        let b = record(json!({"order": 10}));
        assert_eq!(Order::asc("order").compare(&a, &b), Ordering::Less);
        assert_eq!(Order::desc("order").compare(&a, &b), Ordering::Greater);
    }
}
