// vargate-core/src/domain/query.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Engine-independent scalar value, used both for bound parameters and
/// for materialized result cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Integer(i) => Some(*i as f64),
            SqlValue::Real(r) => Some(*r),
            SqlValue::Text(t) => t.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Boolean(b) => write!(f, "{b}"),
            SqlValue::Integer(i) => write!(f, "{i}"),
            SqlValue::Real(r) => write!(f, "{r}"),
            SqlValue::Text(t) => write!(f, "{t}"),
            SqlValue::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Boolean(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

/// Parameters travel next to the statement, never inside it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryParams {
    #[default]
    None,
    Positional(Vec<SqlValue>),
    /// Names are matched against `:name`, `$name` or `@name` placeholders.
    Named(Vec<(String, SqlValue)>),
}

impl QueryParams {
    pub fn is_empty(&self) -> bool {
        match self {
            QueryParams::None => true,
            QueryParams::Positional(v) => v.is_empty(),
            QueryParams::Named(v) => v.is_empty(),
        }
    }

    /// Values in the order they were supplied, for audit records.
    pub fn audit_values(&self) -> Vec<AuditParam> {
        match self {
            QueryParams::None => Vec::new(),
            QueryParams::Positional(values) => values
                .iter()
                .map(|v| AuditParam {
                    name: None,
                    value: v.clone(),
                })
                .collect(),
            QueryParams::Named(values) => values
                .iter()
                .map(|(n, v)| AuditParam {
                    name: Some(n.clone()),
                    value: v.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditParam {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub value: SqlValue,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryRequest {
    pub sql: String,
    pub params: QueryParams,
    pub max_rows: Option<usize>,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Default::default()
        }
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }
}

impl From<&str> for QueryRequest {
    fn from(sql: &str) -> Self {
        QueryRequest::new(sql)
    }
}

pub type Row = BTreeMap<String, SqlValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub truncated: bool,
    pub execution_time_ms: f64,
}

impl QueryResult {
    /// First column of the first row, handy for scalar queries.
    pub fn scalar(&self) -> Option<&SqlValue> {
        let column = self.columns.first()?;
        self.rows.first()?.get(column)
    }
}
