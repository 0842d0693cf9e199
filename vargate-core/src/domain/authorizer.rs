// vargate-core/src/domain/authorizer.rs

use std::fmt;
use std::ops::ControlFlow;

use sqlparser::ast::{Expr, ObjectName, Statement, TableFactor, Visit, Visitor};

/// Low-level operation an engine is about to perform on behalf of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
    Read {
        database: Option<&'a str>,
        table: &'a str,
    },
    Select,
    Function {
        name: &'a str,
    },
    Recursive,
    Attach,
    Detach,
    Pragma {
        name: &'a str,
    },
    Transaction,
    Write {
        table: &'a str,
    },
    Schema {
        object: &'a str,
    },
    Other(&'a str),
}

impl fmt::Display for Operation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Read {
                database: Some(db),
                table,
            } => write!(f, "read {db}.{table}"),
            Operation::Read {
                database: None,
                table,
            } => write!(f, "read {table}"),
            Operation::Select => write!(f, "select"),
            Operation::Function { name } => write!(f, "function {name}()"),
            Operation::Recursive => write!(f, "recursive step"),
            Operation::Attach => write!(f, "attach"),
            Operation::Detach => write!(f, "detach"),
            Operation::Pragma { name } => write!(f, "pragma {name}"),
            Operation::Transaction => write!(f, "transaction control"),
            Operation::Write { table } => write!(f, "write {table}"),
            Operation::Schema { object } => write!(f, "schema change on {object}"),
            Operation::Other(what) => write!(f, "{what}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Allow,
    Deny,
}

/// Capability list shared by every engine adapter. Only reads of the main
/// schema, selects, recursive CTE steps and side-effect free functions pass.
#[derive(Debug, Clone, Copy)]
pub struct ReadOnlyPolicy {
    allowed_databases: &'static [&'static str],
    denied_functions: &'static [&'static str],
}

// Catalogs and system schemas a qualified relation may name.
const ALLOWED_DATABASES: &[&str] = &["main", "temp", "memory", "information_schema", "pg_catalog"];

const DENIED_FUNCTIONS: &[&str] = &[
    // sqlite
    "load_extension",
    "readfile",
    "writefile",
    "edit",
    "fts3_tokenizer",
    // duckdb table & scalar functions touching the outside world
    "read_csv",
    "read_csv_auto",
    "read_parquet",
    "parquet_scan",
    "read_json",
    "read_json_auto",
    "read_ndjson",
    "read_text",
    "read_blob",
    "sniff_csv",
    "glob",
    "getenv",
    "query",
    "query_table",
];

impl Default for ReadOnlyPolicy {
    fn default() -> Self {
        Self {
            allowed_databases: ALLOWED_DATABASES,
            denied_functions: DENIED_FUNCTIONS,
        }
    }
}

impl ReadOnlyPolicy {
    pub fn authorize(&self, op: &Operation<'_>) -> Authorization {
        let allowed = match op {
            Operation::Read { database, .. } => database.is_none_or(|db| {
                self.allowed_databases
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(db))
            }),
            Operation::Select | Operation::Recursive => true,
            Operation::Function { name } => !self
                .denied_functions
                .iter()
                .any(|d| d.eq_ignore_ascii_case(name)),
            _ => false,
        };

        if allowed {
            Authorization::Allow
        } else {
            tracing::warn!(operation = %op, "Operation denied by read-only policy");
            Authorization::Deny
        }
    }

    /// Static pass over a parsed statement for engines without an authorizer hook.
    ///
    /// Every relation and function reference is submitted to [`Self::authorize`].
    /// Qualified relations (`db.schema.table` or `db.table`) are checked against the
    /// allowed databases. Table functions in `FROM` count as function calls.
    pub fn authorize_statement(&self, stmt: &Statement) -> Result<(), String> {
        if !matches!(stmt, Statement::Query(_)) {
            return Err(format!("not authorized: {stmt}"));
        }
        let mut walker = PolicyWalker { policy: self };
        match stmt.visit(&mut walker) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(denied) => Err(format!("not authorized: {denied}")),
        }
    }
}

struct PolicyWalker<'p> {
    policy: &'p ReadOnlyPolicy,
}

impl PolicyWalker<'_> {
    fn check(&self, op: Operation<'_>) -> ControlFlow<String> {
        match self.policy.authorize(&op) {
            Authorization::Allow => ControlFlow::Continue(()),
            Authorization::Deny => ControlFlow::Break(op.to_string()),
        }
    }
}

fn name_parts(name: &ObjectName) -> Vec<String> {
    name.0
        .iter()
        .map(|part| {
            part.to_string()
                .trim_matches(|c| matches!(c, '"' | '`' | '[' | ']'))
                .to_string()
        })
        .collect()
}

impl Visitor for PolicyWalker<'_> {
    type Break = String;

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        let parts = name_parts(relation);
        let (database, table) = match parts.as_slice() {
            [table] => (None, table.as_str()),
            [db, table] => (Some(db.as_str()), table.as_str()),
            [db, _schema, table, ..] => (Some(db.as_str()), table.as_str()),
            [] => return ControlFlow::Continue(()),
        };
        self.check(Operation::Read { database, table })
    }

    fn pre_visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<Self::Break> {
        let name = match factor {
            TableFactor::Table {
                name,
                args: Some(_),
                ..
            } => name,
            TableFactor::Function { name, .. } => name,
            _ => return ControlFlow::Continue(()),
        };
        let parts = name_parts(name);
        match parts.last() {
            Some(func) => self.check(Operation::Function { name: func }),
            None => ControlFlow::Continue(()),
        }
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        let Expr::Function(func) = expr else {
            return ControlFlow::Continue(());
        };
        let parts = name_parts(&func.name);
        match parts.last() {
            Some(name) => self.check(Operation::Function { name }),
            None => ControlFlow::Continue(()),
        }
    }
}
