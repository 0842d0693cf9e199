// vargate-core/src/infrastructure/adapters/duckdb.rs

use duckdb::types::{ToSqlOutput, Value};
use duckdb::{AccessMode, Config, Connection, InterruptHandle, ToSql, params_from_iter};
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::authorizer::ReadOnlyPolicy;
use crate::domain::guard::SqlFlavor;
use crate::domain::query::SqlValue;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::warehouse::{EngineError, QueryCanceller, RowSet, WarehouseConnection};

/// DuckDB warehouse: read-only access mode with external access off, a locked
/// session configuration, and a static authorizer pass before each statement
/// (DuckDB exposes no authorizer hook).
pub struct DuckDbWarehouse {
    conn: Connection,
    policy: ReadOnlyPolicy,
    canceller: Arc<DuckDbCanceller>,
}

struct DuckDbCanceller(Arc<InterruptHandle>);

impl QueryCanceller for DuckDbCanceller {
    fn cancel(&self) {
        self.0.interrupt();
    }
}

fn connection_error(path: &Path, reason: impl ToString) -> InfrastructureError {
    InfrastructureError::Connection {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

impl DuckDbWarehouse {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, InfrastructureError> {
        if !path.is_file() {
            return Err(connection_error(path, "file does not exist"));
        }

        // Layer 1: read-only access mode, no filesystem or network reach
        let config = Config::default()
            .access_mode(AccessMode::ReadOnly)?
            .enable_external_access(false)?;
        let conn = Connection::open_with_flags(path, config).map_err(|e| connection_error(path, e))?;

        // Layer 2: no later statement may loosen the session
        conn.execute_batch("SET lock_configuration = true")
            .map_err(|e| connection_error(path, e))?;

        debug!("DuckDB warehouse opened read-only");
        let canceller = Arc::new(DuckDbCanceller(conn.interrupt_handle()));
        Ok(Self {
            conn,
            policy: ReadOnlyPolicy::default(),
            canceller,
        })
    }

    // Layer 3: emulated authorizer
    fn authorize(&self, sql: &str) -> Result<(), EngineError> {
        let statements = Parser::parse_sql(&DuckDbDialect {}, sql)
            .map_err(|e| EngineError::new(e.to_string()))?;
        for stmt in &statements {
            self.policy
                .authorize_statement(stmt)
                .map_err(EngineError::new)?;
        }
        Ok(())
    }
}

impl From<duckdb::Error> for EngineError {
    fn from(err: duckdb::Error) -> Self {
        EngineError::new(err.to_string())
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(match self {
            SqlValue::Null => Value::Null,
            SqlValue::Boolean(b) => Value::Boolean(*b),
            SqlValue::Integer(i) => Value::BigInt(*i),
            SqlValue::Real(r) => Value::Double(*r),
            SqlValue::Text(t) => Value::Text(t.clone()),
            SqlValue::Blob(b) => Value::Blob(b.clone()),
        }))
    }
}

fn from_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Boolean(b),
        Value::TinyInt(i) => SqlValue::Integer(i.into()),
        Value::SmallInt(i) => SqlValue::Integer(i.into()),
        Value::Int(i) => SqlValue::Integer(i.into()),
        Value::BigInt(i) => SqlValue::Integer(i),
        Value::UTinyInt(i) => SqlValue::Integer(i.into()),
        Value::USmallInt(i) => SqlValue::Integer(i.into()),
        Value::UInt(i) => SqlValue::Integer(i.into()),
        Value::UBigInt(i) => i64::try_from(i)
            .map(SqlValue::Integer)
            .unwrap_or(SqlValue::Real(i as f64)),
        Value::HugeInt(i) => i64::try_from(i)
            .map(SqlValue::Integer)
            .unwrap_or(SqlValue::Real(i as f64)),
        Value::Float(f) => SqlValue::Real(f.into()),
        Value::Double(f) => SqlValue::Real(f),
        Value::Decimal(d) => d
            .to_string()
            .parse()
            .map(SqlValue::Real)
            .unwrap_or_else(|_| SqlValue::Text(d.to_string())),
        Value::Text(t) => SqlValue::Text(t),
        Value::Enum(t) => SqlValue::Text(t),
        Value::Blob(b) => SqlValue::Blob(b),
        Value::Date32(days) => chrono::DateTime::from_timestamp(i64::from(days) * 86_400, 0)
            .map(|d| SqlValue::Text(d.date_naive().to_string()))
            .unwrap_or(SqlValue::Integer(days.into())),
        other => SqlValue::Text(format!("{other:?}")),
    }
}

impl WarehouseConnection for DuckDbWarehouse {
    fn engine_name(&self) -> &'static str {
        "duckdb"
    }

    fn flavor(&self) -> SqlFlavor {
        SqlFlavor::DuckDb
    }

    fn canceller(&self) -> Arc<dyn QueryCanceller> {
        self.canceller.clone()
    }

    fn query(&mut self, sql: &str, params: &[SqlValue], limit: usize) -> Result<RowSet, EngineError> {
        self.authorize(sql)?;

        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let columns = rows
            .as_ref()
            .map(|s| s.column_names())
            .unwrap_or_default();

        let mut out = Vec::new();
        let mut truncated = false;
        while let Some(row) = rows.next()? {
            if out.len() == limit {
                truncated = true;
                break;
            }
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(from_value(row.get::<_, Value>(idx)?));
            }
            out.push(values);
        }

        Ok(RowSet {
            columns,
            rows: out,
            truncated,
        })
    }

    fn table_names_sql(&self) -> &'static str {
        "SELECT table_name FROM information_schema.tables WHERE table_schema = 'main' ORDER BY table_name"
    }
}
