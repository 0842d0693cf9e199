// vargate-core/src/infrastructure/adapters/sqlite.rs

use rusqlite::hooks::{AuthAction, AuthContext, Authorization as SqliteAuthorization};
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, InterruptHandle, OpenFlags, ToSql, params_from_iter};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::authorizer::{Authorization, Operation, ReadOnlyPolicy};
use crate::domain::guard::SqlFlavor;
use crate::domain::query::SqlValue;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::warehouse::{EngineError, QueryCanceller, RowSet, WarehouseConnection};

/// SQLite warehouse behind three read-only layers: `mode=ro` open flags,
/// `PRAGMA query_only`, and the native authorizer hook.
pub struct SqliteWarehouse {
    conn: Connection,
    canceller: Arc<SqliteCanceller>,
}

struct SqliteCanceller(InterruptHandle);

impl QueryCanceller for SqliteCanceller {
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

/// `file:` URI for a read-only open. `%`, `?` and `#` are URI syntax and must
/// be escaped to reach the intended file.
fn file_uri(path: &Path) -> String {
    let mut uri = String::from("file:");
    for ch in path.to_string_lossy().chars() {
        match ch {
            '%' => uri.push_str("%25"),
            '?' => uri.push_str("%3f"),
            '#' => uri.push_str("%23"),
            other => uri.push(other),
        }
    }
    uri.push_str("?mode=ro");
    uri
}

impl SqliteWarehouse {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, InfrastructureError> {
        if !path.is_file() {
            return Err(connection_error(path, "file does not exist"));
        }

        // Layer 1: read-only open
        let uri = file_uri(path);
        let conn = Connection::open_with_flags(
            &uri,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| connection_error(path, e))?;

        // Layer 2: session-level query_only
        conn.pragma_update(None, "query_only", true)
            .map_err(|e| connection_error(path, e))?;

        // Fails on files that are not SQLite databases
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |r| r.get::<_, i64>(0))
            .map_err(|e| connection_error(path, e))?;

        // Layer 3: authorizer hook, consulted at prepare time
        let policy = ReadOnlyPolicy::default();
        conn.authorizer(Some(move |ctx: AuthContext<'_>| authorize(&policy, &ctx)));

        debug!("SQLite warehouse opened read-only");
        let canceller = Arc::new(SqliteCanceller(conn.get_interrupt_handle()));
        Ok(Self { conn, canceller })
    }
}

fn authorize(policy: &ReadOnlyPolicy, ctx: &AuthContext<'_>) -> SqliteAuthorization {
    let op = match ctx.action {
        AuthAction::Read { table_name, .. } => Operation::Read {
            database: ctx.database_name,
            table: table_name,
        },
        AuthAction::Select => Operation::Select,
        AuthAction::Function { function_name } => Operation::Function {
            name: function_name,
        },
        AuthAction::Recursive => Operation::Recursive,
        AuthAction::Attach { .. } => Operation::Attach,
        AuthAction::Detach { .. } => Operation::Detach,
        AuthAction::Pragma { pragma_name, .. } => Operation::Pragma { name: pragma_name },
        AuthAction::Transaction { .. } | AuthAction::Savepoint { .. } => Operation::Transaction,
        AuthAction::Insert { table_name }
        | AuthAction::Delete { table_name }
        | AuthAction::Update { table_name, .. } => Operation::Write { table: table_name },
        _ => Operation::Other("schema or maintenance action"),
    };

    match policy.authorize(&op) {
        Authorization::Allow => SqliteAuthorization::Allow,
        Authorization::Deny => SqliteAuthorization::Deny,
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::new(err.to_string())
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Boolean(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(r) => ToSqlOutput::Owned(Value::Real(*r)),
            SqlValue::Text(t) => ToSqlOutput::Borrowed(ValueRef::Text(t.as_bytes())),
            SqlValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b.as_slice())),
        })
    }
}

fn from_value_ref(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(r) => SqlValue::Real(r),
        ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
    }
}

impl WarehouseConnection for SqliteWarehouse {
    fn engine_name(&self) -> &'static str {
        "sqlite"
    }

    fn flavor(&self) -> SqlFlavor {
        SqlFlavor::Sqlite
    }

    fn canceller(&self) -> Arc<dyn QueryCanceller> {
        self.canceller.clone()
    }

    fn query(&mut self, sql: &str, params: &[SqlValue], limit: usize) -> Result<RowSet, EngineError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        let mut truncated = false;

        while let Some(row) = rows.next()? {
            if out.len() == limit {
                truncated = true;
                break;
            }
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(from_value_ref(row.get_ref(idx)?));
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
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    fn fixture() -> Result<(TempDir, std::path::PathBuf)> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("wh.db");
        let rw = Connection::open(&path)?;
        rw.execute_batch(
            "CREATE TABLE fct_fx_rates (currency TEXT, period TEXT, rate REAL);
             INSERT INTO fct_fx_rates VALUES ('EUR', '2024-07', 1.25), ('GBP', '2024-07', 1.3);",
        )?;
        Ok((dir, path))
    }

    #[test]
    fn test_reads_with_positional_params() -> Result<()> {
        let (_dir, path) = fixture()?;
        let mut wh = SqliteWarehouse::open(&path)?;

        let rs = wh
            .query(
                "SELECT currency, rate FROM fct_fx_rates WHERE currency = ?",
                &[SqlValue::from("EUR")],
                10,
            )
            .unwrap();
        assert_eq!(rs.columns, vec!["currency", "rate"]);
        assert_eq!(rs.rows, vec![vec![SqlValue::from("EUR"), SqlValue::Real(1.25)]]);
        assert!(!rs.truncated);
        Ok(())
    }

    #[test]
    fn test_uri_escapes_reserved_characters() -> Result<()> {
        assert_eq!(
            file_uri(Path::new("/data/q?4#a%b.db")),
            "file:/data/q%3f4%23a%25b.db?mode=ro"
        );

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("what?#50%.db");
        Connection::open(&path)?.execute_batch("CREATE TABLE t (a INT); INSERT INTO t VALUES (7);")?;

        let mut wh = SqliteWarehouse::open(&path)?;
        let rs = wh.query("SELECT a FROM t", &[], 10).unwrap();
        assert_eq!(rs.rows[0][0], SqlValue::Integer(7));
        Ok(())
    }

    #[test]
    fn test_limit_plus_one_marks_truncation() -> Result<()> {
        let (_dir, path) = fixture()?;
        let mut wh = SqliteWarehouse::open(&path)?;
        let rs = wh.query("SELECT * FROM fct_fx_rates", &[], 1).unwrap();
        assert_eq!(rs.rows.len(), 1);
        assert!(rs.truncated);
        Ok(())
    }

    #[test]
    fn test_writes_are_refused_by_engine() -> Result<()> {
        let (_dir, path) = fixture()?;
        let mut wh = SqliteWarehouse::open(&path)?;

        // The guard is bypassed here on purpose: the engine layers hold on their own.
        assert!(wh.query("DELETE FROM fct_fx_rates", &[], 10).is_err());
        assert!(wh.query("CREATE TABLE x (a INT)", &[], 10).is_err());
        assert!(wh.query("ATTACH DATABASE ':memory:' AS other", &[], 10).is_err());
        assert!(wh.query("PRAGMA query_only = OFF", &[], 10).is_err());
        assert!(wh.query("SELECT load_extension('x')", &[], 10).is_err());

        let rs = wh.query("SELECT count(*) FROM fct_fx_rates", &[], 10).unwrap();
        assert_eq!(rs.rows[0][0], SqlValue::Integer(2));
        Ok(())
    }

    #[test]
    fn test_missing_or_invalid_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let missing = SqliteWarehouse::open(&dir.path().join("nope.db"));
        assert!(matches!(missing, Err(InfrastructureError::Connection { .. })));

        let junk = dir.path().join("junk.db");
        std::fs::write(&junk, b"definitely not a database file, just some bytes")?;
        assert!(SqliteWarehouse::open(&junk).is_err());
        Ok(())
    }
}
