// vargate-core/tests/query_boundary_tests.rs
//
// End-to-end checks of the read-only boundary against real warehouse files.

#![allow(clippy::unwrap_used)]

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

use vargate_core::application::{ExecutionError, QueryExecutor, Session};
use vargate_core::domain::audit::AuditOutcome;
use vargate_core::domain::query::{QueryParams, QueryRequest, SqlValue};
use vargate_core::infrastructure::adapters::{Engine, open_readonly};
use vargate_core::infrastructure::config::Settings;

const SCHEMA: &str = "
CREATE TABLE raw_ledger_entries (
    entry_id TEXT, period TEXT, account_code TEXT, account_type TEXT,
    cost_center TEXT, department TEXT, currency TEXT, amount_local REAL, description TEXT
);
CREATE TABLE fct_fx_rates (currency TEXT, period TEXT, rate_to_usd REAL);
CREATE TABLE mart_pnl_report (
    department TEXT, account_type TEXT, period TEXT,
    actual_usd REAL, budget_usd REAL, variance_usd REAL, variance_pct REAL
);
INSERT INTO raw_ledger_entries VALUES
    ('E1', '2024-03', '5000', 'COGS', 'CC-300', 'Operations', 'USD', 180000, 'Freight surcharge'),
    ('E2', '2024-03', '5000', 'COGS', 'CC-100', 'Operations', 'USD', 20000, 'Materials'),
    ('E3', '2024-04', '5000', 'COGS', 'CC-300', 'Operations', 'USD', 175000, 'Freight surcharge'),
    ('E4', '2024-06', '4000', 'Revenue', 'CC-200', 'Sales', 'EUR', 0, 'Missing invoices');
INSERT INTO fct_fx_rates VALUES
    ('EUR', '2024-06', 1.08), ('EUR', '2024-07', 1.25), ('EUR', '2024-08', 1.09);
INSERT INTO mart_pnl_report VALUES
    ('Operations', 'COGS', '2024-03', 200000, 120000, 80000, 66.67),
    ('Sales', 'Revenue', '2024-06', 0, 150000, -150000, -100.0),
    ('Finance', 'OpEx', '2024-07', 50000, 100000, -50000, -50.0),
    ('Finance', 'OpEx', '2024-08', 52000, 100000, -48000, -48.0);
";

fn sqlite_warehouse() -> Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("warehouse.db");
    let conn = rusqlite::Connection::open(&path)?;
    conn.execute_batch(SCHEMA)?;
    Ok((dir, path))
}

fn duckdb_warehouse() -> Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("warehouse.duckdb");
    let conn = duckdb::Connection::open(&path)?;
    conn.execute_batch(&SCHEMA.replace(" TEXT", " VARCHAR").replace(" REAL", " DOUBLE"))?;
    Ok((dir, path))
}

fn executor(engine: Engine, path: &Path) -> Result<QueryExecutor> {
    Ok(QueryExecutor::new(open_readonly(engine, path)?))
}

#[test]
fn test_select_with_positional_params() -> Result<()> {
    let (_dir, path) = sqlite_warehouse()?;
    let mut exec = executor(Engine::Sqlite, &path)?;

    let result = exec
        .execute(
            QueryRequest::new(
                "SELECT cost_center, SUM(amount_local) AS total FROM raw_ledger_entries \
                 WHERE account_type = ? GROUP BY cost_center ORDER BY total DESC",
            )
            .with_params(QueryParams::Positional(vec![SqlValue::from("COGS")])),
        )
        .unwrap();

    assert_eq!(result.columns, vec!["cost_center", "total"]);
    assert_eq!(result.row_count, 2);
    assert_eq!(result.rows[0]["cost_center"], SqlValue::from("CC-300"));
    assert_eq!(result.rows[0]["total"], SqlValue::Real(355000.0));
    Ok(())
}

#[test]
fn test_mutations_never_reach_the_warehouse() -> Result<()> {
    let (_dir, path) = sqlite_warehouse()?;
    let mut exec = executor(Engine::Sqlite, &path)?;

    for sql in [
        "DELETE FROM raw_ledger_entries",
        "SELECT 1; DROP TABLE raw_ledger_entries",
        "SELECT 1 /* harmless */ ; -- trailing\n UPDATE fct_fx_rates SET rate_to_usd = 0",
        "WITH x AS (SELECT 1) INSERT INTO fct_fx_rates SELECT * FROM fct_fx_rates",
        "ATTACH DATABASE '/tmp/other.db' AS other",
        "PRAGMA writable_schema = ON",
        "",
    ] {
        let err = exec.execute(sql).unwrap_err();
        assert!(matches!(err, ExecutionError::Rejected(_)), "{sql}: {err}");
    }

    // Keywords inside literals are data, not statements.
    let ok = exec
        .execute("SELECT 'DELETE FROM raw_ledger_entries' AS note, count(*) AS n FROM raw_ledger_entries")
        .unwrap();
    assert_eq!(ok.rows[0]["n"], SqlValue::Integer(4));
    assert_eq!(exec.audit().count(AuditOutcome::Rejected), 7);
    Ok(())
}

#[test]
fn test_engine_error_is_failed_and_connection_survives() -> Result<()> {
    let (_dir, path) = sqlite_warehouse()?;
    let mut exec = executor(Engine::Sqlite, &path)?;

    let err = exec.execute("SELECT no_such_column FROM fct_fx_rates").unwrap_err();
    assert!(matches!(err, ExecutionError::Failed(ref m) if m.contains("no_such_column")));

    let err = exec.execute("SELECT * FROM no_such_table").unwrap_err();
    assert!(matches!(err, ExecutionError::Failed(_)));

    let ok = exec.execute("SELECT count(*) FROM fct_fx_rates").unwrap();
    assert_eq!(ok.scalar(), Some(&SqlValue::Integer(3)));
    Ok(())
}

#[test]
fn test_timeout_cancels_only_the_running_statement() -> Result<()> {
    let (_dir, path) = sqlite_warehouse()?;
    let mut exec = executor(Engine::Sqlite, &path)?.with_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let err = exec
        .execute("WITH RECURSIVE r(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM r) SELECT count(*) FROM r")
        .unwrap_err();
    assert!(matches!(err, ExecutionError::TimedOut { .. }), "{err}");
    assert!(started.elapsed() < Duration::from_secs(5));

    // Same connection, next statement: no leftover interrupt.
    let ok = exec.execute("SELECT 1 AS one").unwrap();
    assert_eq!(ok.scalar(), Some(&SqlValue::Integer(1)));

    let outcomes: Vec<_> = exec.audit().entries().iter().map(|e| e.outcome).collect();
    assert_eq!(outcomes, vec![AuditOutcome::TimedOut, AuditOutcome::Success]);
    Ok(())
}

#[test]
fn test_row_cap_and_truncation_flag() -> Result<()> {
    let (_dir, path) = sqlite_warehouse()?;
    let mut exec = executor(Engine::Sqlite, &path)?.with_max_rows(2);

    let capped = exec.execute("SELECT * FROM raw_ledger_entries").unwrap();
    assert_eq!(capped.row_count, 2);
    assert!(capped.truncated);

    let exact = exec
        .execute("SELECT * FROM raw_ledger_entries WHERE period = '2024-03'")
        .unwrap();
    assert_eq!(exact.row_count, 2);
    assert!(!exact.truncated);

    assert_eq!(
        exec.total_row_count("SELECT * FROM raw_ledger_entries;", QueryParams::None)
            .unwrap(),
        4
    );
    assert_eq!(
        exec.total_row_count("SELECT * FROM raw_ledger_entries -- all entries", QueryParams::None)
            .unwrap(),
        4
    );
    Ok(())
}

#[test]
fn test_audit_trail_is_complete_and_ordered() -> Result<()> {
    let (_dir, path) = sqlite_warehouse()?;
    let mut exec = executor(Engine::Sqlite, &path)?;

    let _ = exec.execute("SELECT * FROM fct_fx_rates");
    let _ = exec.execute("DROP TABLE fct_fx_rates");
    let _ = exec.execute("SELECT missing FROM fct_fx_rates");
    let _ = exec.table_names();

    let audit = exec.into_audit();
    let sequences: Vec<u64> = audit.entries().iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);
    assert!(
        audit
            .entries()
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    );

    let json: serde_json::Value = serde_json::from_str(&audit.to_json()?)?;
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0]["outcome"], "success");
    assert_eq!(entries[0]["row_count"], 3);
    assert_eq!(entries[1]["outcome"], "rejected");
    assert_eq!(entries[2]["outcome"], "failed");
    assert!(entries[2]["reason"].as_str().unwrap().contains("missing"));
    Ok(())
}

#[test]
fn test_table_names() -> Result<()> {
    let (_dir, path) = sqlite_warehouse()?;
    let mut exec = executor(Engine::Sqlite, &path)?;
    assert_eq!(
        exec.table_names().unwrap(),
        vec!["fct_fx_rates", "mart_pnl_report", "raw_ledger_entries"]
    );
    Ok(())
}

#[test]
fn test_templates_through_session() -> Result<()> {
    let (dir, path) = sqlite_warehouse()?;
    let settings = Settings {
        warehouse_path: path,
        ..Settings::default()
    };
    let session = Session::load(settings)?;
    let mut exec = session.open_executor()?;

    let values = BTreeMap::from([("period".to_string(), "2024-07".to_string())]);
    let rendered = session
        .templates
        .render_by_name("variance_summary", &values)?;
    let result = exec.execute(rendered.into_request()).unwrap();
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0]["department"], SqlValue::from("Finance"));

    let fx = session
        .templates
        .render_by_name("fx_rate_history", &BTreeMap::from([("currency".into(), "EUR".into())]))?;
    let result = exec.execute(fx.into_request()).unwrap();
    let jump = result.rows[1]["pct_change"].as_f64().unwrap();
    assert!((jump - 15.74).abs() < 0.01);

    let entry = &exec.audit().entries()[0];
    assert_eq!(entry.params[0].name.as_deref(), Some("period"));
    assert!(!entry.statement.contains("2024-07"));
    drop(dir);
    Ok(())
}

#[test]
fn test_duckdb_engine_end_to_end() -> Result<()> {
    let (_dir, path) = duckdb_warehouse()?;
    let mut exec = executor(Engine::DuckDb, &path)?;

    let result = exec
        .execute(
            QueryRequest::new(
                "SELECT department, variance_usd FROM mart_pnl_report WHERE period = :period",
            )
            .with_params(QueryParams::Named(vec![(
                "period".into(),
                SqlValue::from("2024-06"),
            )])),
        )
        .unwrap();
    assert_eq!(result.rows[0]["department"], SqlValue::from("Sales"));
    assert_eq!(result.rows[0]["variance_usd"], SqlValue::Real(-150000.0));

    let err = exec
        .execute("SELECT * FROM read_csv_auto('/etc/passwd')")
        .unwrap_err();
    assert!(matches!(err, ExecutionError::Failed(ref m) if m.contains("not authorized")));

    assert!(matches!(
        exec.execute("CREATE TABLE x AS SELECT 1"),
        Err(ExecutionError::Rejected(_))
    ));

    let tables = exec.table_names().unwrap();
    assert_eq!(tables.len(), 3);
    Ok(())
}
