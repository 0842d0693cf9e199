// vargate-core/src/application/executor.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{Span, debug, error, info, instrument, warn};

use crate::domain::audit::{AuditOutcome, AuditRecord, AuditTrail};
use crate::domain::guard::{GuardRejection, StatementGuard};
use crate::domain::query::{QueryParams, QueryRequest, QueryResult, Row, SqlValue};
use crate::ports::warehouse::{EngineError, RowSet, WarehouseConnection};

pub const DEFAULT_MAX_ROWS: usize = 500;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Hard upper bound on rows per statement, matching the settings range.
pub const MAX_ROWS_CEILING: usize = 100_000;

/// Why a statement produced no result. Returned as a value; the executor
/// and its connection stay usable after any of these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Statement rejected: {0}")]
    Rejected(#[from] GuardRejection),

    #[error("Statement failed: {0}")]
    Failed(String),

    #[error("Statement cancelled after {timeout:?}")]
    TimedOut { timeout: Duration },
}

impl ExecutionError {
    pub fn outcome(&self) -> AuditOutcome {
        match self {
            ExecutionError::Rejected(_) => AuditOutcome::Rejected,
            ExecutionError::Failed(_) => AuditOutcome::Failed,
            ExecutionError::TimedOut { .. } => AuditOutcome::TimedOut,
        }
    }
}

/// Single entry point for statements. Owns its connection and its audit trail.
pub struct QueryExecutor {
    conn: Box<dyn WarehouseConnection>,
    guard: StatementGuard,
    max_rows: usize,
    timeout: Duration,
    audit: AuditTrail,
}

struct Attempt {
    statement: String,
    params: QueryParams,
    started: Instant,
}

impl QueryExecutor {
    pub fn new(conn: Box<dyn WarehouseConnection>) -> Self {
        let guard = StatementGuard::new(conn.flavor());
        Self {
            conn,
            guard,
            max_rows: DEFAULT_MAX_ROWS,
            timeout: DEFAULT_TIMEOUT,
            audit: AuditTrail::new(),
        }
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows.clamp(1, MAX_ROWS_CEILING);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn engine_name(&self) -> &'static str {
        self.conn.engine_name()
    }

    pub fn guard(&self) -> &StatementGuard {
        &self.guard
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Guard, bind, run under the deadline, cap rows, audit. Exactly one
    /// audit entry is written per call.
    #[instrument(skip_all, fields(engine = self.conn.engine_name(), sql_len, outcome, rows))]
    pub fn execute(&mut self, request: impl Into<QueryRequest>) -> Result<QueryResult, ExecutionError> {
        let request = request.into();
        Span::current().record("sql_len", request.sql.len());
        let mut attempt = Attempt {
            statement: request.sql.trim().to_string(),
            params: request.params.clone(),
            started: Instant::now(),
        };

        let validated = match self.guard.validate(&request.sql) {
            Ok(v) => v,
            Err(rejection) => {
                warn!(reason = %rejection, "Statement rejected by guard");
                return Err(self.fail(attempt, rejection.into()));
            }
        };
        attempt.statement = validated.sql().to_string();

        let (sql, values) = match validated.bind(&request.params) {
            Ok(bound) => bound,
            Err(message) => return Err(self.fail(attempt, ExecutionError::Failed(message))),
        };

        let limit = request
            .max_rows
            .map_or(self.max_rows, |n| n.clamp(1, MAX_ROWS_CEILING));
        debug!(limit, params = values.len(), "Executing statement");

        let rows = match self.run_with_deadline(&sql, &values, limit) {
            Ok(rows) => rows,
            Err(err) => return Err(self.fail(attempt, err)),
        };

        let result = materialize(attempt.statement.clone(), rows, elapsed_ms(attempt.started));
        self.audit.record(AuditRecord {
            statement: attempt.statement,
            params: attempt.params.audit_values(),
            row_count: result.row_count,
            truncated: result.truncated,
            execution_time_ms: result.execution_time_ms,
            outcome: AuditOutcome::Success,
            reason: None,
        });

        let span = Span::current();
        span.record("outcome", "success");
        span.record("rows", result.row_count);
        info!(
            rows = result.row_count,
            truncated = result.truncated,
            elapsed_ms = result.execution_time_ms,
            "Statement executed"
        );
        Ok(result)
    }

    /// Counts the rows a statement would return, through the same guarded path.
    pub fn total_row_count(&mut self, sql: &str, params: QueryParams) -> Result<i64, ExecutionError> {
        let inner = match self.guard.validate(sql) {
            Ok(v) => v,
            Err(rejection) => {
                let attempt = Attempt {
                    statement: sql.trim().to_string(),
                    params,
                    started: Instant::now(),
                };
                return Err(self.fail(attempt, rejection.into()));
            }
        };
        let wrapped = format!("SELECT COUNT(*) AS row_count FROM (\n{}\n) AS counted", inner.sql());
        let result = self.execute(QueryRequest::new(wrapped).with_params(params))?;
        match result.scalar() {
            Some(SqlValue::Integer(n)) => Ok(*n),
            other => Err(ExecutionError::Failed(format!(
                "unexpected COUNT(*) result: {other:?}"
            ))),
        }
    }

    /// User tables of the warehouse, via the engine's catalog query.
    pub fn table_names(&mut self) -> Result<Vec<String>, ExecutionError> {
        let sql = self.conn.table_names_sql();
        let result = self.execute(QueryRequest::new(sql).with_max_rows(10_000))?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| row.values().next().and_then(SqlValue::as_str))
            .map(String::from)
            .collect())
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn into_audit(self) -> AuditTrail {
        self.audit
    }

    pub fn audit_json(&self) -> Result<String, serde_json::Error> {
        self.audit.to_json()
    }

    fn fail(&mut self, attempt: Attempt, err: ExecutionError) -> ExecutionError {
        let outcome = err.outcome();
        self.audit.record(AuditRecord {
            statement: attempt.statement,
            params: attempt.params.audit_values(),
            row_count: 0,
            truncated: false,
            execution_time_ms: elapsed_ms(attempt.started),
            outcome,
            reason: Some(err.to_string()),
        });
        Span::current().record("outcome", outcome.as_str());
        err
    }

    /// Runs the statement while a watchdog waits for it. At the deadline the
    /// watchdog interrupts this connection only. The scope joins the watchdog
    /// before returning, so a late interrupt cannot hit the next statement.
    fn run_with_deadline(
        &mut self,
        sql: &str,
        values: &[SqlValue],
        limit: usize,
    ) -> Result<RowSet, ExecutionError> {
        let canceller = self.conn.canceller();
        let fired = AtomicBool::new(false);
        let timeout = self.timeout;
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let conn = &mut self.conn;

        let outcome: Result<RowSet, EngineError> = thread::scope(|scope| {
            let fired = &fired;
            let canceller = &canceller;
            scope.spawn(move || {
                if let Err(mpsc::RecvTimeoutError::Timeout) = done_rx.recv_timeout(timeout) {
                    fired.store(true, Ordering::SeqCst);
                    canceller.cancel();
                }
            });
            let outcome = conn.query(sql, values, limit);
            // The watchdog may already have fired and exited.
            let _ = done_tx.send(());
            outcome
        });

        match outcome {
            Ok(rows) => Ok(rows),
            Err(_) if fired.load(Ordering::SeqCst) => {
                warn!(?timeout, "Statement cancelled by watchdog");
                Err(ExecutionError::TimedOut { timeout })
            }
            Err(e) => {
                error!(error = %e, "Engine refused or failed the statement");
                Err(ExecutionError::Failed(e.message))
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn materialize(statement: String, set: RowSet, execution_time_ms: f64) -> QueryResult {
    let rows: Vec<Row> = set
        .rows
        .into_iter()
        .map(|values| set.columns.iter().cloned().zip(values).collect())
        .collect();
    QueryResult {
        sql: statement,
        row_count: rows.len(),
        columns: set.columns,
        rows,
        truncated: set.truncated,
        execution_time_ms,
    }
}
