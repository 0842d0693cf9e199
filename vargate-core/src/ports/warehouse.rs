// vargate-core/src/ports/warehouse.rs

// What the executor needs from a warehouse engine, without knowing which one.
// Adapters open the connection read-only; nothing here can write.

use std::sync::Arc;
use thiserror::Error;

use crate::domain::guard::SqlFlavor;
use crate::domain::query::SqlValue;

/// Message reported by the engine for a statement it refused or could not run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Interrupts whatever statement is running on the connection it came from.
/// Safe to call from another thread.
pub trait QueryCanceller: Send + Sync {
    fn cancel(&self);
}

/// Raw rows in column order, before they are keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
    /// More rows were available than the requested limit.
    pub truncated: bool,
}

pub trait WarehouseConnection: Send {
    fn engine_name(&self) -> &'static str;

    fn flavor(&self) -> SqlFlavor;

    /// Connection-scoped interrupt handle.
    fn canceller(&self) -> Arc<dyn QueryCanceller>;

    /// Runs one guarded statement with positional values. Reads at most
    /// `limit + 1` rows so truncation can be reported without a second pass.
    fn query(&mut self, sql: &str, params: &[SqlValue], limit: usize) -> Result<RowSet, EngineError>;

    /// Catalog query listing user tables, one name per row.
    fn table_names_sql(&self) -> &'static str;
}
