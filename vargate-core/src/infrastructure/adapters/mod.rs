// vargate-core/src/infrastructure/adapters/mod.rs

pub mod duckdb;
pub mod sqlite;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::domain::guard::SqlFlavor;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::warehouse::WarehouseConnection;

pub use self::duckdb::DuckDbWarehouse;
pub use self::sqlite::SqliteWarehouse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Sqlite,
    DuckDb,
}

impl Engine {
    pub fn flavor(&self) -> SqlFlavor {
        match self {
            Engine::Sqlite => SqlFlavor::Sqlite,
            Engine::DuckDb => SqlFlavor::DuckDb,
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Sqlite => write!(f, "sqlite"),
            Engine::DuckDb => write!(f, "duckdb"),
        }
    }
}

impl FromStr for Engine {
    type Err = InfrastructureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Engine::Sqlite),
            "duckdb" => Ok(Engine::DuckDb),
            other => Err(InfrastructureError::ConfigError(format!(
                "Unknown engine '{other}' (expected 'sqlite' or 'duckdb')"
            ))),
        }
    }
}

/// Opens a warehouse with every read-only layer of the chosen engine installed.
/// There is no writable counterpart.
pub fn open_readonly(
    engine: Engine,
    path: &Path,
) -> Result<Box<dyn WarehouseConnection>, InfrastructureError> {
    let conn: Box<dyn WarehouseConnection> = match engine {
        Engine::Sqlite => Box::new(SqliteWarehouse::open(path)?),
        Engine::DuckDb => Box::new(DuckDbWarehouse::open(path)?),
    };
    tracing::info!(engine = %engine, path = %path.display(), "Warehouse connection ready");
    Ok(conn)
}
