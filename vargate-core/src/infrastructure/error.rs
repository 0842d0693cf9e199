// vargate-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("SQLite Engine Error: {0}")]
    #[diagnostic(
        code(vargate::infra::database::sqlite),
        help("An error occurred inside the SQLite engine.")
    )]
    Sqlite(#[from] rusqlite::Error),

    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(vargate::infra::database::duckdb),
        help("An error occurred inside the DuckDB engine.")
    )]
    DuckDB(#[from] duckdb::Error),
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- CONNECTION (read-only layers) ---
    #[error("Cannot open warehouse '{path}': {reason}")]
    #[diagnostic(
        code(vargate::infra::connection),
        help("The warehouse must be an existing database file. It is always opened read-only.")
    )]
    Connection { path: String, reason: String },

    // --- DATABASE (Abstracted) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(vargate::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(vargate::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON Error: {0}")]
    #[diagnostic(code(vargate::infra::json))]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    #[diagnostic(code(vargate::infra::config))]
    ConfigError(String),

    #[error("Configuration not found at '{0}'")]
    #[diagnostic(code(vargate::infra::config_missing))]
    ConfigNotFound(String),

    // --- TEMPLATING ---
    #[error("Template Error: {0}")]
    #[diagnostic(
        code(vargate::infra::template),
        help("Template bodies may only use {{% if name %}} blocks and :name placeholders.")
    )]
    TemplateError(#[from] minijinja::Error),
}

// Shortcuts for `?` on engine calls
impl From<rusqlite::Error> for InfrastructureError {
    fn from(err: rusqlite::Error) -> Self {
        InfrastructureError::Database(DatabaseError::Sqlite(err))
    }
}

impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}

impl From<validator::ValidationErrors> for InfrastructureError {
    fn from(err: validator::ValidationErrors) -> Self {
        InfrastructureError::ConfigError(err.to_string())
    }
}
