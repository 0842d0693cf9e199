// vargate-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Circular dependency detected in lineage: {0}")]
    #[diagnostic(
        code(vargate::domain::cycle),
        help("Lineage must be a DAG. Remove one of the upstream edges listed above.")
    )]
    CycleDetected(String),

    #[error("Table '{table}' declares unknown upstream '{upstream}'")]
    #[diagnostic(code(vargate::domain::unknown_upstream))]
    UnknownUpstream { table: String, upstream: String },

    #[error("Table '{0}' is declared more than once in the lineage catalog")]
    #[diagnostic(code(vargate::domain::duplicate_table))]
    DuplicateTable(String),

    #[error(
        "Layer violation: '{table}' ({table_layer}) cannot depend on '{upstream}' ({upstream_layer})"
    )]
    #[diagnostic(
        code(vargate::domain::layer),
        help("Upstream tables must sit in the same or an earlier layer (raw -> staging -> fact -> intermediate -> mart).")
    )]
    LayerViolation {
        table: String,
        table_layer: String,
        upstream: String,
        upstream_layer: String,
    },

    #[error("Table '{0}' not found in lineage")]
    #[diagnostic(code(vargate::domain::table_not_found))]
    TableNotFound(String),

    #[error("Template '{0}' not found")]
    #[diagnostic(code(vargate::domain::template_not_found))]
    TemplateNotFound(String),

    #[error("Template '{name}' failed validation: {reason}")]
    #[diagnostic(
        code(vargate::domain::template_invalid),
        help("Templates are checked against the statement guard at startup.")
    )]
    TemplateInvalid { name: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(vargate::domain::render))]
    Render(#[from] RenderError),

    #[error("Confidence factor '{factor}' must be within [0, 1], got {value}")]
    #[diagnostic(code(vargate::domain::confidence))]
    InvalidConfidenceFactor { factor: &'static str, value: f64 },

    #[error("Catalog Error: {0}")]
    #[diagnostic(code(vargate::domain::catalog))]
    CatalogInvalid(String),
}

/// Caller errors raised while rendering a template. Never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Template '{template}' requires parameter '{parameter}'")]
    MissingParameter { template: String, parameter: String },

    #[error("Template '{template}' has no parameter named '{parameter}'")]
    UnknownParameter { template: String, parameter: String },

    #[error("Invalid value {value:?} for parameter '{parameter}' (expected {expected})")]
    InvalidValue {
        parameter: String,
        value: String,
        expected: &'static str,
    },

    #[error("Template '{template}' could not be rendered: {message}")]
    Engine { template: String, message: String },
}
