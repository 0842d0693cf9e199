// vargate-core/src/application/mod.rs

pub mod executor;
pub mod lineage;
pub mod session;
pub mod templates;
pub mod variance;

// --- RE-EXPORTS (FACADE) ---
// The CLI only needs `use vargate_core::application::{Session, QueryExecutor, ...}`.

pub use executor::{ExecutionError, QueryExecutor};
pub use lineage::LineageReport;
pub use session::Session;
pub use templates::{RenderedQuery, TemplateRegistry};
pub use variance::{VarianceOptions, VarianceReport};
