// vargate-core/src/ports/mod.rs

pub mod renderer;
pub mod warehouse;

pub use renderer::TemplateEngine;
pub use warehouse::{EngineError, QueryCanceller, RowSet, WarehouseConnection};
