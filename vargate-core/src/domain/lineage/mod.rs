// vargate-core/src/domain/lineage/mod.rs

pub mod dag;
pub mod descriptor;
pub mod registry;

pub use descriptor::{Layer, LineageCatalog, TableDescriptor};
pub use registry::LineageRegistry;
