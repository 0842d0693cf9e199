// vargate-core/src/domain/mod.rs

pub mod audit;
pub mod authorizer;
pub mod confidence;
pub mod error;
pub mod evaluation;
pub mod guard;
pub mod lineage;
pub mod query;
pub mod template;
pub mod variance;
