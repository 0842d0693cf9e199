// vargate-core/src/infrastructure/config/mod.rs

pub mod catalog;
pub mod settings;

pub use catalog::{load_anomalies, load_lineage, load_templates};
pub use settings::{Settings, apply_env_overrides, load_settings};
