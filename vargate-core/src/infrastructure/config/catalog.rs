// vargate-core/src/infrastructure/config/catalog.rs

// Static catalogs: lineage, templates, anomaly rules. Each has an embedded
// default and may be replaced by a YAML file named in the settings.

use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::domain::evaluation::AnomalyCatalog;
use crate::domain::lineage::LineageCatalog;
use crate::domain::template::TemplateCatalog;
use crate::infrastructure::error::InfrastructureError;

pub const DEFAULT_LINEAGE: &str = include_str!("../../../catalog/lineage.yaml");
pub const DEFAULT_TEMPLATES: &str = include_str!("../../../catalog/templates.yaml");
pub const DEFAULT_ANOMALIES: &str = include_str!("../../../catalog/anomalies.yaml");

/// Typed YAML fragment from a file.
fn load_fragment<T: DeserializeOwned>(path: &Path) -> Result<T, InfrastructureError> {
    if !path.is_file() {
        return Err(InfrastructureError::ConfigNotFound(
            path.display().to_string(),
        ));
    }
    let content = fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(Into::into)
}

fn load_or_default<T: DeserializeOwned>(
    path: Option<&Path>,
    embedded: &str,
    what: &str,
) -> Result<T, InfrastructureError> {
    match path {
        Some(p) => {
            info!(catalog = what, path = %p.display(), "Loading catalog override");
            load_fragment(p)
        }
        None => {
            debug!(catalog = what, "Using embedded catalog");
            serde_yaml::from_str(embedded).map_err(Into::into)
        }
    }
}

#[instrument(skip_all)]
pub fn load_lineage(path: Option<&Path>) -> Result<LineageCatalog, InfrastructureError> {
    load_or_default(path, DEFAULT_LINEAGE, "lineage")
}

#[instrument(skip_all)]
pub fn load_templates(path: Option<&Path>) -> Result<TemplateCatalog, InfrastructureError> {
    load_or_default(path, DEFAULT_TEMPLATES, "templates")
}

/// Rule ids are checked for uniqueness here, before any evaluation runs.
#[instrument(skip_all)]
pub fn load_anomalies(path: Option<&Path>) -> Result<AnomalyCatalog, InfrastructureError> {
    let catalog: AnomalyCatalog = load_or_default(path, DEFAULT_ANOMALIES, "anomalies")?;
    catalog
        .validate()
        .map_err(|e| InfrastructureError::ConfigError(e.to_string()))?;
    Ok(catalog)
}
