// vargate-core/src/infrastructure/config/settings.rs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::infrastructure::adapters::Engine;
use crate::infrastructure::error::InfrastructureError;

pub const SETTINGS_CANDIDATES: [&str; 2] = ["vargate.yaml", "vargate.yml"];

pub const ENV_ENGINE: &str = "VARGATE_ENGINE";
pub const ENV_DB_PATH: &str = "VARGATE_DB_PATH";
pub const ENV_MAX_ROWS: &str = "VARGATE_MAX_ROWS";
pub const ENV_QUERY_TIMEOUT: &str = "VARGATE_QUERY_TIMEOUT";

/// Run-wide settings. Loaded once, then read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    pub engine: Engine,

    pub warehouse_path: PathBuf,

    #[validate(range(min = 1, max = 100_000, message = "max_rows must be within 1..=100000"))]
    pub max_rows: usize,

    #[validate(range(
        min = 1,
        max = 3600,
        message = "query_timeout_secs must be within 1..=3600"
    ))]
    pub query_timeout_secs: u64,

    /// Overrides for the embedded catalogs.
    pub lineage_catalog: Option<PathBuf>,
    pub template_catalog: Option<PathBuf>,
    pub anomaly_catalog: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine: Engine::default(),
            warehouse_path: PathBuf::from("data/warehouse.db"),
            max_rows: 500,
            query_timeout_secs: 30,
            lineage_catalog: None,
            template_catalog: None,
            anomaly_catalog: None,
        }
    }
}

impl Settings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.warehouse_path);
        for path in [
            &mut self.lineage_catalog,
            &mut self.template_catalog,
            &mut self.anomaly_catalog,
        ]
        .into_iter()
        .flatten()
        {
            resolve(path);
        }
    }
}

fn find_settings_file(root: &Path) -> Option<PathBuf> {
    SETTINGS_CANDIDATES
        .iter()
        .map(|name| root.join(name))
        .find(|p| p.is_file())
}

/// Reads `vargate.yaml` (or `.yml`) from `dir`, falls back to defaults when absent,
/// layers `VARGATE_*` variables on top and validates the result.
/// Relative paths are resolved against `dir`.
#[instrument(skip(dir), fields(dir = %dir.display()))]
pub fn load_settings(dir: &Path) -> Result<Settings, InfrastructureError> {
    let mut settings = match find_settings_file(dir) {
        Some(path) => {
            info!(path = %path.display(), "Loading settings");
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Settings::default()
            } else {
                serde_yaml::from_str(&content)?
            }
        }
        None => {
            info!("No settings file found, using defaults");
            Settings::default()
        }
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    settings.resolve_paths(dir);
    settings.validate()?;
    Ok(settings)
}

/// Layers environment values over the file settings. `lookup` is injected
/// so tests never touch the process environment.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F) -> Result<(), InfrastructureError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup(ENV_ENGINE) {
        info!(old = %settings.engine, new = %val, "Overriding engine via ENV");
        settings.engine = val.parse()?;
    }
    if let Some(val) = lookup(ENV_DB_PATH) {
        info!(old = ?settings.warehouse_path, new = %val, "Overriding warehouse path via ENV");
        settings.warehouse_path = PathBuf::from(val);
    }
    if let Some(val) = lookup(ENV_MAX_ROWS) {
        settings.max_rows = parse_number(ENV_MAX_ROWS, &val)?;
    }
    if let Some(val) = lookup(ENV_QUERY_TIMEOUT) {
        settings.query_timeout_secs = parse_number(ENV_QUERY_TIMEOUT, &val)?;
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, InfrastructureError> {
    raw.trim().parse().map_err(|_| {
        warn!(key, value = raw, "Rejected non-numeric override");
        InfrastructureError::ConfigError(format!("{key} must be a positive integer, got '{raw}'"))
    })
}
