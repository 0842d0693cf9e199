// vargate-core/src/application/session.rs

use std::sync::Arc;
use tracing::{info, instrument};

use crate::application::executor::QueryExecutor;
use crate::application::templates::TemplateRegistry;
use crate::domain::evaluation::AnomalyCatalog;
use crate::domain::guard::StatementGuard;
use crate::domain::lineage::LineageRegistry;
use crate::error::VargateError;
use crate::infrastructure::adapters::open_readonly;
use crate::infrastructure::compiler::JinjaRenderer;
use crate::infrastructure::config::{Settings, load_anomalies, load_lineage, load_templates};

/// Everything a run needs, built once from the settings. Registries are
/// immutable and shared through `Arc`.
#[derive(Debug, Clone)]
pub struct Session {
    pub settings: Settings,
    pub lineage: Arc<LineageRegistry>,
    pub templates: Arc<TemplateRegistry>,
    pub anomalies: Arc<AnomalyCatalog>,
}

impl Session {
    /// Loads and validates every catalog. Fails before any connection is
    /// opened if lineage is cyclic or a template does not pass the guard.
    #[instrument(skip_all, fields(engine = %settings.engine))]
    pub fn load(settings: Settings) -> Result<Self, VargateError> {
        let lineage = LineageRegistry::new(load_lineage(settings.lineage_catalog.as_deref())?.tables)?;

        let guard = StatementGuard::new(settings.engine.flavor());
        let templates = TemplateRegistry::new(
            load_templates(settings.template_catalog.as_deref())?,
            Arc::new(JinjaRenderer::new()),
            &guard,
        )?;

        let anomalies = load_anomalies(settings.anomaly_catalog.as_deref())?;

        info!(
            tables = lineage.len(),
            templates = templates.len(),
            rules = anomalies.rules.len(),
            "Session catalogs loaded"
        );
        Ok(Self {
            settings,
            lineage: Arc::new(lineage),
            templates: Arc::new(templates),
            anomalies: Arc::new(anomalies),
        })
    }

    /// Opens the warehouse read-only and wraps it in an executor carrying the
    /// configured row cap and timeout.
    pub fn open_executor(&self) -> Result<QueryExecutor, VargateError> {
        let conn = open_readonly(self.settings.engine, &self.settings.warehouse_path)?;
        Ok(QueryExecutor::new(conn)
            .with_max_rows(self.settings.max_rows)
            .with_timeout(self.settings.query_timeout()))
    }
}
