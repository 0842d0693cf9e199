// vargate-core/src/application/templates.rs

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::domain::error::{DomainError, RenderError};
use crate::domain::guard::{PlaceholderKind, StatementGuard};
use crate::domain::query::{QueryParams, QueryRequest, SqlValue};
use crate::domain::template::{TemplateCatalog, TemplateDefinition};
use crate::ports::TemplateEngine;

/// A template expanded for one call: structure fixed, values still separate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedQuery {
    pub template: String,
    pub sql: String,
    pub params: QueryParams,
}

impl RenderedQuery {
    pub fn into_request(self) -> QueryRequest {
        QueryRequest::new(self.sql).with_params(self.params)
    }
}

/// Named investigative statements, validated once at construction.
pub struct TemplateRegistry {
    templates: Vec<TemplateDefinition>,
    index: HashMap<String, usize>,
    engine: Arc<dyn TemplateEngine>,
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("templates", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> DomainError {
    DomainError::TemplateInvalid {
        name: name.to_string(),
        reason: reason.into(),
    }
}

impl TemplateRegistry {
    /// Renders every template under every present/absent combination of its
    /// optional parameters and runs each rendering through `guard`. The first
    /// failure aborts construction.
    #[instrument(skip_all, fields(templates = catalog.templates.len()))]
    pub fn new(
        catalog: TemplateCatalog,
        engine: Arc<dyn TemplateEngine>,
        guard: &StatementGuard,
    ) -> Result<Self, DomainError> {
        let mut index = HashMap::new();
        for (pos, template) in catalog.templates.iter().enumerate() {
            if index.insert(template.name.clone(), pos).is_some() {
                return Err(invalid(&template.name, "declared more than once"));
            }
            check_template(template, engine.as_ref(), guard)?;
        }
        info!(count = index.len(), "Template registry ready");
        Ok(Self {
            templates: catalog.templates,
            index,
            engine,
        })
    }

    pub fn get(&self, name: &str) -> Result<&TemplateDefinition, DomainError> {
        self.index
            .get(name)
            .map(|&i| &self.templates[i])
            .ok_or_else(|| DomainError::TemplateNotFound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.name.as_str())
    }

    pub fn list(&self) -> &[TemplateDefinition] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Checks caller values and expands the template. Values end up in
    /// `params`, bound to the `:name` placeholders, never in `sql`.
    pub fn render(
        &self,
        template: &TemplateDefinition,
        values: &BTreeMap<String, String>,
    ) -> Result<RenderedQuery, RenderError> {
        for key in values.keys() {
            if template.param(key).is_none() {
                return Err(RenderError::UnknownParameter {
                    template: template.name.clone(),
                    parameter: key.clone(),
                });
            }
        }

        let mut bound: Vec<(String, SqlValue)> = Vec::new();
        let mut presence = BTreeMap::new();
        for param in &template.params {
            match values.get(&param.name) {
                Some(raw) => {
                    bound.push((param.name.clone(), param.check(raw)?));
                    presence.insert(param.name.clone(), true);
                }
                None if param.required => {
                    return Err(RenderError::MissingParameter {
                        template: template.name.clone(),
                        parameter: param.name.clone(),
                    });
                }
                None => {
                    presence.insert(param.name.clone(), false);
                }
            }
        }

        let sql = self
            .engine
            .render(&template.sql, &presence)
            .map_err(|e| RenderError::Engine {
                template: template.name.clone(),
                message: e.to_string(),
            })?;
        debug!(template = %template.name, params = bound.len(), "Template rendered");

        Ok(RenderedQuery {
            template: template.name.clone(),
            sql: sql.trim().to_string(),
            params: if bound.is_empty() {
                QueryParams::None
            } else {
                QueryParams::Named(bound)
            },
        })
    }

    pub fn render_by_name(
        &self,
        name: &str,
        values: &BTreeMap<String, String>,
    ) -> Result<RenderedQuery, DomainError> {
        let template = self.get(name)?;
        Ok(self.render(template, values)?)
    }
}

fn check_template(
    template: &TemplateDefinition,
    engine: &dyn TemplateEngine,
    guard: &StatementGuard,
) -> Result<(), DomainError> {
    let mut seen = HashSet::new();
    for param in &template.params {
        if !seen.insert(param.name.as_str()) {
            return Err(invalid(
                &template.name,
                format!("parameter '{}' declared twice", param.name),
            ));
        }
    }

    let optional: Vec<&str> = template.optional_params().map(|p| p.name.as_str()).collect();
    if optional.len() > 8 {
        return Err(invalid(&template.name, "too many optional parameters"));
    }

    for mask in 0u32..(1 << optional.len()) {
        let presence: BTreeMap<String, bool> = template
            .params
            .iter()
            .map(|p| {
                let present = match optional.iter().position(|o| *o == p.name) {
                    Some(bit) => mask & (1 << bit) != 0,
                    None => true,
                };
                (p.name.clone(), present)
            })
            .collect();

        let sql = engine
            .render(&template.sql, &presence)
            .map_err(|e| invalid(&template.name, e.to_string()))?;
        let validated = guard
            .validate(&sql)
            .map_err(|e| invalid(&template.name, e.to_string()))?;

        // Placeholders must line up exactly with the parameters present.
        let mut used = HashSet::new();
        for placeholder in validated.placeholders() {
            match &placeholder.kind {
                PlaceholderKind::Named(name) if presence.get(name) == Some(&true) => {
                    used.insert(name.as_str());
                }
                PlaceholderKind::Named(name) => {
                    return Err(invalid(
                        &template.name,
                        format!("placeholder ':{name}' has no present parameter"),
                    ));
                }
                PlaceholderKind::Positional => {
                    return Err(invalid(&template.name, "positional placeholders are not allowed"));
                }
            }
        }
        if let Some((name, _)) = presence
            .iter()
            .find(|(name, present)| **present && !used.contains(name.as_str()))
        {
            return Err(invalid(
                &template.name,
                format!("parameter '{name}' is never bound"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::guard::SqlFlavor;
    use crate::domain::template::{ParamKind, TemplateParam};
    use crate::infrastructure::compiler::JinjaRenderer;
    use crate::infrastructure::config::load_templates;
    use anyhow::Result;

    fn registry(catalog: TemplateCatalog) -> Result<TemplateRegistry, DomainError> {
        TemplateRegistry::new(
            catalog,
            Arc::new(JinjaRenderer::new()),
            &StatementGuard::new(SqlFlavor::Sqlite),
        )
    }

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn single(sql: &str, params: Vec<TemplateParam>) -> TemplateCatalog {
        TemplateCatalog {
            templates: vec![TemplateDefinition {
                name: "t".into(),
                description: String::new(),
                params,
                sql: sql.into(),
            }],
        }
    }

    fn param(name: &str, required: bool, kind: ParamKind) -> TemplateParam {
        TemplateParam {
            name: name.into(),
            required,
            kind,
            description: String::new(),
        }
    }

    #[test]
    fn test_default_catalog_passes_both_guards() -> Result<()> {
        for flavor in [SqlFlavor::Sqlite, SqlFlavor::DuckDb] {
            let reg = TemplateRegistry::new(
                load_templates(None)?,
                Arc::new(JinjaRenderer::new()),
                &StatementGuard::new(flavor),
            )?;
            assert_eq!(reg.len(), 8);
        }
        Ok(())
    }

    #[test]
    fn test_render_keeps_values_out_of_text() -> Result<()> {
        let reg = registry(load_templates(None)?)?;
        let rendered = reg.render_by_name(
            "cost_center_drill",
            &values(&[("cost_center", "CC-300"), ("period", "2024-03")]),
        )?;
        assert!(rendered.sql.contains("r.cost_center = :cost_center"));
        assert!(rendered.sql.contains("AND r.period = :period"));
        assert!(!rendered.sql.contains("CC-300"));
        assert_eq!(
            rendered.params,
            QueryParams::Named(vec![
                ("cost_center".into(), SqlValue::from("CC-300")),
                ("period".into(), SqlValue::from("2024-03")),
            ])
        );

        let without = reg.render_by_name("cost_center_drill", &values(&[("cost_center", "CC-300")]))?;
        assert!(!without.sql.contains(":period"));
        Ok(())
    }

    #[test]
    fn test_render_errors() -> Result<()> {
        let reg = registry(load_templates(None)?)?;
        let tpl = reg.get("account_detail")?;

        assert!(matches!(
            reg.render(tpl, &values(&[])),
            Err(RenderError::MissingParameter { ref parameter, .. }) if parameter == "account_code"
        ));
        assert!(matches!(
            reg.render(tpl, &values(&[("account_code", "4000"), ("region", "EU")])),
            Err(RenderError::UnknownParameter { .. })
        ));
        assert!(matches!(
            reg.render(tpl, &values(&[("account_code", "4000' OR '1'='1")])),
            Err(RenderError::InvalidValue { .. })
        ));
        assert!(matches!(
            reg.get("drop_everything"),
            Err(DomainError::TemplateNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_no_param_template_renders_without_params() -> Result<()> {
        let reg = registry(load_templates(None)?)?;
        let rendered = reg.render_by_name("classification_check", &BTreeMap::new())?;
        assert_eq!(rendered.params, QueryParams::None);
        Ok(())
    }

    #[test]
    fn test_registration_catches_drift() {
        // A write hidden behind an optional block.
        let sneaky = single(
            "SELECT 1 {% if wipe %}; DELETE FROM t{% endif %}",
            vec![param("wipe", false, ParamKind::Text)],
        );
        assert!(matches!(
            registry(sneaky),
            Err(DomainError::TemplateInvalid { .. })
        ));

        let unbound = single(
            "SELECT * FROM t",
            vec![param("period", true, ParamKind::Period)],
        );
        let err = registry(unbound).unwrap_err();
        assert!(err.to_string().contains("never bound"));

        let stray = single("SELECT * FROM t WHERE p = :p", vec![]);
        assert!(registry(stray).is_err());

        let typo = single(
            "SELECT * FROM t {% if perid %}WHERE p = :period{% endif %}",
            vec![param("period", false, ParamKind::Period)],
        );
        assert!(registry(typo).is_err());
    }

    #[test]
    fn test_duplicate_template_names() {
        let mut catalog = single("SELECT 1", vec![]);
        catalog.templates.push(catalog.templates[0].clone());
        let err = registry(catalog).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
