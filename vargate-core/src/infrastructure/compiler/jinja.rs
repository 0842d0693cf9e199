// vargate-core/src/infrastructure/compiler/jinja.rs

// Turns a template body into one concrete statement shape: `{% if name %}`
// blocks are kept or dropped, `:name` placeholders pass through untouched.

use minijinja::{Environment, UndefinedBehavior};
use std::collections::BTreeMap;

use crate::error::VargateError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::TemplateEngine;

pub struct JinjaRenderer<'a> {
    env: Environment<'a>,
}

impl<'a> JinjaRenderer<'a> {
    pub fn new() -> Self {
        let mut env = Environment::new();
        // A misspelt parameter in a body must fail at registration, not render empty.
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        Self { env }
    }

    pub fn render(
        &self,
        body: &str,
        presence: &BTreeMap<String, bool>,
    ) -> Result<String, InfrastructureError> {
        let rendered = self
            .env
            .render_str(body, presence)
            .map_err(InfrastructureError::TemplateError)?;
        Ok(rendered)
    }
}

impl Default for JinjaRenderer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for JinjaRenderer<'_> {
    fn render(&self, body: &str, presence: &BTreeMap<String, bool>) -> Result<String, VargateError> {
        JinjaRenderer::render(self, body, presence).map_err(VargateError::Infrastructure)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn presence(pairs: &[(&str, bool)]) -> BTreeMap<String, bool> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_optional_block_follows_presence() -> Result<()> {
        let renderer = JinjaRenderer::new();
        let body = "SELECT * FROM mart_pnl_report {% if period %}WHERE period = :period{% endif %}";

        let with = renderer.render(body, &presence(&[("period", true)]))?;
        assert_eq!(with, "SELECT * FROM mart_pnl_report WHERE period = :period");

        let without = renderer.render(body, &presence(&[("period", false)]))?;
        assert_eq!(without.trim_end(), "SELECT * FROM mart_pnl_report");
        Ok(())
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        let renderer = JinjaRenderer::new();
        let res = renderer.render(
            "SELECT 1 {% if perod %}WHERE 1{% endif %}",
            &presence(&[("period", true)]),
        );
        assert!(matches!(res, Err(InfrastructureError::TemplateError(_))));
    }

    #[test]
    fn test_broken_syntax_is_an_error() {
        let renderer = JinjaRenderer::new();
        assert!(renderer.render("SELECT 1 {% if %}", &BTreeMap::new()).is_err());
    }
}
