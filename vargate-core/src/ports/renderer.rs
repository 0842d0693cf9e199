// vargate-core/src/ports/renderer.rs

use std::collections::BTreeMap;

use crate::error::VargateError;

/// Expands the structure of a template body. The context only says which
/// parameters are present; values are bound later, never rendered.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, body: &str, presence: &BTreeMap<String, bool>) -> Result<String, VargateError>;
}
