// vargate-core/src/domain/template.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::domain::error::RenderError;
use crate::domain::query::SqlValue;

static PERIOD_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$"));

static IDENTIFIER_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$"));

/// Shape a template parameter value must have before it is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// `YYYY-MM`
    Period,
    /// Codes such as `CC-300`, `4000`, `EUR`.
    Identifier,
    #[default]
    Text,
}

impl ParamKind {
    pub fn expected(&self) -> &'static str {
        match self {
            ParamKind::Period => "a period formatted as YYYY-MM",
            ParamKind::Identifier => "an identifier made of letters, digits, '_' or '-'",
            ParamKind::Text => "a text value",
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        let pattern = match self {
            ParamKind::Period => &*PERIOD_RE,
            ParamKind::Identifier => &*IDENTIFIER_RE,
            ParamKind::Text => return true,
        };
        pattern.as_ref().is_ok_and(|re| re.is_match(value))
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Period => write!(f, "period"),
            ParamKind::Identifier => write!(f, "identifier"),
            ParamKind::Text => write!(f, "text"),
        }
    }
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateParam {
    pub name: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub kind: ParamKind,
    #[serde(default)]
    pub description: String,
}

impl TemplateParam {
    /// Checks a caller value against the declared kind and turns it into a
    /// bindable value.
    pub fn check(&self, value: &str) -> Result<SqlValue, RenderError> {
        if self.kind.accepts(value) {
            Ok(SqlValue::Text(value.to_string()))
        } else {
            Err(RenderError::InvalidValue {
                parameter: self.name.clone(),
                value: value.to_string(),
                expected: self.kind.expected(),
            })
        }
    }
}

/// Named investigative query. `sql` is a minijinja body: parameter names are
/// only visible as booleans, values only as `:name` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub params: Vec<TemplateParam>,
    pub sql: String,
}

impl TemplateDefinition {
    pub fn param(&self, name: &str) -> Option<&TemplateParam> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn optional_params(&self) -> impl Iterator<Item = &TemplateParam> {
        self.params.iter().filter(|p| !p.required)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateCatalog {
    pub templates: Vec<TemplateDefinition>,
}
