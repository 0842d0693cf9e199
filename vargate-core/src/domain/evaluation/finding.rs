// vargate-core/src/domain/evaluation/finding.rs

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::confidence::ConfidenceLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingCategory {
    CogsAnomaly,
    RevenueAnomaly,
    FxAnomaly,
    BudgetMisalignment,
    ClassificationError,
    Other,
}

impl FindingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingCategory::CogsAnomaly => "COGS_ANOMALY",
            FindingCategory::RevenueAnomaly => "REVENUE_ANOMALY",
            FindingCategory::FxAnomaly => "FX_ANOMALY",
            FindingCategory::BudgetMisalignment => "BUDGET_MISALIGNMENT",
            FindingCategory::ClassificationError => "CLASSIFICATION_ERROR",
            FindingCategory::Other => "OTHER",
        }
    }
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VarianceDirection {
    Favorable,
    Unfavorable,
}

/// A root-cause claim produced by an investigation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub title: String,
    pub category: FindingCategory,
    pub direction: VarianceDirection,
    pub variance_amount: f64,
    pub variance_pct: f64,
    pub root_cause: String,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub affected_tables: Vec<String>,
    #[serde(default)]
    pub affected_dimensions: BTreeMap<String, String>,
    /// Accepts either `"HIGH"` or a full score object carrying a `level`.
    #[serde(deserialize_with = "level_or_score")]
    pub confidence: ConfidenceLevel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sql_queries_used: Vec<String>,
}

fn level_or_score<'de, D>(deserializer: D) -> Result<ConfidenceLevel, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Level(ConfidenceLevel),
        Scored { level: ConfidenceLevel },
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Level(level) | Repr::Scored { level } => level,
    })
}

/// Lowercases, turns `-` and `_` into spaces and collapses whitespace,
/// so `CC-300`, `cc_300` and `cc  300` compare equal.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl Finding {
    /// Normalized text over every descriptive attribute, used for rule matching.
    pub fn text_blob(&self) -> String {
        let mut parts: Vec<&str> = vec![
            self.id.as_str(),
            self.title.as_str(),
            self.root_cause.as_str(),
            self.category.as_str(),
        ];
        parts.extend(self.evidence.iter().map(String::as_str));
        parts.extend(self.affected_tables.iter().map(String::as_str));
        for (key, value) in &self.affected_dimensions {
            parts.push(key.as_str());
            parts.push(value.as_str());
        }
        normalize_text(&parts.join(" "))
    }
}
