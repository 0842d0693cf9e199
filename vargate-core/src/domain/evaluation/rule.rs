// vargate-core/src/domain/evaluation/rule.rs

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::error::DomainError;
use crate::domain::evaluation::finding::{
    Finding, FindingCategory, VarianceDirection, normalize_text,
};

/// A known injected condition and the predicates a finding must meet to claim it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRule {
    pub id: String,
    pub category: FindingCategory,
    #[serde(default)]
    pub description: String,
    /// Every token must appear in the finding.
    #[serde(default)]
    pub all_tokens: Vec<String>,
    /// At least one token must appear, when non-empty.
    #[serde(default)]
    pub any_tokens: Vec<String>,
    /// At least one period must appear, when non-empty.
    #[serde(default)]
    pub periods: Vec<String>,
    #[serde(default)]
    pub direction: Option<VarianceDirection>,
    #[serde(default)]
    pub min_evidence: usize,
}

impl AnomalyRule {
    /// `blob` is the finding's [`Finding::text_blob`], computed once by the caller.
    pub fn matches(&self, finding: &Finding, blob: &str) -> bool {
        if finding.category != self.category {
            return false;
        }
        if finding.evidence.len() < self.min_evidence {
            return false;
        }
        if let Some(direction) = self.direction
            && finding.direction != direction
        {
            return false;
        }

        let contains = |token: &String| blob.contains(&normalize_text(token));

        self.all_tokens.iter().all(contains)
            && (self.any_tokens.is_empty() || self.any_tokens.iter().any(contains))
            && (self.periods.is_empty() || self.periods.iter().any(contains))
    }
}

fn default_surface_tables() -> Vec<String> {
    vec!["mart_pnl_report".to_string()]
}

/// Versioned, ordered rule list. Declaration order is the tie-break order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyCatalog {
    pub version: u32,
    /// Reporting tables; a finding naming only these has not traced upstream.
    #[serde(default = "default_surface_tables")]
    pub surface_tables: Vec<String>,
    #[serde(default)]
    pub rules: Vec<AnomalyRule>,
}

impl AnomalyCatalog {
    pub fn new(version: u32, rules: Vec<AnomalyRule>) -> Result<Self, DomainError> {
        let catalog = Self {
            version,
            surface_tables: default_surface_tables(),
            rules,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                return Err(DomainError::CatalogInvalid(
                    "anomaly rule with an empty id".into(),
                ));
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(DomainError::CatalogInvalid(format!(
                    "anomaly rule '{}' is declared more than once",
                    rule.id
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&AnomalyRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.id.as_str())
    }

    /// First rule in declaration order that the finding satisfies.
    pub fn first_match(&self, finding: &Finding) -> Option<&AnomalyRule> {
        let blob = finding.text_blob();
        self.rules.iter().find(|r| r.matches(finding, &blob))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::confidence::ConfidenceLevel;
    use std::collections::BTreeMap;

    fn cogs_rule() -> AnomalyRule {
        AnomalyRule {
            id: "A-001".into(),
            category: FindingCategory::CogsAnomaly,
            description: "COGS spike".into(),
            all_tokens: vec!["cc-300".into()],
            any_tokens: vec![],
            periods: vec!["2024-03".into(), "2024-04".into()],
            direction: Some(VarianceDirection::Unfavorable),
            min_evidence: 1,
        }
    }

    fn finding(text: &str, direction: VarianceDirection, evidence: usize) -> Finding {
        Finding {
            id: "F-001".into(),
            title: text.into(),
            category: FindingCategory::CogsAnomaly,
            direction,
            variance_amount: 1000.0,
            variance_pct: 12.0,
            root_cause: String::new(),
            evidence: (0..evidence).map(|i| format!("query {i}")).collect(),
            affected_tables: vec![],
            affected_dimensions: BTreeMap::new(),
            confidence: ConfidenceLevel::High,
            recommendations: vec![],
            sql_queries_used: vec![],
        }
    }

    #[test]
    fn test_matches_normalized_tokens() {
        let rule = cogs_rule();
        let f = finding("Cost spike in CC_300 during 2024-03", VarianceDirection::Unfavorable, 2);
        assert!(rule.matches(&f, &f.text_blob()));
    }

    #[test]
    fn test_requires_period_direction_and_evidence() {
        let rule = cogs_rule();

        let wrong_period = finding("CC-300 spike 2024-09", VarianceDirection::Unfavorable, 2);
        assert!(!rule.matches(&wrong_period, &wrong_period.text_blob()));

        let wrong_dir = finding("CC-300 spike 2024-03", VarianceDirection::Favorable, 2);
        assert!(!rule.matches(&wrong_dir, &wrong_dir.text_blob()));

        let no_evidence = finding("CC-300 spike 2024-03", VarianceDirection::Unfavorable, 0);
        assert!(!rule.matches(&no_evidence, &no_evidence.text_blob()));
    }

    #[test]
    fn test_catalog_rejects_duplicate_ids() {
        let res = AnomalyCatalog::new(1, vec![cogs_rule(), cogs_rule()]);
        assert!(matches!(res, Err(DomainError::CatalogInvalid(_))));
    }
}
