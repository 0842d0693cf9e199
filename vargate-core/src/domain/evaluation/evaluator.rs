// vargate-core/src/domain/evaluation/evaluator.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::confidence::ConfidenceLevel;
use crate::domain::evaluation::finding::Finding;
use crate::domain::evaluation::rule::AnomalyCatalog;

/// Evidence statements a HIGH finding needs to count as sufficiently supported.
pub const SUFFICIENT_EVIDENCE: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub matched_rules: Vec<String>,
    pub unmatched_rules: Vec<String>,
    /// Rule id -> ids of the findings it claimed.
    pub matches: BTreeMap<String, Vec<String>>,
    pub matched_findings: Vec<String>,
    pub unmatched_findings: Vec<String>,
    pub recall: f64,
    pub precision_proxy: f64,
    pub evidence_sufficiency: f64,
    pub root_cause_depth: f64,
    pub findings_count: usize,
}

/// Scores a run's findings against the catalog. Each finding claims at most one
/// rule (the first satisfied in declaration order); several findings may claim the
/// same rule, which still counts once.
#[tracing::instrument(skip_all, fields(findings = findings.len(), rules = catalog.rules.len()))]
pub fn evaluate(findings: &[Finding], catalog: &AnomalyCatalog) -> EvaluationResult {
    let mut matches: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut matched_findings = Vec::new();
    let mut unmatched_findings = Vec::new();

    for finding in findings {
        match catalog.first_match(finding) {
            Some(rule) => {
                matches
                    .entry(rule.id.clone())
                    .or_default()
                    .push(finding.id.clone());
                matched_findings.push(finding.id.clone());
            }
            None => unmatched_findings.push(finding.id.clone()),
        }
    }

    let (matched_rules, unmatched_rules): (Vec<String>, Vec<String>) = catalog
        .rule_ids()
        .map(str::to_string)
        .partition(|id| matches.contains_key(id));

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };

    let high: Vec<&Finding> = findings
        .iter()
        .filter(|f| f.confidence == ConfidenceLevel::High)
        .collect();
    let evidence_sufficiency = if high.is_empty() {
        1.0
    } else {
        ratio(
            high.iter()
                .filter(|f| f.evidence.len() >= SUFFICIENT_EVIDENCE)
                .count(),
            high.len(),
        )
    };

    let traced = findings
        .iter()
        .filter(|f| {
            f.affected_tables
                .iter()
                .any(|t| !catalog.surface_tables.contains(t))
        })
        .count();

    let result = EvaluationResult {
        recall: ratio(matched_rules.len(), catalog.rules.len()),
        precision_proxy: ratio(matched_rules.len(), findings.len()),
        evidence_sufficiency,
        root_cause_depth: ratio(traced, findings.len()),
        findings_count: findings.len(),
        matched_rules,
        unmatched_rules,
        matches,
        matched_findings,
        unmatched_findings,
    };

    tracing::info!(
        recall = result.recall,
        precision_proxy = result.precision_proxy,
        "Evaluation complete"
    );
    result
}
