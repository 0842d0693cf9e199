// vargate-core/src/domain/evaluation/consistency.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::evaluation::evaluator::EvaluationResult;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConsistencyResult {
    pub runs: usize,
    pub recall_mean: f64,
    pub recall_stddev: f64,
    pub precision_mean: f64,
    pub precision_stddev: f64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Unbiased sample standard deviation (n - 1). Zero below two samples.
fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

pub fn compute_consistency(results: &[EvaluationResult]) -> ConsistencyResult {
    let recalls: Vec<f64> = results.iter().map(|r| r.recall).collect();
    let precisions: Vec<f64> = results.iter().map(|r| r.precision_proxy).collect();

    ConsistencyResult {
        runs: results.len(),
        recall_mean: mean(&recalls),
        recall_stddev: sample_stddev(&recalls),
        precision_mean: mean(&precisions),
        precision_stddev: sample_stddev(&precisions),
    }
}

/// Batch view over several runs of the same investigation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    pub runs: usize,
    pub avg_recall: f64,
    pub avg_precision_proxy: f64,
    pub avg_evidence_sufficiency: f64,
    pub avg_root_cause_depth: f64,
    pub consistency: ConsistencyResult,
    /// Rules missed in at least one run, sorted.
    pub unmatched_rules_union: Vec<String>,
}

pub fn summarize(results: &[EvaluationResult]) -> BenchmarkSummary {
    let avg = |f: fn(&EvaluationResult) -> f64| {
        mean(&results.iter().map(f).collect::<Vec<_>>())
    };

    let unmatched: BTreeSet<&String> = results
        .iter()
        .flat_map(|r| r.unmatched_rules.iter())
        .collect();

    BenchmarkSummary {
        runs: results.len(),
        avg_recall: avg(|r| r.recall),
        avg_precision_proxy: avg(|r| r.precision_proxy),
        avg_evidence_sufficiency: avg(|r| r.evidence_sufficiency),
        avg_root_cause_depth: avg(|r| r.root_cause_depth),
        consistency: compute_consistency(results),
        unmatched_rules_union: unmatched.into_iter().cloned().collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn run(recall: f64, precision: f64, unmatched: &[&str]) -> EvaluationResult {
        EvaluationResult {
            matched_rules: vec![],
            unmatched_rules: unmatched.iter().map(|s| s.to_string()).collect(),
            matches: BTreeMap::new(),
            matched_findings: vec![],
            unmatched_findings: vec![],
            recall,
            precision_proxy: precision,
            evidence_sufficiency: 1.0,
            root_cause_depth: 0.5,
            findings_count: 4,
        }
    }

    #[test]
    fn test_identical_runs_have_zero_deviation() {
        let runs = vec![run(0.8, 0.5, &[]); 3];
        let c = compute_consistency(&runs);
        assert_eq!(c.runs, 3);
        assert!((c.recall_mean - 0.8).abs() < 1e-12);
        assert!(c.recall_stddev.abs() < 1e-12);
        assert!(c.precision_stddev.abs() < 1e-12);
    }

    #[test]
    fn test_sample_stddev_uses_n_minus_one() {
        let c = compute_consistency(&[run(0.6, 0.2, &[]), run(1.0, 0.6, &[])]);
        assert!((c.recall_mean - 0.8).abs() < 1e-12);
        // sqrt(((0.2)^2 + (0.2)^2) / 1)
        assert!((c.recall_stddev - 0.08f64.sqrt()).abs() < 1e-12);
        assert!((c.precision_stddev - 0.08f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_fewer_than_two_runs() {
        let single = compute_consistency(&[run(0.4, 0.3, &[])]);
        assert_eq!(single.recall_stddev, 0.0);
        assert_eq!(single.recall_mean, 0.4);

        let none = compute_consistency(&[]);
        assert_eq!(none, ConsistencyResult::default());
    }

    #[test]
    fn test_summary_unions_unmatched_rules() {
        let summary = summarize(&[run(0.6, 0.5, &["A-003", "A-005"]), run(0.8, 0.5, &["A-005", "A-002"])]);
        assert_eq!(summary.runs, 2);
        assert!((summary.avg_recall - 0.7).abs() < 1e-12);
        assert_eq!(summary.avg_root_cause_depth, 0.5);
        assert_eq!(summary.unmatched_rules_union, vec!["A-002", "A-003", "A-005"]);
    }
}
