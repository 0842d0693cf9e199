// vargate-core/src/domain/variance.rs

use serde::Serialize;
use std::collections::HashMap;

use crate::domain::query::{QueryResult, SqlValue};

pub const DEFAULT_PCT_THRESHOLD: f64 = 5.0;
pub const DEFAULT_ABS_THRESHOLD: f64 = 1000.0;
pub const DEFAULT_PARETO_THRESHOLD: f64 = 80.0;

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// `(actual - budget, pct of |budget|)`, both rounded to cents.
/// A zero budget yields 0% when actual is also zero, infinity otherwise.
pub fn compute_variance(actual: f64, budget: f64) -> (f64, f64) {
    let variance = actual - budget;
    let pct = if budget == 0.0 {
        if actual == 0.0 { 0.0 } else { f64::INFINITY }
    } else {
        variance / budget.abs() * 100.0
    };
    (round2(variance), if pct.is_finite() { round2(pct) } else { pct })
}

/// Returns `(absolute threshold, pct threshold)`; the absolute one is the larger
/// of `abs_threshold` and `pct_threshold`% of the budget.
pub fn materiality_threshold(total_budget: f64, pct_threshold: f64, abs_threshold: f64) -> (f64, f64) {
    let pct_amount = total_budget.abs() * (pct_threshold / 100.0);
    (abs_threshold.max(pct_amount), pct_threshold)
}

/// Material only when both thresholds are reached.
pub fn is_material(variance_amount: f64, variance_pct: f64, abs_threshold: f64, pct_threshold: f64) -> bool {
    variance_amount.abs() >= abs_threshold && variance_pct.abs() >= pct_threshold
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceDriver {
    pub dimension: String,
    pub value: String,
    pub variance_amount: f64,
    pub variance_pct: f64,
    /// Share of total absolute variance explained by this value.
    pub contribution_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decomposition {
    pub dimension: String,
    pub total_variance: f64,
    pub drivers: Vec<VarianceDriver>,
    pub pareto_drivers: Vec<VarianceDriver>,
    pub pareto_coverage_pct: f64,
}

fn cell_as_f64(value: Option<&SqlValue>) -> f64 {
    value.and_then(SqlValue::as_f64).unwrap_or(0.0)
}

/// Aggregates query rows by `dimension` and finds the values that explain
/// `pareto_threshold`% of the absolute variance, largest first.
pub fn decompose_variance(
    result: &QueryResult,
    dimension: &str,
    variance_col: &str,
    baseline_col: &str,
    pareto_threshold: f64,
) -> Decomposition {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, (f64, f64)> = HashMap::new();

    for row in &result.rows {
        let key = match row.get(dimension) {
            Some(SqlValue::Null) | None => "Unknown".to_string(),
            Some(v) => v.to_string(),
        };
        let entry = totals.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            (0.0, 0.0)
        });
        entry.0 += cell_as_f64(row.get(variance_col));
        entry.1 += cell_as_f64(row.get(baseline_col));
    }

    let total_variance: f64 = totals.values().map(|(v, _)| v.abs()).sum();

    let mut drivers: Vec<VarianceDriver> = order
        .into_iter()
        .map(|value| {
            let (variance, baseline) = totals.get(&value).copied().unwrap_or_default();
            let (variance_pct, contribution_pct) = if total_variance == 0.0 {
                (0.0, 0.0)
            } else {
                let pct = if baseline != 0.0 {
                    variance / baseline.abs() * 100.0
                } else {
                    0.0
                };
                (round2(pct), round2(variance.abs() / total_variance * 100.0))
            };
            VarianceDriver {
                dimension: dimension.to_string(),
                value,
                variance_amount: if total_variance == 0.0 { 0.0 } else { round2(variance) },
                variance_pct,
                contribution_pct,
            }
        })
        .collect();

    if total_variance == 0.0 {
        return Decomposition {
            dimension: dimension.to_string(),
            total_variance: 0.0,
            drivers,
            pareto_drivers: Vec::new(),
            pareto_coverage_pct: 0.0,
        };
    }

    drivers.sort_by(|a, b| b.variance_amount.abs().total_cmp(&a.variance_amount.abs()));

    let mut pareto_drivers = Vec::new();
    let mut cumulative = 0.0;
    for driver in &drivers {
        pareto_drivers.push(driver.clone());
        cumulative += driver.contribution_pct;
        if cumulative >= pareto_threshold {
            break;
        }
    }

    Decomposition {
        dimension: dimension.to_string(),
        total_variance: round2(total_variance),
        drivers,
        pareto_drivers,
        pareto_coverage_pct: round2(cumulative),
    }
}
