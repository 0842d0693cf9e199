// vargate-core/src/application/variance.rs
//
// Variance report over a query result: headline variance, materiality
// thresholds, and the Pareto drivers along one dimension.

use serde::Serialize;

use crate::domain::query::QueryResult;
use crate::domain::variance::{
    DEFAULT_ABS_THRESHOLD, DEFAULT_PARETO_THRESHOLD, DEFAULT_PCT_THRESHOLD, Decomposition,
    compute_variance, decompose_variance, is_material, materiality_threshold,
};

#[derive(Debug, Clone, PartialEq)]
pub struct VarianceOptions {
    pub dimension: String,
    pub actual_col: String,
    pub baseline_col: String,
    pub variance_col: String,
    pub pareto_threshold: f64,
    pub pct_threshold: f64,
    pub abs_threshold: f64,
}

impl VarianceOptions {
    /// P&L mart column names and the default thresholds.
    pub fn new(dimension: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            actual_col: "actual_usd".into(),
            baseline_col: "budget_usd".into(),
            variance_col: "variance_usd".into(),
            pareto_threshold: DEFAULT_PARETO_THRESHOLD,
            pct_threshold: DEFAULT_PCT_THRESHOLD,
            abs_threshold: DEFAULT_ABS_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceReport {
    pub total_actual: f64,
    pub total_baseline: f64,
    pub variance_amount: f64,
    pub variance_pct: f64,
    /// Effective absolute threshold: the larger of the configured floor and
    /// `pct_threshold`% of the total baseline.
    pub abs_threshold: f64,
    pub pct_threshold: f64,
    pub material: bool,
    pub decomposition: Decomposition,
    /// Dimension values whose own variance crosses both thresholds.
    pub material_drivers: Vec<String>,
}

impl VarianceReport {
    pub fn build(result: &QueryResult, options: &VarianceOptions) -> Self {
        let sum = |column: &str| -> f64 {
            result
                .rows
                .iter()
                .filter_map(|row| row.get(column).and_then(|v| v.as_f64()))
                .sum()
        };
        let total_actual = sum(&options.actual_col);
        let total_baseline = sum(&options.baseline_col);

        let (variance_amount, variance_pct) = compute_variance(total_actual, total_baseline);
        let (abs_threshold, pct_threshold) =
            materiality_threshold(total_baseline, options.pct_threshold, options.abs_threshold);

        let decomposition = decompose_variance(
            result,
            &options.dimension,
            &options.variance_col,
            &options.baseline_col,
            options.pareto_threshold,
        );
        let material_drivers = decomposition
            .drivers
            .iter()
            .filter(|d| is_material(d.variance_amount, d.variance_pct, abs_threshold, pct_threshold))
            .map(|d| d.value.clone())
            .collect();

        Self {
            total_actual,
            total_baseline,
            variance_amount,
            variance_pct,
            abs_threshold,
            pct_threshold,
            material: is_material(variance_amount, variance_pct, abs_threshold, pct_threshold),
            decomposition,
            material_drivers,
        }
    }
}
