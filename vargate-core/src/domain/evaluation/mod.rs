// vargate-core/src/domain/evaluation/mod.rs

pub mod consistency;
pub mod evaluator;
pub mod finding;
pub mod rule;

pub use consistency::{BenchmarkSummary, ConsistencyResult, compute_consistency, summarize};
pub use evaluator::{EvaluationResult, evaluate};
pub use finding::{Finding, FindingCategory, VarianceDirection, normalize_text};
pub use rule::{AnomalyCatalog, AnomalyRule};
