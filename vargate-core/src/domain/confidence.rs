// vargate-core/src/domain/confidence.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::DomainError;

pub const WEIGHT_EVIDENCE_BREADTH: f64 = 0.25;
pub const WEIGHT_LINEAGE_DEPTH: f64 = 0.20;
pub const WEIGHT_VARIANCE_EXPLANATION: f64 = 0.25;
pub const WEIGHT_HYPOTHESIS_EXCLUSION: f64 = 0.15;
pub const WEIGHT_DATA_QUALITY: f64 = 0.10;
pub const WEIGHT_TEMPORAL_CONSISTENCY: f64 = 0.05;

pub const HIGH_THRESHOLD: f64 = 0.70;
pub const MEDIUM_THRESHOLD: f64 = 0.40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_THRESHOLD {
            ConfidenceLevel::High
        } else if score >= MEDIUM_THRESHOLD {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfidenceLevel::High => "HIGH",
            ConfidenceLevel::Medium => "MEDIUM",
            ConfidenceLevel::Low => "LOW",
        };
        write!(f, "{label}")
    }
}

/// Six evidence signals, each in [0, 1]. Construction rejects anything else.
///
/// * `evidence_breadth`: independent data points (1.0 = three or more queries).
/// * `lineage_depth`: how far upstream the trace went (1.0 = raw layer reached).
/// * `variance_explanation`: share of the variance explained.
/// * `hypothesis_exclusion`: alternatives ruled out (1.0 = two or more).
/// * `data_quality`: 1.0 = no concerns with the underlying data.
/// * `temporal_consistency`: 1.0 = pattern holds across periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConfidenceInput")]
pub struct ConfidenceInput {
    evidence_breadth: f64,
    lineage_depth: f64,
    variance_explanation: f64,
    hypothesis_exclusion: f64,
    data_quality: f64,
    temporal_consistency: f64,
}

#[derive(Deserialize)]
struct RawConfidenceInput {
    evidence_breadth: f64,
    lineage_depth: f64,
    variance_explanation: f64,
    hypothesis_exclusion: f64,
    data_quality: f64,
    temporal_consistency: f64,
}

impl TryFrom<RawConfidenceInput> for ConfidenceInput {
    type Error = DomainError;

    fn try_from(raw: RawConfidenceInput) -> Result<Self, Self::Error> {
        ConfidenceInput::new(
            raw.evidence_breadth,
            raw.lineage_depth,
            raw.variance_explanation,
            raw.hypothesis_exclusion,
            raw.data_quality,
            raw.temporal_consistency,
        )
    }
}

fn check_factor(factor: &'static str, value: f64) -> Result<f64, DomainError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(DomainError::InvalidConfidenceFactor { factor, value })
    }
}

impl ConfidenceInput {
    pub fn new(
        evidence_breadth: f64,
        lineage_depth: f64,
        variance_explanation: f64,
        hypothesis_exclusion: f64,
        data_quality: f64,
        temporal_consistency: f64,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            evidence_breadth: check_factor("evidence_breadth", evidence_breadth)?,
            lineage_depth: check_factor("lineage_depth", lineage_depth)?,
            variance_explanation: check_factor("variance_explanation", variance_explanation)?,
            hypothesis_exclusion: check_factor("hypothesis_exclusion", hypothesis_exclusion)?,
            data_quality: check_factor("data_quality", data_quality)?,
            temporal_consistency: check_factor("temporal_consistency", temporal_consistency)?,
        })
    }

    pub fn evidence_breadth(&self) -> f64 {
        self.evidence_breadth
    }

    pub fn lineage_depth(&self) -> f64 {
        self.lineage_depth
    }

    pub fn variance_explanation(&self) -> f64 {
        self.variance_explanation
    }

    pub fn hypothesis_exclusion(&self) -> f64 {
        self.hypothesis_exclusion
    }

    pub fn data_quality(&self) -> f64 {
        self.data_quality
    }

    pub fn temporal_consistency(&self) -> f64 {
        self.temporal_consistency
    }

    /// `(factor name, value, weight)` in scoring order.
    pub fn breakdown(&self) -> [(&'static str, f64, f64); 6] {
        [
            ("evidence_breadth", self.evidence_breadth, WEIGHT_EVIDENCE_BREADTH),
            ("lineage_depth", self.lineage_depth, WEIGHT_LINEAGE_DEPTH),
            (
                "variance_explanation",
                self.variance_explanation,
                WEIGHT_VARIANCE_EXPLANATION,
            ),
            (
                "hypothesis_exclusion",
                self.hypothesis_exclusion,
                WEIGHT_HYPOTHESIS_EXCLUSION,
            ),
            ("data_quality", self.data_quality, WEIGHT_DATA_QUALITY),
            (
                "temporal_consistency",
                self.temporal_consistency,
                WEIGHT_TEMPORAL_CONSISTENCY,
            ),
        ]
    }
}

/// Neutral prior: every factor at 0.5.
impl Default for ConfidenceInput {
    fn default() -> Self {
        Self {
            evidence_breadth: 0.5,
            lineage_depth: 0.5,
            variance_explanation: 0.5,
            hypothesis_exclusion: 0.5,
            data_quality: 0.5,
            temporal_consistency: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceResult {
    pub score: f64,
    pub level: ConfidenceLevel,
    pub factors: ConfidenceInput,
}

/// Weighted sum rounded to three decimals, so sums that land on a threshold
/// in exact arithmetic classify the same way in floating point.
pub fn score(input: &ConfidenceInput) -> ConfidenceResult {
    let weighted: f64 = input.breakdown().iter().map(|(_, v, w)| v * w).sum();
    let score = (weighted * 1000.0).round() / 1000.0;
    ConfidenceResult {
        score,
        level: ConfidenceLevel::from_score(score),
        factors: *input,
    }
}
