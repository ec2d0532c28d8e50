//! Quality report, grade and sharing eligibility.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::weights::Metric;
use crate::stats::TukeyFences;

/// Letter grade derived from the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityGrade {
    /// Above 90.
    A,
    /// Above 75.
    B,
    /// Above 60.
    C,
    /// 60 or below.
    D,
}

impl QualityGrade {
    /// Grade an overall score on the 0-100 scale. Boundaries are exclusive:
    /// exactly 90 is a B.
    pub fn from_score(score: f64) -> Self {
        if score > 90.0 {
            QualityGrade::A
        } else if score > 75.0 {
            QualityGrade::B
        } else if score > 60.0 {
            QualityGrade::C
        } else {
            QualityGrade::D
        }
    }

    /// What this grade allows for cross-institutional sharing.
    pub fn sharing(&self) -> SharingEligibility {
        match self {
            QualityGrade::A | QualityGrade::B => SharingEligibility::Eligible,
            QualityGrade::C => SharingEligibility::ManualReview,
            QualityGrade::D => SharingEligibility::Blocked,
        }
    }
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            QualityGrade::A => "A",
            QualityGrade::B => "B",
            QualityGrade::C => "C",
            QualityGrade::D => "D",
        };
        f.write_str(letter)
    }
}

/// Sharing decision implied by a grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharingEligibility {
    /// May be shared across institutions.
    Eligible,
    /// Requires a manual review before sharing.
    ManualReview,
    /// Must not be shared.
    Blocked,
}

impl SharingEligibility {
    pub fn label(&self) -> &'static str {
        match self {
            SharingEligibility::Eligible => "eligible for sharing",
            SharingEligibility::ManualReview => "manual review required",
            SharingEligibility::Blocked => "sharing blocked",
        }
    }
}

/// Outcome of one custom rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    /// Position of the rule in the supplied rule set.
    pub index: usize,
    pub column: String,
    /// Description such as `Range [-50, 50]`.
    pub rule: String,
    pub violations: usize,
    /// `100 * (1 - violations / rows)`.
    pub score: f64,
    /// First few violating row indices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_rows: Vec<usize>,
}

/// IQR outlier findings for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierSummary {
    pub outliers_count: usize,
    /// Outliers as a percentage of all rows.
    pub outlier_percentage: f64,
    /// `100 * (1 - outliers / rows)`.
    pub score: f64,
    /// Fences used; absent when the column has no numeric values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fences: Option<TukeyFences>,
    /// First few outlying values, in row order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<f64>,
}

/// Annotations flagging how a report should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportNote {
    /// The dataset has no rows; all metrics default to 100.
    EmptyDataset,
    /// No metric could be computed; the overall score defaults to 100.
    NoMetrics,
    /// Every present metric had zero weight; equal weights were used.
    ZeroWeightFallback,
}

/// Structured quality assessment of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub dataset_id: String,
    pub row_count: usize,
    pub column_count: usize,
    /// Column to percentage of non-missing values.
    pub completeness: IndexMap<String, f64>,
    /// One outcome per supplied rule, in rule order.
    pub consistency: Vec<RuleOutcome>,
    /// Numeric column to outlier findings.
    pub validity: IndexMap<String, OutlierSummary>,
    /// Externally supplied accuracy per column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<IndexMap<String, f64>>,
    /// Aggregate score per metric, for the metrics present.
    pub metric_scores: IndexMap<Metric, f64>,
    /// Normalized weights applied to `metric_scores`.
    pub weights_applied: IndexMap<Metric, f64>,
    pub overall_score: f64,
    pub quality_grade: QualityGrade,
    pub sharing: SharingEligibility,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<ReportNote>,
    pub timestamp: DateTime<Utc>,
}

impl QualityReport {
    /// Aggregate completeness across columns, when computed.
    pub fn completeness_score(&self) -> Option<f64> {
        self.metric_scores.get(&Metric::Completeness).copied()
    }

    /// Aggregate score of a metric, when computed.
    pub fn metric_score(&self, metric: Metric) -> Option<f64> {
        self.metric_scores.get(&metric).copied()
    }

    pub fn has_note(&self, note: ReportNote) -> bool {
        self.notes.contains(&note)
    }

    /// Whether the dataset may be shared without review.
    pub fn is_shareable(&self) -> bool {
        self.sharing == SharingEligibility::Eligible
    }
}
