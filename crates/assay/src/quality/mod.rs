//! Dataset quality scoring.
//!
//! The scorer combines four metrics into a weighted overall score:
//!
//! - **Completeness**: share of non-missing cells per column.
//! - **Consistency**: share of rows satisfying each custom rule.
//! - **Validity**: share of values inside the Tukey fences of each numeric column.
//! - **Accuracy**: per-column percentages supplied by the caller.
//!
//! Weights are re-normalized over the metrics actually computed, so a dataset
//! scored without rules is not penalized for the missing consistency metric.

mod report;
mod rules;
mod scorer;
mod weights;

pub use report::{
    OutlierSummary, QualityGrade, QualityReport, ReportNote, RuleOutcome, SharingEligibility,
};
pub use rules::{
    CompiledRule, PatternRule, RangeRule, RuleEvaluation, ValidationRule, compile_rules,
    parse_rules,
};
pub use scorer::{QualityScorer, ScoreRequest, ScorerConfig};
pub use weights::{Metric, NormalizedWeights, ThresholdConfig};
