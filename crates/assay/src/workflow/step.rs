//! Workflow step kinds and their typed parameters.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AssayError, Result};

/// The closed set of step kinds a workflow may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    DataValidation,
    CrossReference,
    StatisticalAnalysis,
}

impl StepType {
    pub const ALL: [StepType; 3] = [
        StepType::DataValidation,
        StepType::CrossReference,
        StepType::StatisticalAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::DataValidation => "data_validation",
            StepType::CrossReference => "cross_reference",
            StepType::StatisticalAnalysis => "statistical_analysis",
        }
    }

    /// Look up a step kind by its wire name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a `data_validation` step.
///
/// Rules and thresholds stay in their JSON form: a bad rule or weight makes
/// the step fail when it runs rather than rejecting the whole workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataValidationParams {
    #[serde(default)]
    pub rules: Vec<Value>,
    /// Metric weights, e.g. `{"completeness": 1}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Value>,
    /// Overrides the orchestrator's completeness warning threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completeness_threshold: Option<f64>,
}

/// Join semantics for `cross_reference`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeType {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
}

impl MergeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeType::Inner => "inner",
            MergeType::Left => "left",
            MergeType::Right => "right",
            MergeType::Outer => "outer",
        }
    }
}

fn default_merge_key() -> String {
    "id".to_string()
}

/// Parameters of a `cross_reference` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrossReferenceParams {
    pub source_id: String,
    pub target_id: String,
    #[serde(default = "default_merge_key")]
    pub merge_key: String,
    #[serde(default)]
    pub merge_type: MergeType,
    /// Name of the derived dataset; defaults to `Merged_<source>_<target>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Statistic computed by `statistical_analysis`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    #[default]
    Correlation,
    Summary,
}

fn default_correlation_threshold() -> f64 {
    0.7
}

/// Parameters of a `statistical_analysis` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatisticalAnalysisParams {
    pub dataset_id: String,
    #[serde(default)]
    pub analysis_type: AnalysisType,
    /// Columns to analyze; all numeric columns when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    /// Pairs with `|r|` above this are reported.
    #[serde(default = "default_correlation_threshold")]
    pub correlation_threshold: f64,
}

/// One validated workflow step.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowStep {
    DataValidation(DataValidationParams),
    CrossReference(CrossReferenceParams),
    StatisticalAnalysis(StatisticalAnalysisParams),
}

impl WorkflowStep {
    pub fn step_type(&self) -> StepType {
        match self {
            WorkflowStep::DataValidation(_) => StepType::DataValidation,
            WorkflowStep::CrossReference(_) => StepType::CrossReference,
            WorkflowStep::StatisticalAnalysis(_) => StepType::StatisticalAnalysis,
        }
    }

    /// The step's parameters in JSON form, as echoed in error entries.
    pub fn parameters(&self) -> Value {
        let value = match self {
            WorkflowStep::DataValidation(p) => serde_json::to_value(p),
            WorkflowStep::CrossReference(p) => serde_json::to_value(p),
            WorkflowStep::StatisticalAnalysis(p) => serde_json::to_value(p),
        };
        value.unwrap_or(Value::Null)
    }

    /// Parse the typed parameters of a step whose kind is already known.
    pub(crate) fn from_parts(index: usize, step_type: StepType, parameters: Value) -> Result<Self> {
        let invalid = |e: serde_json::Error| AssayError::InvalidStep {
            index,
            message: format!("{} parameters: {}", step_type, e),
        };

        let step = match step_type {
            StepType::DataValidation => {
                WorkflowStep::DataValidation(serde_json::from_value(parameters).map_err(invalid)?)
            }
            StepType::CrossReference => {
                WorkflowStep::CrossReference(serde_json::from_value(parameters).map_err(invalid)?)
            }
            StepType::StatisticalAnalysis => WorkflowStep::StatisticalAnalysis(
                serde_json::from_value(parameters).map_err(invalid)?,
            ),
        };
        step.check(index)?;
        Ok(step)
    }

    /// Range checks serde cannot express.
    fn check(&self, index: usize) -> Result<()> {
        let invalid = |message: String| Err(AssayError::InvalidStep { index, message });

        match self {
            WorkflowStep::DataValidation(p) => {
                if let Some(t) = p.completeness_threshold {
                    if !(0.0..=100.0).contains(&t) {
                        return invalid(format!(
                            "completeness_threshold must lie in [0, 100], got {}",
                            t
                        ));
                    }
                }
            }
            WorkflowStep::CrossReference(p) => {
                if p.merge_key.trim().is_empty() {
                    return invalid("merge_key is empty".to_string());
                }
            }
            WorkflowStep::StatisticalAnalysis(p) => {
                if !(0.0..=1.0).contains(&p.correlation_threshold) {
                    return invalid(format!(
                        "correlation_threshold must lie in [0, 1], got {}",
                        p.correlation_threshold
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Parameters as a JSON object, treating a missing or null value as empty.
pub(crate) fn parameters_object(index: usize, value: Option<&Value>) -> Result<Value> {
    match value {
        None | Some(Value::Null) => Ok(Value::Object(Map::new())),
        Some(Value::Object(map)) => Ok(Value::Object(map.clone())),
        Some(other) => Err(AssayError::InvalidStep {
            index,
            message: format!("parameters must be an object, got {}", other),
        }),
    }
}
