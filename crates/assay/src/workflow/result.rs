//! Outcomes of a workflow run.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::step::{AnalysisType, MergeType, StepType};
use crate::quality::{QualityGrade, QualityReport, SharingEligibility};
use crate::stats::NumericSummary;
use crate::store::JobId;

/// Whether a step ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Failed,
}

/// Validation of one dataset inside a `data_validation` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetValidation {
    pub dataset_id: String,
    pub dataset_name: String,
    pub overall_score: f64,
    pub quality_grade: QualityGrade,
    pub sharing: SharingEligibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub report: QualityReport,
}

/// Output of a `cross_reference` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOutput {
    /// The derived dataset.
    pub dataset_id: String,
    pub dataset_name: String,
    pub source_id: String,
    pub target_id: String,
    pub merge_key: String,
    pub merge_type: MergeType,
    pub records_merged: usize,
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
}

impl MergeOutput {
    /// File name for exporting the derived dataset, e.g.
    /// `ds_0001_Merged_visits_labs.csv`.
    ///
    /// The dataset id keeps names unique across steps. Characters other than
    /// ASCII alphanumerics, `-` and `_` become `_`, so the result never
    /// contains a path separator or `..`.
    pub fn file_name(&self) -> String {
        let safe = |s: &str| -> String {
            s.chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect()
        };
        format!("{}_{}.csv", safe(&self.dataset_id), safe(&self.dataset_name))
    }
}

/// A pair of columns whose correlation exceeds the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub var1: String,
    pub var2: String,
    pub correlation: f64,
}

/// Output of a `statistical_analysis` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub dataset_id: String,
    pub analysis: AnalysisType,
    /// Columns that took part in the analysis.
    pub columns: Vec<String>,
    /// Correlated pairs, for correlation analysis.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub high_correlations: Vec<CorrelationPair>,
    /// Per-column summaries, for summary analysis.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub summaries: IndexMap<String, NumericSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
}

/// Type-specific payload of a completed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOutput {
    Validation { datasets: Vec<DatasetValidation> },
    CrossReference(MergeOutput),
    StatisticalAnalysis(AnalysisOutput),
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub index: usize,
    pub step_type: StepType,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<StepOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    pub fn completed(index: usize, step_type: StepType, output: StepOutput) -> Self {
        Self {
            index,
            step_type,
            status: StepStatus::Completed,
            output: Some(output),
            error: None,
        }
    }

    pub fn failed(index: usize, step_type: StepType, error: impl Into<String>) -> Self {
        Self {
            index,
            step_type,
            status: StepStatus::Failed,
            output: None,
            error: Some(error.into()),
        }
    }
}

/// A step that could not run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowError {
    pub step_index: usize,
    pub step: StepType,
    pub error: String,
    /// The step's parameters, echoed for diagnosis.
    pub parameters: Value,
}

/// A data-quality concern raised by a step that ran successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum WarningReason {
    /// The dataset's grade is one the orchestrator warns about.
    LowGrade { grade: QualityGrade },
    /// Aggregate completeness fell below the threshold.
    LowCompleteness { completeness: f64, threshold: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowWarning {
    pub step_index: usize,
    pub dataset_id: String,
    pub dataset: String,
    pub score: f64,
    #[serde(flatten)]
    pub reason: WarningReason,
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Success,
    Failed,
    CompletedWithWarnings,
}

impl OverallStatus {
    /// Failure outranks warnings; only a run with neither is a success.
    pub fn from_counts(errors: usize, warnings: usize) -> Self {
        if errors > 0 {
            OverallStatus::Failed
        } else if warnings > 0 {
            OverallStatus::CompletedWithWarnings
        } else {
            OverallStatus::Success
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Success => "success",
            OverallStatus::Failed => "failed",
            OverallStatus::CompletedWithWarnings => "completed_with_warnings",
        }
    }
}

/// Consolidated result of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub project_id: String,
    /// One entry per configured step, in order.
    pub steps: Vec<StepResult>,
    pub errors: Vec<WorkflowError>,
    pub warnings: Vec<WorkflowWarning>,
    pub overall_status: OverallStatus,
}

impl WorkflowResult {
    /// Assemble a result; the overall status is derived from the errors and
    /// warnings.
    pub fn new(
        project_id: impl Into<String>,
        steps: Vec<StepResult>,
        errors: Vec<WorkflowError>,
        warnings: Vec<WorkflowWarning>,
    ) -> Self {
        let overall_status = OverallStatus::from_counts(errors.len(), warnings.len());
        Self {
            project_id: project_id.into(),
            steps,
            errors,
            warnings,
            overall_status,
        }
    }

    /// Datasets created by `cross_reference` steps, in step order.
    pub fn derived_datasets(&self) -> impl Iterator<Item = &MergeOutput> {
        self.steps.iter().filter_map(|s| match &s.output {
            Some(StepOutput::CrossReference(merge)) => Some(merge),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn merge_output(dataset_id: &str, dataset_name: &str) -> MergeOutput {
        MergeOutput {
            dataset_id: dataset_id.to_string(),
            dataset_name: dataset_name.to_string(),
            source_id: "visits".to_string(),
            target_id: "labs".to_string(),
            merge_key: "id".to_string(),
            merge_type: MergeType::Inner,
            records_merged: 0,
            columns: Vec::new(),
            job_id: None,
        }
    }

    #[test]
    fn test_file_name_is_unique_per_dataset() {
        let inner = merge_output("ds_0001", "Merged_visits_labs");
        let outer = merge_output("ds_0002", "Merged_visits_labs");
        assert_eq!(inner.file_name(), "ds_0001_Merged_visits_labs.csv");
        assert_ne!(inner.file_name(), outer.file_name());
    }

    #[test]
    fn test_file_name_stays_in_directory() {
        let out = merge_output("ds_0003", "../../etc/x");
        let name = out.file_name();
        assert_eq!(name, "ds_0003_______etc_x.csv");
        assert!(!name.contains('/') && !name.contains(".."));
    }

    #[test]
    fn test_status_precedence() {
        assert_eq!(OverallStatus::from_counts(0, 0), OverallStatus::Success);
        assert_eq!(
            OverallStatus::from_counts(0, 2),
            OverallStatus::CompletedWithWarnings
        );
        assert_eq!(OverallStatus::from_counts(1, 2), OverallStatus::Failed);
    }

    #[test]
    fn test_warning_serializes_flat() {
        let warning = WorkflowWarning {
            step_index: 0,
            dataset_id: "ds1".to_string(),
            dataset: "visits".to_string(),
            score: 42.0,
            reason: WarningReason::LowGrade {
                grade: QualityGrade::D,
            },
        };
        let value = serde_json::to_value(&warning).unwrap();
        assert_eq!(value["reason"], "low_grade");
        assert_eq!(value["grade"], "D");
        assert_eq!(value["dataset"], "visits");
    }

    #[test]
    fn test_empty_result_is_success() {
        let result = WorkflowResult::new("p1", Vec::new(), Vec::new(), Vec::new());
        assert_eq!(result.overall_status, OverallStatus::Success);
        assert_eq!(
            serde_json::to_value(&result).unwrap()["overall_status"],
            json!("success")
        );
    }
}
