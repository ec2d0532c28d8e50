//! Persisting reports and workflow results as job records.

use serde_json::Value;

use super::DataStore;
use super::model::{JobId, JobKind, JobStatus};
use crate::error::Result;
use crate::quality::QualityReport;
use crate::workflow::{OverallStatus, WorkflowResult};

/// Record a quality report as a completed `quality_assessment` job.
pub fn record_quality_report(
    store: &dyn DataStore,
    project_id: &str,
    report: &QualityReport,
) -> Result<JobId> {
    let result = serde_json::to_value(report)?;
    store.record_job(
        project_id,
        JobKind::QualityAssessment,
        JobStatus::Completed,
        result,
    )
}

/// Record a workflow result as a `workflow` job.
///
/// A run with failed steps is recorded as failed; warnings alone still count
/// as completed.
pub fn record_workflow_result(
    store: &dyn DataStore,
    project_id: &str,
    result: &WorkflowResult,
) -> Result<JobId> {
    let status = match result.overall_status {
        OverallStatus::Failed => JobStatus::Failed,
        OverallStatus::Success | OverallStatus::CompletedWithWarnings => JobStatus::Completed,
    };
    let payload: Value = serde_json::to_value(result)?;
    store.record_job(project_id, JobKind::Workflow, status, payload)
}
