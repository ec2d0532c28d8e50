//! Executes workflows step by step against a project's datasets.

use serde_json::{Value, json};

use super::analysis::{high_correlations, numeric_columns, summarize};
use super::config::WorkflowConfig;
use super::merge::merge_tables;
use super::result::{
    AnalysisOutput, DatasetValidation, MergeOutput, StepOutput, StepResult, WarningReason,
    WorkflowError, WorkflowResult, WorkflowWarning,
};
use super::step::{
    AnalysisType, CrossReferenceParams, DataValidationParams, StatisticalAnalysisParams,
    WorkflowStep,
};
use crate::error::{AssayError, Result};
use crate::quality::{
    QualityGrade, QualityScorer, ScoreRequest, ScorerConfig, ThresholdConfig, parse_rules,
};
use crate::store::{
    DataStore, DatasetInfo, JobKind, JobStatus, NewDataset, record_quality_report,
    record_workflow_result,
};

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Aggregate completeness below this raises a warning.
    pub completeness_threshold: f64,
    /// Grades that raise a warning.
    pub warn_grades: Vec<QualityGrade>,
    /// Record a job per scored dataset, merge, analysis and run.
    pub record_jobs: bool,
    pub scorer: ScorerConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            completeness_threshold: 80.0,
            warn_grades: vec![QualityGrade::D],
            record_jobs: true,
            scorer: ScorerConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_completeness_threshold(mut self, threshold: f64) -> Self {
        self.completeness_threshold = threshold;
        self
    }

    pub fn with_warn_grades(mut self, grades: Vec<QualityGrade>) -> Self {
        self.warn_grades = grades;
        self
    }

    pub fn with_record_jobs(mut self, record: bool) -> Self {
        self.record_jobs = record;
        self
    }

    pub fn with_scorer(mut self, scorer: ScorerConfig) -> Self {
        self.scorer = scorer;
        self
    }
}

/// Runs workflows. Holds configuration only; all data lives in the store.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    config: OrchestratorConfig,
    scorer: QualityScorer,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OrchestratorConfig) -> Self {
        let scorer = QualityScorer::with_config(config.scorer.clone());
        Self { config, scorer }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Validate a raw workflow description, then execute it.
    ///
    /// Configuration errors surface before the store is touched.
    pub fn execute_value(
        &self,
        store: &dyn DataStore,
        project_id: &str,
        workflow: &Value,
    ) -> Result<WorkflowResult> {
        let workflow = WorkflowConfig::from_value(workflow)?;
        self.execute(store, project_id, &workflow)
    }

    /// Execute every step in order.
    ///
    /// Only an unknown project is fatal. A step that fails is recorded in
    /// `errors` and the remaining steps still run, so one run reports on
    /// every step of the pipeline.
    pub fn execute(
        &self,
        store: &dyn DataStore,
        project_id: &str,
        workflow: &WorkflowConfig,
    ) -> Result<WorkflowResult> {
        store.project(project_id)?;

        let span = tracing::info_span!("workflow", project_id, steps = workflow.steps.len());
        let _guard = span.enter();

        let mut steps = Vec::with_capacity(workflow.steps.len());
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for (index, step) in workflow.steps.iter().enumerate() {
            let step_type = step.step_type();
            tracing::debug!(index, %step_type, "running step");

            match self.run_step(store, project_id, index, step) {
                Ok((output, step_warnings)) => {
                    warnings.extend(step_warnings);
                    steps.push(StepResult::completed(index, step_type, output));
                }
                Err(e) => {
                    tracing::warn!(index, %step_type, error = %e, "step failed");
                    errors.push(WorkflowError {
                        step_index: index,
                        step: step_type,
                        error: e.to_string(),
                        parameters: step.parameters(),
                    });
                    steps.push(StepResult::failed(index, step_type, e.to_string()));
                }
            }
        }

        let result = WorkflowResult::new(project_id, steps, errors, warnings);
        tracing::info!(
            status = result.overall_status.as_str(),
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "workflow finished"
        );

        if self.config.record_jobs {
            record_workflow_result(store, project_id, &result)?;
        }
        Ok(result)
    }

    fn run_step(
        &self,
        store: &dyn DataStore,
        project_id: &str,
        index: usize,
        step: &WorkflowStep,
    ) -> Result<(StepOutput, Vec<WorkflowWarning>)> {
        match step {
            WorkflowStep::DataValidation(params) => {
                self.run_validation(store, project_id, index, params)
            }
            WorkflowStep::CrossReference(params) => self
                .run_cross_reference(store, project_id, params)
                .map(|out| (StepOutput::CrossReference(out), Vec::new())),
            WorkflowStep::StatisticalAnalysis(params) => self
                .run_analysis(store, project_id, params)
                .map(|out| (StepOutput::StatisticalAnalysis(out), Vec::new())),
        }
    }

    /// Score every unprocessed dataset in the project.
    fn run_validation(
        &self,
        store: &dyn DataStore,
        project_id: &str,
        index: usize,
        params: &DataValidationParams,
    ) -> Result<(StepOutput, Vec<WorkflowWarning>)> {
        // Malformed rules fail the step even if there is nothing to score.
        parse_rules(&params.rules)?;
        let weights = params
            .thresholds
            .as_ref()
            .map(ThresholdConfig::from_value)
            .transpose()?;
        let request = ScoreRequest {
            rules: params.rules.clone(),
            weights,
            accuracy: None,
        };
        let threshold = params
            .completeness_threshold
            .unwrap_or(self.config.completeness_threshold);

        // Score everything before recording, so a failure leaves no jobs behind.
        let scored = store
            .project_datasets(project_id)?
            .into_iter()
            .filter(|d| !d.is_processed)
            .map(|info| {
                let report = self.scorer.score(store, &info.id, &request)?;
                Ok((info, report))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut datasets = Vec::with_capacity(scored.len());
        let mut warnings = Vec::new();

        for (info, report) in scored {
            let job_id = if self.config.record_jobs {
                Some(record_quality_report(store, project_id, &report)?)
            } else {
                None
            };

            let warn = |reason: WarningReason| WorkflowWarning {
                step_index: index,
                dataset_id: info.id.clone(),
                dataset: info.name.clone(),
                score: report.overall_score,
                reason,
            };
            if self.config.warn_grades.contains(&report.quality_grade) {
                warnings.push(warn(WarningReason::LowGrade {
                    grade: report.quality_grade,
                }));
            }
            if let Some(completeness) = report.completeness_score() {
                if completeness < threshold {
                    warnings.push(warn(WarningReason::LowCompleteness {
                        completeness,
                        threshold,
                    }));
                }
            }

            datasets.push(DatasetValidation {
                dataset_id: info.id,
                dataset_name: info.name,
                overall_score: report.overall_score,
                quality_grade: report.quality_grade,
                sharing: report.sharing,
                job_id,
                report,
            });
        }

        tracing::debug!(
            datasets = datasets.len(),
            warnings = warnings.len(),
            "validation step done"
        );
        Ok((StepOutput::Validation { datasets }, warnings))
    }

    fn run_cross_reference(
        &self,
        store: &dyn DataStore,
        project_id: &str,
        params: &CrossReferenceParams,
    ) -> Result<MergeOutput> {
        let source = project_dataset(store, project_id, &params.source_id)?;
        let target = project_dataset(store, project_id, &params.target_id)?;

        let merged = merge_tables(
            &store.get_rows(&source.id)?,
            &source.id,
            &store.get_rows(&target.id)?,
            &target.id,
            &params.merge_key,
            params.merge_type,
        )?;

        let name = params
            .name
            .clone()
            .unwrap_or_else(|| format!("Merged_{}_{}", source.name, target.name));
        let records_merged = merged.row_count();
        let columns = merged.headers.clone();

        let derived = store.create_dataset(
            project_id,
            NewDataset::new(name, merged)
                .with_metadata("workflow_step", "cross_reference")
                .with_metadata("source_datasets", json!([source.id, target.id]))
                .with_metadata("merge_key", params.merge_key.clone())
                .with_metadata("merge_type", params.merge_type.as_str()),
        )?;

        let mut output = MergeOutput {
            dataset_id: derived.id,
            dataset_name: derived.name,
            source_id: source.id,
            target_id: target.id,
            merge_key: params.merge_key.clone(),
            merge_type: params.merge_type,
            records_merged,
            columns,
            job_id: None,
        };
        if self.config.record_jobs {
            output.job_id = Some(store.record_job(
                project_id,
                JobKind::CrossReference,
                JobStatus::Completed,
                serde_json::to_value(&output)?,
            )?);
        }

        tracing::info!(
            dataset_id = %output.dataset_id,
            records = records_merged,
            "created merged dataset"
        );
        Ok(output)
    }

    fn run_analysis(
        &self,
        store: &dyn DataStore,
        project_id: &str,
        params: &StatisticalAnalysisParams,
    ) -> Result<AnalysisOutput> {
        let info = project_dataset(store, project_id, &params.dataset_id)?;
        let table = store.get_rows(&info.id)?;
        let schema = store.get_schema(&info.id)?;
        let columns = numeric_columns(&table, &schema, &info.id, params.columns.as_deref())?;

        let mut output = AnalysisOutput {
            dataset_id: info.id.clone(),
            analysis: params.analysis_type,
            columns: columns.iter().map(|(name, _)| name.clone()).collect(),
            high_correlations: Vec::new(),
            summaries: Default::default(),
            job_id: None,
        };
        match params.analysis_type {
            AnalysisType::Correlation => {
                output.high_correlations =
                    high_correlations(&table, &columns, params.correlation_threshold);
            }
            AnalysisType::Summary => {
                output.summaries = summarize(&table, &columns);
            }
        }

        if self.config.record_jobs {
            output.job_id = Some(store.record_job(
                project_id,
                JobKind::StatisticalAnalysis,
                JobStatus::Completed,
                serde_json::to_value(&output)?,
            )?);
        }
        Ok(output)
    }
}

/// Resolve a dataset and check it belongs to the project.
fn project_dataset(
    store: &dyn DataStore,
    project_id: &str,
    dataset_id: &str,
) -> Result<DatasetInfo> {
    let info = store.dataset(dataset_id)?;
    if info.project_id != project_id {
        return Err(AssayError::DatasetOutsideProject {
            dataset: dataset_id.to_string(),
            project: project_id.to_string(),
        });
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::DataTable;
    use crate::store::{DatasetReader, MemoryStore, ProjectInfo};
    use crate::workflow::{OverallStatus, StepStatus};

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_project(ProjectInfo::new("p1", "Cohort")).unwrap();
        store.add_project(ProjectInfo::new("p2", "Other")).unwrap();
        store
            .add_table(
                "p1",
                "visits",
                "visits",
                DataTable::from_rows(&["id", "site"], &[&["1", "Oslo"], &["2", "Lyon"]]),
            )
            .unwrap();
        store
            .add_table(
                "p1",
                "labs",
                "labs",
                DataTable::from_rows(&["id", "glucose"], &[&["2", "5.4"], &["3", "6.0"]]),
            )
            .unwrap();
        store
            .add_table(
                "p2",
                "foreign",
                "foreign",
                DataTable::from_rows(&["id"], &[&["1"]]),
            )
            .unwrap();
        store
    }

    fn step(value: Value) -> WorkflowConfig {
        WorkflowConfig::from_value(&json!({ "steps": [value] })).unwrap()
    }

    #[test]
    fn test_unknown_project_is_fatal() {
        let err = Orchestrator::new()
            .execute(&store(), "nope", &WorkflowConfig::default())
            .unwrap_err();
        assert!(matches!(err, AssayError::ProjectNotFound(_)));
    }

    #[test]
    fn test_cross_reference_creates_dataset() {
        let store = store();
        let workflow = step(json!({"type": "cross_reference",
            "parameters": {"source_id": "visits", "target_id": "labs"}}));
        let result = Orchestrator::new().execute(&store, "p1", &workflow).unwrap();

        assert_eq!(result.overall_status, OverallStatus::Success);
        let merge = result.derived_datasets().next().unwrap();
        assert_eq!(merge.dataset_name, "Merged_visits_labs");
        assert_eq!(merge.records_merged, 1);

        let info = store.dataset(&merge.dataset_id).unwrap();
        assert_eq!(info.project_id, "p1");
        assert_eq!(info.metadata["merge_key"], "id");
        assert_eq!(info.metadata["source_datasets"], json!(["visits", "labs"]));
    }

    #[test]
    fn test_dataset_outside_project_fails_step() {
        let workflow = step(json!({"type": "statistical_analysis",
            "parameters": {"dataset_id": "foreign"}}));
        let result = Orchestrator::new().execute(&store(), "p1", &workflow).unwrap();

        assert_eq!(result.overall_status, OverallStatus::Failed);
        assert_eq!(result.steps[0].status, StepStatus::Failed);
        assert!(result.errors[0].error.contains("does not belong"));
    }

    #[test]
    fn test_failed_validation_records_no_assessments() {
        let store = store();
        // `site` exists in visits, which scores first, but not in labs.
        let workflow = step(json!({"type": "data_validation", "parameters": {
            "rules": [{"type": "pattern", "column": "site", "pattern": "[A-Z][a-z]+"}]}}));
        let result = Orchestrator::new().execute(&store, "p1", &workflow).unwrap();

        assert_eq!(result.steps[0].status, StepStatus::Failed);
        assert!(result.steps[0].output.is_none());
        assert!(result.errors[0].error.contains("site"));

        let kinds: Vec<JobKind> = store.jobs().unwrap().iter().map(|j| j.kind).collect();
        assert_eq!(kinds, vec![JobKind::Workflow]);
    }

    #[test]
    fn test_jobs_are_optional() {
        let store = store();
        let orchestrator =
            Orchestrator::with_config(OrchestratorConfig::default().with_record_jobs(false));
        let workflow = step(json!({"type": "data_validation"}));
        orchestrator.execute(&store, "p1", &workflow).unwrap();
        assert!(store.jobs().unwrap().is_empty());

        Orchestrator::new().execute(&store, "p1", &workflow).unwrap();
        let kinds: Vec<JobKind> = store.jobs().unwrap().iter().map(|j| j.kind).collect();
        assert_eq!(
            kinds,
            vec![
                JobKind::QualityAssessment,
                JobKind::QualityAssessment,
                JobKind::Workflow
            ]
        );
    }
}
