//! Multi-step processing pipelines over a project's datasets.
//!
//! A workflow is an ordered list of steps drawn from a closed set of kinds
//! (validation, cross-reference merge, statistical analysis). The whole
//! description is validated before anything runs; once running, a failing
//! step is recorded and the pipeline moves on to the next one.

mod analysis;
mod config;
mod merge;
mod orchestrator;
mod result;
mod step;

pub use analysis::{high_correlations, numeric_columns, summarize};
pub use config::WorkflowConfig;
pub use merge::merge_tables;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use result::{
    AnalysisOutput, CorrelationPair, DatasetValidation, MergeOutput, OverallStatus, StepOutput,
    StepResult, StepStatus, WarningReason, WorkflowError, WorkflowResult, WorkflowWarning,
};
pub use step::{
    AnalysisType, CrossReferenceParams, DataValidationParams, MergeType,
    StatisticalAnalysisParams, StepType, WorkflowStep,
};
