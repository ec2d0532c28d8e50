//! Assay: data-quality scoring and workflow orchestration for research datasets.
//!
//! Assay grades tabular datasets before they are shared between
//! institutions, and runs small processing pipelines over a project's
//! datasets.
//!
//! # Core Pieces
//!
//! - **Quality scoring**: completeness, rule consistency, outlier validity
//!   and optional accuracy, combined into an overall score and a grade that
//!   gates sharing.
//! - **Workflows**: validated, ordered steps (validation, cross-reference
//!   merges, statistical analysis) that keep going when a step fails.
//! - **Stores**: datasets are read and records written through the
//!   [`DataStore`] trait; [`MemoryStore`] is the bundled implementation.
//!
//! # Example
//!
//! ```no_run
//! use assay::{Catalog, QualityScorer, ScoreRequest, ValidationRule};
//!
//! let store = Catalog::load("catalog.json").unwrap().into_store().unwrap();
//! let request = ScoreRequest::new()
//!     .with_rules(&[ValidationRule::range("temperature", -50.0, 50.0)]);
//! let report = QualityScorer::new().score(&store, "readings", &request).unwrap();
//!
//! println!("{:.1} ({})", report.overall_score, report.quality_grade);
//! ```

pub mod config;
pub mod error;
pub mod input;
pub mod quality;
pub mod schema;
pub mod stats;
pub mod store;
pub mod workflow;

pub use config::{AssayConfig, WorkflowSettings};
pub use error::{AssayError, Result};
pub use input::{DataTable, Parser, SourceMetadata};
pub use quality::{
    Metric, QualityGrade, QualityReport, QualityScorer, ScoreRequest, ScorerConfig,
    SharingEligibility, ThresholdConfig, ValidationRule,
};
pub use schema::{ColumnType, Schema};
pub use store::{Catalog, DataStore, DatasetInfo, DatasetReader, MemoryStore, ProjectInfo};
pub use workflow::{
    Orchestrator, OrchestratorConfig, OverallStatus, WorkflowConfig, WorkflowResult,
};
