//! Interfaces to the backing data store, plus an in-memory implementation.
//!
//! The scorer only reads datasets ([`DatasetReader`]); the orchestrator also
//! resolves projects and creates records ([`DataStore`]). Writes are additive:
//! creating a dataset or recording a job never mutates an existing record.

mod audit;
mod catalog;
mod memory;
mod model;

use serde_json::Value;

use crate::error::Result;
use crate::input::DataTable;
use crate::schema::Schema;

pub use audit::{record_quality_report, record_workflow_result};
pub use catalog::{Catalog, CatalogDataset, CatalogProject};
pub use memory::MemoryStore;
pub use model::{DatasetInfo, JobId, JobKind, JobRecord, JobStatus, NewDataset, ProjectInfo};

/// Read access to dataset contents.
pub trait DatasetReader: Send + Sync {
    /// Resolve dataset metadata; fails with `DatasetNotFound`.
    fn dataset(&self, dataset_id: &str) -> Result<DatasetInfo>;

    /// The dataset's rows, in stored order.
    fn get_rows(&self, dataset_id: &str) -> Result<DataTable>;

    /// Column name to column type, in column order.
    fn get_schema(&self, dataset_id: &str) -> Result<Schema>;
}

/// Project resolution and record creation on top of dataset reads.
pub trait DataStore: DatasetReader {
    /// Resolve a project; fails with `ProjectNotFound`.
    fn project(&self, project_id: &str) -> Result<ProjectInfo>;

    /// All datasets owned by a project, in store order.
    fn project_datasets(&self, project_id: &str) -> Result<Vec<DatasetInfo>>;

    /// Create a new dataset in a project.
    fn create_dataset(&self, project_id: &str, dataset: NewDataset) -> Result<DatasetInfo>;

    /// Persist a processing-job record and return its identifier.
    fn record_job(
        &self,
        project_id: &str,
        kind: JobKind,
        status: JobStatus,
        result: Value,
    ) -> Result<JobId>;
}
