//! Records exchanged with the backing data store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::input::DataTable;

/// A research project that owns datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: String,
    pub title: String,
}

impl ProjectInfo {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Metadata describing a stored dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub id: String,
    /// Owning project.
    pub project_id: String,
    pub name: String,
    /// Size of the stored content in bytes.
    pub size_bytes: u64,
    pub row_count: usize,
    pub column_count: usize,
    /// Content checksum, when the store computed one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Whether the dataset has already been through processing.
    #[serde(default)]
    pub is_processed: bool,
    /// Free-form metadata (provenance of derived datasets, etc.).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// A dataset to be created by the store, e.g. the output of a merge.
#[derive(Debug, Clone)]
pub struct NewDataset {
    pub name: String,
    pub table: DataTable,
    pub metadata: Map<String, Value>,
}

impl NewDataset {
    pub fn new(name: impl Into<String>, table: DataTable) -> Self {
        Self {
            name: name.into(),
            table,
            metadata: Map::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Kind of processing job recorded in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    QualityAssessment,
    CrossReference,
    StatisticalAnalysis,
    Workflow,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::QualityAssessment => "quality_assessment",
            JobKind::CrossReference => "cross_reference",
            JobKind::StatisticalAnalysis => "statistical_analysis",
            JobKind::Workflow => "workflow",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a recorded job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    Failed,
}

/// Identifier of a recorded job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub project_id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Job payload (a report, a workflow result, merge provenance, ...).
    pub result: Value,
    pub created_at: DateTime<Utc>,
}
