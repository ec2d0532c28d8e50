//! Error types for the Assay library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Assay operations.
#[derive(Debug, Error)]
pub enum AssayError {
    /// The dataset identifier did not resolve in the store.
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    /// The project identifier did not resolve in the store.
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// A validation rule is malformed or does not fit the dataset.
    #[error("Invalid rule #{index}: {message}")]
    InvalidRule { index: usize, message: String },

    /// Metric weights are negative, non-finite, or name an unknown metric.
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    /// A workflow step names a type outside the supported set.
    #[error("Unsupported step type '{step_type}' at step {index}")]
    UnsupportedStepType { index: usize, step_type: String },

    /// A workflow step is structurally invalid (missing type, bad parameters).
    #[error("Invalid step {index}: {message}")]
    InvalidStep { index: usize, message: String },

    /// A merge key is absent from one of the datasets being merged.
    #[error("Key column '{column}' missing from dataset '{dataset}'")]
    KeyColumnMissing { dataset: String, column: String },

    /// Two datasets share no key values.
    #[error("No overlapping rows between '{source_id}' and '{target_id}' on key '{key}'")]
    NoOverlappingRows {
        source_id: String,
        target_id: String,
        key: String,
    },

    /// A column selected for numeric analysis is not numeric.
    #[error("Column '{column}' in dataset '{dataset}' is not numeric")]
    NonNumericColumn { dataset: String, column: String },

    /// A column referenced by name does not exist.
    #[error("Column '{column}' not found in dataset '{dataset}'")]
    UnknownColumn { dataset: String, column: String },

    /// A step referenced a dataset owned by another project.
    #[error("Dataset '{dataset}' does not belong to project '{project}'")]
    DatasetOutsideProject { dataset: String, project: String },

    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Regex compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Empty file or no data to load.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error reading or writing persisted records.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl AssayError {
    /// Whether this error stems from caller-supplied configuration rather
    /// than from data or resolution.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AssayError::InvalidRule { .. }
                | AssayError::InvalidWeights(_)
                | AssayError::UnsupportedStepType { .. }
                | AssayError::InvalidStep { .. }
                | AssayError::Config(_)
        )
    }
}

/// Result type alias for Assay operations.
pub type Result<T> = std::result::Result<T, AssayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        let err = AssayError::InvalidRule {
            index: 0,
            message: "missing field `column`".to_string(),
        };
        assert!(err.is_configuration());
        assert!(
            AssayError::UnsupportedStepType {
                index: 2,
                step_type: "export".to_string()
            }
            .is_configuration()
        );
        assert!(!AssayError::DatasetNotFound("ds1".to_string()).is_configuration());
        assert!(!AssayError::ProjectNotFound("p1".to_string()).is_configuration());
    }

    #[test]
    fn test_error_messages() {
        let err = AssayError::KeyColumnMissing {
            dataset: "visits".to_string(),
            column: "patient_id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Key column 'patient_id' missing from dataset 'visits'"
        );
    }
}
