//! Workflow definitions and their up-front validation.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::Value;

use super::step::{StepType, WorkflowStep, parameters_object};
use crate::error::{AssayError, Result};

/// An ordered, validated pipeline of steps.
///
/// Accepted JSON:
///
/// ```json
/// {"steps": [{"type": "data_validation", "parameters": {"rules": []}}]}
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowConfig {
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowConfig {
    pub fn new(steps: Vec<WorkflowStep>) -> Self {
        Self { steps }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Validate a workflow description.
    ///
    /// Every step's type is checked before any parameters are parsed, so an
    /// unknown type anywhere in the pipeline is reported as
    /// `UnsupportedStepType` even when an earlier step has bad parameters.
    pub fn from_value(value: &Value) -> Result<Self> {
        let steps = match value.get("steps") {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Array(steps)) => steps,
            Some(_) => {
                return Err(AssayError::Config(
                    "workflow 'steps' must be an array".to_string(),
                ));
            }
        };

        let step_types = steps
            .iter()
            .enumerate()
            .map(|(index, step)| step_type_of(index, step))
            .collect::<Result<Vec<_>>>()?;

        let steps = steps
            .iter()
            .zip(step_types)
            .enumerate()
            .map(|(index, (step, step_type))| {
                let parameters = parameters_object(index, step.get("parameters"))?;
                WorkflowStep::from_parts(index, step_type, parameters)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { steps })
    }

    /// Load and validate a workflow from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| AssayError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let value: Value = serde_json::from_reader(BufReader::new(file))?;
        Self::from_value(&value)
    }
}

fn step_type_of(index: usize, step: &Value) -> Result<StepType> {
    let name = match step.get("type") {
        Some(Value::String(name)) => name,
        Some(other) => {
            return Err(AssayError::InvalidStep {
                index,
                message: format!("step type must be a string, got {}", other),
            });
        }
        None => {
            return Err(AssayError::InvalidStep {
                index,
                message: "step has no type".to_string(),
            });
        }
    };

    StepType::parse(name).ok_or_else(|| AssayError::UnsupportedStepType {
        index,
        step_type: name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_workflow() {
        assert!(WorkflowConfig::from_value(&json!({})).unwrap().is_empty());
        assert!(
            WorkflowConfig::from_value(&json!({"steps": []}))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_parse_steps_in_order() {
        let config = WorkflowConfig::from_value(&json!({"steps": [
            {"type": "data_validation"},
            {"type": "statistical_analysis", "parameters": {"dataset_id": "ds1"}},
        ]}))
        .unwrap();

        let types: Vec<StepType> = config.steps.iter().map(|s| s.step_type()).collect();
        assert_eq!(
            types,
            vec![StepType::DataValidation, StepType::StatisticalAnalysis]
        );
    }

    #[test]
    fn test_unknown_type_wins_over_bad_parameters() {
        let err = WorkflowConfig::from_value(&json!({"steps": [
            {"type": "cross_reference", "parameters": {}},
            {"type": "export_to_s3"},
        ]}))
        .unwrap_err();

        match err {
            AssayError::UnsupportedStepType { index, step_type } => {
                assert_eq!(index, 1);
                assert_eq!(step_type, "export_to_s3");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_type_is_invalid_step() {
        let err = WorkflowConfig::from_value(&json!({"steps": [{"parameters": {}}]})).unwrap_err();
        assert!(matches!(err, AssayError::InvalidStep { index: 0, .. }));
    }
}
