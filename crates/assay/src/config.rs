//! Settings file shared by the scorer and the orchestrator.
//!
//! ```json
//! {
//!   "scorer": { "iqr_multiplier": 1.5, "default_weights": { "completeness": 1 } },
//!   "workflow": { "completeness_threshold": 85, "warn_grades": ["C", "D"] }
//! }
//! ```
//!
//! Every key is optional; unknown keys are rejected.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AssayError, Result};
use crate::quality::{QualityGrade, ScorerConfig};
use crate::workflow::OrchestratorConfig;

/// Workflow-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowSettings {
    pub completeness_threshold: f64,
    pub warn_grades: Vec<QualityGrade>,
    pub record_jobs: bool,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            completeness_threshold: defaults.completeness_threshold,
            warn_grades: defaults.warn_grades,
            record_jobs: defaults.record_jobs,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssayConfig {
    pub scorer: ScorerConfig,
    pub workflow: WorkflowSettings,
}

impl AssayConfig {
    /// Load and validate settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| AssayError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            AssayError::Config(format!("Failed to parse '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let k = self.scorer.iqr_multiplier;
        if !k.is_finite() || k <= 0.0 {
            return Err(AssayError::Config(format!(
                "iqr_multiplier must be a positive number, got {}",
                k
            )));
        }
        self.scorer.default_weights.validate()?;

        let t = self.workflow.completeness_threshold;
        if !(0.0..=100.0).contains(&t) {
            return Err(AssayError::Config(format!(
                "completeness_threshold must lie in [0, 100], got {}",
                t
            )));
        }
        Ok(())
    }

    /// Orchestrator configuration with these settings applied.
    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig::default()
            .with_completeness_threshold(self.workflow.completeness_threshold)
            .with_warn_grades(self.workflow.warn_grades.clone())
            .with_record_jobs(self.workflow.record_jobs)
            .with_scorer(self.scorer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::Metric;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("assay.json");
        fs::write(&path, "{}").unwrap();

        let config = AssayConfig::load(&path).unwrap();
        assert_eq!(config, AssayConfig::default());
        assert_eq!(config.orchestrator(), OrchestratorConfig::default());
    }

    #[test]
    fn test_partial_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("assay.json");
        fs::write(
            &path,
            r#"{"scorer": {"default_weights": {"completeness": 1}},
                "workflow": {"warn_grades": ["C", "D"]}}"#,
        )
        .unwrap();

        let config = AssayConfig::load(&path).unwrap();
        assert_eq!(config.scorer.iqr_multiplier, 1.5);
        assert_eq!(config.scorer.default_weights.weight(Metric::Validity), 0.0);

        let orchestrator = config.orchestrator();
        assert_eq!(orchestrator.warn_grades, vec![QualityGrade::C, QualityGrade::D]);
        assert_eq!(orchestrator.completeness_threshold, 80.0);
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("assay.json");

        fs::write(&path, r#"{"scorer": {"iqr": 3}}"#).unwrap();
        assert!(matches!(AssayConfig::load(&path), Err(AssayError::Config(_))));

        fs::write(&path, r#"{"scorer": {"iqr_multiplier": -1}}"#).unwrap();
        assert!(matches!(AssayConfig::load(&path), Err(AssayError::Config(_))));

        fs::write(&path, r#"{"scorer": {"default_weights": {"validity": -1}}}"#).unwrap();
        assert!(matches!(
            AssayConfig::load(&path),
            Err(AssayError::InvalidWeights(_))
        ));
    }
}
