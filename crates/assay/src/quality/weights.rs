//! Quality metrics and their weights in the overall score.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AssayError, Result};

/// A quality dimension contributing to the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Completeness,
    Validity,
    Consistency,
    Accuracy,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Completeness => "completeness",
            Metric::Validity => "validity",
            Metric::Consistency => "consistency",
            Metric::Accuracy => "accuracy",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric weights. Weights need not sum to one; a metric missing from the
/// map weighs zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdConfig {
    weights: IndexMap<Metric, f64>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self::empty()
            .with_weight(Metric::Completeness, 0.3)
            .with_weight(Metric::Validity, 0.3)
            .with_weight(Metric::Consistency, 0.4)
    }
}

/// Weights actually applied to the metrics present in a report.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedWeights {
    /// Present metric to weight; weights sum to one.
    pub weights: IndexMap<Metric, f64>,
    /// True when every present metric had zero weight and equal weights
    /// were substituted.
    pub fell_back: bool,
}

impl ThresholdConfig {
    /// A configuration with no weights at all.
    pub fn empty() -> Self {
        Self {
            weights: IndexMap::new(),
        }
    }

    /// Set the weight of one metric.
    pub fn with_weight(mut self, metric: Metric, weight: f64) -> Self {
        self.weights.insert(metric, weight);
        self
    }

    /// Parse weights from a JSON object such as `{"completeness": 1}`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value.clone())
            .map_err(|e| AssayError::InvalidWeights(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Weight of a metric, zero when unset.
    pub fn weight(&self, metric: Metric) -> f64 {
        self.weights.get(&metric).copied().unwrap_or(0.0)
    }

    /// Reject negative or non-finite weights.
    pub fn validate(&self) -> Result<()> {
        for (metric, weight) in &self.weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(AssayError::InvalidWeights(format!(
                    "weight for {} must be a non-negative number, got {}",
                    metric, weight
                )));
            }
        }
        Ok(())
    }

    /// Re-normalize the weights over the metrics actually present.
    ///
    /// Absent metrics are excluded entirely rather than scored as zero.
    pub fn normalize(&self, present: &[Metric]) -> NormalizedWeights {
        // Scale by the largest weight first so the sum cannot overflow.
        let largest = present
            .iter()
            .map(|m| self.weight(*m))
            .fold(0.0, f64::max);
        let scaled = |m: Metric| {
            if largest > 0.0 {
                self.weight(m) / largest
            } else {
                0.0
            }
        };
        let total: f64 = present.iter().map(|m| scaled(*m)).sum();

        if present.is_empty() {
            return NormalizedWeights {
                weights: IndexMap::new(),
                fell_back: false,
            };
        }

        if total <= 0.0 {
            let equal = 1.0 / present.len() as f64;
            return NormalizedWeights {
                weights: present.iter().map(|m| (*m, equal)).collect(),
                fell_back: true,
            };
        }

        NormalizedWeights {
            weights: present
                .iter()
                .map(|m| (*m, scaled(*m) / total))
                .collect(),
            fell_back: false,
        }
    }
}
