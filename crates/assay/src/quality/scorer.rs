//! The quality scorer: completeness, consistency, validity and accuracy
//! combined into a graded report.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::report::{OutlierSummary, QualityGrade, QualityReport, ReportNote, RuleOutcome};
use super::rules::{ValidationRule, compile_rules, parse_rules};
use super::weights::{Metric, ThresholdConfig};
use crate::error::{AssayError, Result};
use crate::input::DataTable;
use crate::schema::Schema;
use crate::stats::TukeyFences;
use crate::store::DatasetReader;

/// Scorer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScorerConfig {
    /// IQR multiplier for outlier fences.
    pub iqr_multiplier: f64,
    /// Maximum outlier values and violating rows kept as examples.
    pub max_outlier_examples: usize,
    /// Weights used when a request supplies none.
    pub default_weights: ThresholdConfig,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            iqr_multiplier: 1.5,
            max_outlier_examples: 5,
            default_weights: ThresholdConfig::default(),
        }
    }
}

/// Inputs to one scoring run besides the dataset itself.
#[derive(Debug, Clone, Default)]
pub struct ScoreRequest {
    /// Custom rules in their JSON form; parsed and checked by the scorer.
    pub rules: Vec<Value>,
    /// Metric weights; the scorer's defaults apply when absent.
    pub weights: Option<ThresholdConfig>,
    /// Accuracy per column (0-100), computed by the caller against
    /// ground truth. Accuracy is left out of the score when absent.
    pub accuracy: Option<IndexMap<String, f64>>,
}

impl ScoreRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add typed rules.
    pub fn with_rules<'a>(mut self, rules: impl IntoIterator<Item = &'a ValidationRule>) -> Self {
        self.rules.extend(rules.into_iter().map(Value::from));
        self
    }

    /// Add rules in their raw JSON form.
    pub fn with_raw_rules(mut self, rules: impl IntoIterator<Item = Value>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn with_weights(mut self, weights: ThresholdConfig) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_accuracy(mut self, accuracy: IndexMap<String, f64>) -> Self {
        self.accuracy = Some(accuracy);
        self
    }
}

/// Computes quality reports. Holds configuration only; each call reads the
/// dataset afresh and shares no state with other calls.
#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    config: ScorerConfig,
}

impl QualityScorer {
    /// Create a scorer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scorer with custom configuration.
    pub fn with_config(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Score a dataset, stamping the report with the current time.
    pub fn score<R: DatasetReader + ?Sized>(
        &self,
        reader: &R,
        dataset_id: &str,
        request: &ScoreRequest,
    ) -> Result<QualityReport> {
        self.score_at(reader, dataset_id, request, Utc::now())
    }

    /// Score a dataset with an explicit report timestamp.
    ///
    /// Identical inputs and timestamp produce identical reports. All
    /// configuration is checked before any metric is computed.
    pub fn score_at<R: DatasetReader + ?Sized>(
        &self,
        reader: &R,
        dataset_id: &str,
        request: &ScoreRequest,
        timestamp: DateTime<Utc>,
    ) -> Result<QualityReport> {
        let info = reader.dataset(dataset_id)?;
        let table = reader.get_rows(dataset_id)?;
        let schema = reader.get_schema(dataset_id)?;

        let rules = parse_rules(&request.rules)?;
        let compiled = compile_rules(&rules, &table)?;

        let weights = request
            .weights
            .as_ref()
            .unwrap_or(&self.config.default_weights);
        weights.validate()?;

        if let Some(ref accuracy) = request.accuracy {
            validate_accuracy(accuracy, &table, dataset_id)?;
        }

        let rows = table.row_count();
        let mut notes = Vec::new();
        if rows == 0 {
            notes.push(ReportNote::EmptyDataset);
        }

        let completeness = self.completeness(&table);
        let validity = self.validity(&table, &schema);

        let consistency: Vec<RuleOutcome> = compiled
            .iter()
            .map(|rule| {
                let eval = rule.evaluate(&table);
                RuleOutcome {
                    index: rule.index,
                    column: rule.rule.column().to_string(),
                    rule: rule.rule.describe(),
                    violations: eval.violations,
                    score: passing_percentage(eval.violations, rows),
                    sample_rows: eval
                        .violating_rows
                        .into_iter()
                        .take(self.config.max_outlier_examples)
                        .collect(),
                }
            })
            .collect();

        let mut metric_scores = IndexMap::new();
        if let Some(avg) = mean(completeness.values().copied()) {
            metric_scores.insert(Metric::Completeness, avg);
        }
        if let Some(avg) = mean(validity.values().map(|v| v.score)) {
            metric_scores.insert(Metric::Validity, avg);
        }
        if let Some(avg) = mean(consistency.iter().map(|o| o.score)) {
            metric_scores.insert(Metric::Consistency, avg);
        }
        if let Some(avg) = request
            .accuracy
            .as_ref()
            .and_then(|a| mean(a.values().copied()))
        {
            metric_scores.insert(Metric::Accuracy, avg);
        }

        let present: Vec<Metric> = metric_scores.keys().copied().collect();
        let normalized = weights.normalize(&present);
        if normalized.fell_back {
            notes.push(ReportNote::ZeroWeightFallback);
        }

        let overall_score = if metric_scores.is_empty() {
            notes.push(ReportNote::NoMetrics);
            100.0
        } else {
            metric_scores
                .iter()
                .map(|(metric, score)| score * normalized.weights[metric])
                .sum::<f64>()
                .clamp(0.0, 100.0)
        };

        let quality_grade = QualityGrade::from_score(overall_score);

        tracing::debug!(
            dataset_id,
            rows,
            rules = consistency.len(),
            overall_score,
            grade = %quality_grade,
            "scored dataset"
        );

        Ok(QualityReport {
            dataset_id: info.id,
            row_count: rows,
            column_count: table.column_count(),
            completeness,
            consistency,
            validity,
            accuracy: request.accuracy.clone(),
            metric_scores,
            weights_applied: normalized.weights,
            overall_score,
            quality_grade,
            sharing: quality_grade.sharing(),
            notes,
            timestamp,
        })
    }

    /// Percentage of non-missing values per column.
    fn completeness(&self, table: &DataTable) -> IndexMap<String, f64> {
        let rows = table.row_count();
        table
            .headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let missing = table
                    .column_values(idx)
                    .filter(|v| DataTable::is_null_value(v))
                    .count();
                (name.clone(), passing_percentage(missing, rows))
            })
            .collect()
    }

    /// Tukey outliers for every numeric column, independent of custom rules.
    fn validity(&self, table: &DataTable, schema: &Schema) -> IndexMap<String, OutlierSummary> {
        let rows = table.row_count();
        let mut validity = IndexMap::new();

        for (idx, name) in table.headers.iter().enumerate() {
            if !schema.get(name).is_some_and(|t| t.is_numeric()) {
                continue;
            }

            let values: Vec<f64> = table.numeric_column(idx).into_iter().flatten().collect();
            let fences = TukeyFences::compute(&values, self.config.iqr_multiplier);
            let outliers: Vec<f64> = match fences {
                Some(f) => values.iter().copied().filter(|v| f.is_outlier(*v)).collect(),
                None => Vec::new(),
            };

            let outlier_percentage = if rows == 0 {
                0.0
            } else {
                outliers.len() as f64 / rows as f64 * 100.0
            };

            validity.insert(
                name.clone(),
                OutlierSummary {
                    outliers_count: outliers.len(),
                    outlier_percentage,
                    score: passing_percentage(outliers.len(), rows),
                    fences,
                    examples: outliers
                        .into_iter()
                        .take(self.config.max_outlier_examples)
                        .collect(),
                },
            );
        }

        validity
    }
}

/// `100 * (1 - failing / total)`, or 100 when there is nothing to measure.
fn passing_percentage(failing: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (100.0 * (1.0 - failing as f64 / total as f64)).clamp(0.0, 100.0)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn validate_accuracy(
    accuracy: &IndexMap<String, f64>,
    table: &DataTable,
    dataset_id: &str,
) -> Result<()> {
    for (column, value) in accuracy {
        if table.column_index(column).is_none() {
            return Err(AssayError::UnknownColumn {
                dataset: dataset_id.to_string(),
                column: column.clone(),
            });
        }
        if !value.is_finite() || !(0.0..=100.0).contains(value) {
            return Err(AssayError::Config(format!(
                "accuracy for column '{}' must lie in [0, 100], got {}",
                column, value
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, ProjectInfo};
    use chrono::TimeZone;

    fn store_with(table: DataTable) -> MemoryStore {
        let store = MemoryStore::new();
        store.add_project(ProjectInfo::new("p1", "Study")).unwrap();
        store.add_table("p1", "ds1", "readings", table).unwrap();
        store
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_passing_percentage() {
        assert_eq!(passing_percentage(0, 0), 100.0);
        assert_eq!(passing_percentage(1, 10), 90.0);
        assert_eq!(passing_percentage(10, 10), 0.0);
    }

    #[test]
    fn test_clean_dataset_grades_a() {
        let table = DataTable::from_rows(
            &["id", "site"],
            &[&["1", "Oslo"], &["2", "Lyon"], &["3", "Porto"]],
        );
        let store = store_with(table);
        let report = QualityScorer::new()
            .score(&store, "ds1", &ScoreRequest::new())
            .unwrap();

        assert_eq!(report.overall_score, 100.0);
        assert_eq!(report.quality_grade, QualityGrade::A);
        assert!(report.is_shareable());
        assert!(report.notes.is_empty());
    }

    #[test]
    fn test_unknown_dataset() {
        let store = store_with(DataTable::from_rows(&["id"], &[&["1"]]));
        let err = QualityScorer::new()
            .score(&store, "nope", &ScoreRequest::new())
            .unwrap_err();
        assert!(matches!(err, AssayError::DatasetNotFound(_)));
    }

    #[test]
    fn test_missing_weight_excludes_metric() {
        // Numeric column present, but only completeness is weighted.
        let table = DataTable::from_rows(
            &["value"],
            &[&["1"], &["2"], &["3"], &["4"], &["100"], &["NA"]],
        );
        let store = store_with(table);
        let request = ScoreRequest::new()
            .with_weights(ThresholdConfig::empty().with_weight(Metric::Completeness, 1.0));
        let report = QualityScorer::new().score(&store, "ds1", &request).unwrap();

        let completeness = report.completeness["value"];
        assert!((report.overall_score - completeness).abs() < 1e-9);
        assert_eq!(report.weights_applied[&Metric::Validity], 0.0);
    }

    #[test]
    fn test_huge_weights_keep_weighted_mean() {
        let table = DataTable::from_rows(&["value"], &[&["1"], &["2"], &["3"], &["4"]]);
        let store = store_with(table);
        let request = ScoreRequest::new().with_weights(
            ThresholdConfig::empty()
                .with_weight(Metric::Completeness, 1e308)
                .with_weight(Metric::Validity, 1e308),
        );
        let report = QualityScorer::new().score(&store, "ds1", &request).unwrap();

        assert!((report.weights_applied[&Metric::Validity] - 0.5).abs() < 1e-12);
        assert!((report.overall_score - 100.0).abs() < 1e-9);
        assert_eq!(report.quality_grade, QualityGrade::A);
    }

    #[test]
    fn test_accuracy_included_when_supplied() {
        let table = DataTable::from_rows(&["label"], &[&["a"], &["b"]]);
        let store = store_with(table);
        let mut accuracy = IndexMap::new();
        accuracy.insert("label".to_string(), 50.0);
        let request = ScoreRequest::new()
            .with_weights(
                ThresholdConfig::empty()
                    .with_weight(Metric::Completeness, 1.0)
                    .with_weight(Metric::Accuracy, 1.0),
            )
            .with_accuracy(accuracy);
        let report = QualityScorer::new().score(&store, "ds1", &request).unwrap();

        assert_eq!(report.metric_score(Metric::Accuracy), Some(50.0));
        assert!((report.overall_score - 75.0).abs() < 1e-9);
        assert_eq!(report.quality_grade, QualityGrade::C);
    }

    #[test]
    fn test_accuracy_out_of_range_rejected() {
        let store = store_with(DataTable::from_rows(&["label"], &[&["a"]]));
        let mut accuracy = IndexMap::new();
        accuracy.insert("label".to_string(), 140.0);
        let request = ScoreRequest::new().with_accuracy(accuracy);
        assert!(matches!(
            QualityScorer::new().score(&store, "ds1", &request),
            Err(AssayError::Config(_))
        ));
    }

    #[test]
    fn test_zero_weights_fall_back_to_equal() {
        let table = DataTable::from_rows(&["label"], &[&["a"], &[""]]);
        let store = store_with(table);
        let request = ScoreRequest::new()
            .with_weights(ThresholdConfig::empty().with_weight(Metric::Validity, 1.0));
        let report = QualityScorer::new().score(&store, "ds1", &request).unwrap();

        assert!(report.has_note(ReportNote::ZeroWeightFallback));
        assert_eq!(report.overall_score, 50.0);
    }

    #[test]
    fn test_score_at_is_deterministic() {
        let table = DataTable::from_rows(
            &["temperature", "sample_id"],
            &[&["20", "S-001"], &["21", "S-002"], &["95", "bad"], &["NA", "S-004"]],
        );
        let store = store_with(table);
        let request = ScoreRequest::new().with_rules(&[
            ValidationRule::range("temperature", -50.0, 50.0),
            ValidationRule::pattern("sample_id", "S-\\d{3}"),
        ]);
        let scorer = QualityScorer::new();
        let first = scorer.score_at(&store, "ds1", &request, fixed_time()).unwrap();
        let second = scorer.score_at(&store, "ds1", &request, fixed_time()).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_custom_iqr_multiplier() {
        let table = DataTable::from_rows(
            &["x"],
            &[&["10"], &["11"], &["12"], &["13"], &["14"], &["17"]],
        );
        let store = store_with(table);
        let strict = QualityScorer::with_config(ScorerConfig {
            iqr_multiplier: 0.5,
            ..ScorerConfig::default()
        });
        let report = strict.score(&store, "ds1", &ScoreRequest::new()).unwrap();
        assert_eq!(report.validity["x"].outliers_count, 1);

        let lenient = QualityScorer::new();
        let report = lenient.score(&store, "ds1", &ScoreRequest::new()).unwrap();
        assert_eq!(report.validity["x"].outliers_count, 0);
    }
}
