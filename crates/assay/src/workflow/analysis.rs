//! Statistical analysis over numeric columns.

use indexmap::IndexMap;

use super::result::CorrelationPair;
use crate::error::{AssayError, Result};
use crate::input::DataTable;
use crate::schema::Schema;
use crate::stats::{NumericSummary, pearson};

/// Resolve the columns an analysis runs over, as `(name, index)` pairs.
///
/// Explicitly selected columns must exist and be numeric. Without a
/// selection every numeric column takes part, in column order.
pub fn numeric_columns(
    table: &DataTable,
    schema: &Schema,
    dataset_id: &str,
    selected: Option<&[String]>,
) -> Result<Vec<(String, usize)>> {
    let is_numeric = |name: &str| schema.get(name).is_some_and(|t| t.is_numeric());

    match selected {
        Some(names) => names
            .iter()
            .map(|name| {
                let idx = table
                    .column_index(name)
                    .ok_or_else(|| AssayError::UnknownColumn {
                        dataset: dataset_id.to_string(),
                        column: name.clone(),
                    })?;
                if !is_numeric(name) {
                    return Err(AssayError::NonNumericColumn {
                        dataset: dataset_id.to_string(),
                        column: name.clone(),
                    });
                }
                Ok((name.clone(), idx))
            })
            .collect(),
        None => Ok(table
            .headers
            .iter()
            .enumerate()
            .filter(|(_, name)| is_numeric(name))
            .map(|(idx, name)| (name.clone(), idx))
            .collect()),
    }
}

/// Column pairs whose Pearson correlation exceeds `threshold` in magnitude.
///
/// Each pair is correlated over the rows where both values are present;
/// pairs with too few rows or a constant column are skipped.
pub fn high_correlations(
    table: &DataTable,
    columns: &[(String, usize)],
    threshold: f64,
) -> Vec<CorrelationPair> {
    let values: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|(_, idx)| table.numeric_column(*idx))
        .collect();

    let mut pairs = Vec::new();
    for i in 0..columns.len() {
        for j in (i + 1)..columns.len() {
            let Some(r) = pearson(&values[i], &values[j]) else {
                continue;
            };
            if r.abs() > threshold {
                pairs.push(CorrelationPair {
                    var1: columns[i].0.clone(),
                    var2: columns[j].0.clone(),
                    correlation: r,
                });
            }
        }
    }
    pairs
}

/// Descriptive statistics per column; columns without values are omitted.
pub fn summarize(table: &DataTable, columns: &[(String, usize)]) -> IndexMap<String, NumericSummary> {
    columns
        .iter()
        .filter_map(|(name, idx)| {
            let values: Vec<f64> = table.numeric_column(*idx).into_iter().flatten().collect();
            NumericSummary::from_values(&values).map(|s| (name.clone(), s))
        })
        .collect()
}
