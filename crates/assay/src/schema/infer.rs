//! Column type inference from string cells.

use std::collections::HashMap;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::types::ColumnType;
use crate::input::DataTable;

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\d{4}-\d{2}-\d{2}", // ISO date
        r"^\d{2}/\d{2}/\d{4}", // US date
        r"^\d{2}-\d{2}-\d{4}", // European date
        r"^\d{4}/\d{2}/\d{2}", // Alt ISO
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Schema of a table: column name to inferred type, in column order.
pub type Schema = IndexMap<String, ColumnType>;

/// Infer the type of every column in a table.
pub fn infer_schema(table: &DataTable) -> Schema {
    table
        .headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.clone(), infer_column_type(table.column_values(idx))))
        .collect()
}

/// Infer a column type from its values, ignoring missing cells.
///
/// The majority type wins. A column whose majority is integer but which also
/// holds floats is promoted to float.
pub fn infer_column_type<'a>(values: impl IntoIterator<Item = &'a str>) -> ColumnType {
    let mut type_counts: HashMap<ColumnType, usize> = HashMap::new();

    for value in values {
        if DataTable::is_null_value(value) {
            continue;
        }
        *type_counts.entry(detect_value_type(value)).or_insert(0) += 1;
    }

    if type_counts.is_empty() {
        return ColumnType::Unknown;
    }

    // Ties break on a fixed precedence so inference is deterministic.
    let precedence = |t: &ColumnType| match t {
        ColumnType::Float => 6,
        ColumnType::Integer => 5,
        ColumnType::Boolean => 4,
        ColumnType::DateTime => 3,
        ColumnType::Date => 2,
        ColumnType::String => 1,
        ColumnType::Unknown => 0,
    };
    let best = type_counts
        .iter()
        .max_by_key(|&(t, count)| (*count, precedence(t)))
        .map(|(t, _)| *t)
        .unwrap_or(ColumnType::String);

    if best == ColumnType::Integer && type_counts.contains_key(&ColumnType::Float) {
        return ColumnType::Float;
    }

    best
}

/// Detect the type of a single non-missing value.
fn detect_value_type(value: &str) -> ColumnType {
    let trimmed = value.trim();

    if matches!(
        trimmed.to_lowercase().as_str(),
        "true" | "false" | "yes" | "no"
    ) {
        return ColumnType::Boolean;
    }

    if trimmed.parse::<i64>().is_ok() {
        return ColumnType::Integer;
    }

    if trimmed.parse::<f64>().is_ok_and(|v| v.is_finite()) {
        return ColumnType::Float;
    }

    if DATE_PATTERNS.iter().any(|p| p.is_match(trimmed)) {
        if trimmed.contains(':') || trimmed.contains('T') {
            return ColumnType::DateTime;
        }
        return ColumnType::Date;
    }

    ColumnType::String
}
