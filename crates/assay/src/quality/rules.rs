//! Custom validation rules and their evaluation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{AssayError, Result};
use crate::input::{DataTable, parse_numeric};

/// Inclusive numeric bounds on a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRule {
    pub column: String,
    pub min: f64,
    pub max: f64,
}

/// Regular expression every value of a column must match in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRule {
    pub column: String,
    pub pattern: String,
}

/// A custom validation rule.
///
/// The set of rule kinds is closed; adding one means adding a variant here
/// and handling it in [`CompiledRule::evaluate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationRule {
    Range(RangeRule),
    #[serde(alias = "regex")]
    Pattern(PatternRule),
}

impl ValidationRule {
    /// Shorthand for a range rule.
    pub fn range(column: impl Into<String>, min: f64, max: f64) -> Self {
        ValidationRule::Range(RangeRule {
            column: column.into(),
            min,
            max,
        })
    }

    /// Shorthand for a pattern rule.
    pub fn pattern(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        ValidationRule::Pattern(PatternRule {
            column: column.into(),
            pattern: pattern.into(),
        })
    }

    /// Parse one rule from its JSON form.
    pub fn from_value(index: usize, value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| AssayError::InvalidRule {
            index,
            message: e.to_string(),
        })
    }

    /// The column this rule constrains.
    pub fn column(&self) -> &str {
        match self {
            ValidationRule::Range(r) => &r.column,
            ValidationRule::Pattern(r) => &r.column,
        }
    }

    /// Human-readable description used in reports.
    pub fn describe(&self) -> String {
        match self {
            ValidationRule::Range(r) => format!("Range [{}, {}]", r.min, r.max),
            ValidationRule::Pattern(r) => format!("Pattern {}", r.pattern),
        }
    }
}

impl From<&ValidationRule> for Value {
    fn from(rule: &ValidationRule) -> Self {
        match rule {
            ValidationRule::Range(r) => json!({
                "type": "range",
                "column": r.column,
                "min": r.min,
                "max": r.max,
            }),
            ValidationRule::Pattern(r) => json!({
                "type": "pattern",
                "column": r.column,
                "pattern": r.pattern,
            }),
        }
    }
}

/// Parse a sequence of JSON rules, preserving order.
pub fn parse_rules(values: &[Value]) -> Result<Vec<ValidationRule>> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| ValidationRule::from_value(index, value))
        .collect()
}

/// A rule bound to a table: column resolved, pattern compiled.
#[derive(Debug)]
pub struct CompiledRule<'a> {
    pub index: usize,
    pub rule: &'a ValidationRule,
    column_index: usize,
    matcher: Option<Regex>,
}

/// Result of evaluating one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleEvaluation {
    pub violations: usize,
    /// Row indices of violating rows, in row order.
    pub violating_rows: Vec<usize>,
}

/// Bind every rule to the table, failing on the first rule that references
/// an unknown column, has inverted or non-finite bounds, or whose pattern
/// does not compile.
pub fn compile_rules<'a>(
    rules: &'a [ValidationRule],
    table: &DataTable,
) -> Result<Vec<CompiledRule<'a>>> {
    rules
        .iter()
        .enumerate()
        .map(|(index, rule)| compile_rule(index, rule, table))
        .collect()
}

fn compile_rule<'a>(
    index: usize,
    rule: &'a ValidationRule,
    table: &DataTable,
) -> Result<CompiledRule<'a>> {
    let invalid = |message: String| AssayError::InvalidRule { index, message };

    let column = rule.column();
    if column.trim().is_empty() {
        return Err(invalid("column name is empty".to_string()));
    }
    let column_index = table
        .column_index(column)
        .ok_or_else(|| invalid(format!("column '{}' does not exist", column)))?;

    let matcher = match rule {
        ValidationRule::Range(r) => {
            if !r.min.is_finite() || !r.max.is_finite() {
                return Err(invalid("range bounds must be finite".to_string()));
            }
            if r.min > r.max {
                return Err(invalid(format!(
                    "range minimum {} exceeds maximum {}",
                    r.min, r.max
                )));
            }
            None
        }
        ValidationRule::Pattern(r) => {
            let anchored = format!("^(?:{})$", r.pattern);
            let regex = Regex::new(&anchored)
                .map_err(|e| invalid(format!("pattern does not compile: {}", e)))?;
            Some(regex)
        }
    };

    Ok(CompiledRule {
        index,
        rule,
        column_index,
        matcher,
    })
}

impl CompiledRule<'_> {
    /// Count the rows violating this rule.
    ///
    /// Range rules ignore missing cells and treat non-numeric cells as
    /// violations. Pattern rules treat missing cells as non-matching.
    pub fn evaluate(&self, table: &DataTable) -> RuleEvaluation {
        let violating_rows: Vec<usize> = table
            .column_values(self.column_index)
            .enumerate()
            .filter(|(_, value)| self.violates(value))
            .map(|(row, _)| row)
            .collect();

        RuleEvaluation {
            violations: violating_rows.len(),
            violating_rows,
        }
    }

    fn violates(&self, value: &str) -> bool {
        match self.rule {
            ValidationRule::Range(r) => {
                if DataTable::is_null_value(value) {
                    return false;
                }
                match parse_numeric(value) {
                    Some(v) => v < r.min || v > r.max,
                    None => true,
                }
            }
            ValidationRule::Pattern(_) => {
                if DataTable::is_null_value(value) {
                    return true;
                }
                self.matcher.as_ref().is_some_and(|m| !m.is_match(value))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> DataTable {
        DataTable::from_rows(
            &["sample_id", "temperature"],
            &[
                &["S-001", "21.5"],
                &["S-002", "60"],
                &["s003", "-51"],
                &["S-004", "NA"],
                &["", "warm"],
            ],
        )
    }

    #[test]
    fn test_parse_rules() {
        let rules = parse_rules(&[
            json!({"type": "range", "column": "temperature", "min": -50, "max": 50}),
            json!({"type": "regex", "column": "sample_id", "pattern": "S-\\d{3}"}),
        ])
        .unwrap();

        assert_eq!(rules[0], ValidationRule::range("temperature", -50.0, 50.0));
        assert_eq!(rules[1], ValidationRule::pattern("sample_id", "S-\\d{3}"));
    }

    #[test]
    fn test_missing_field_is_invalid_rule() {
        let err = parse_rules(&[
            json!({"type": "range", "column": "temperature", "min": 0, "max": 1}),
            json!({"type": "range", "column": "temperature", "min": 0}),
        ])
        .unwrap_err();
        assert!(matches!(err, AssayError::InvalidRule { index: 1, .. }));
    }

    #[test]
    fn test_unknown_rule_type_is_invalid_rule() {
        let err = parse_rules(&[json!({"type": "unique", "column": "x"})]).unwrap_err();
        assert!(matches!(err, AssayError::InvalidRule { index: 0, .. }));
    }

    #[test]
    fn test_compile_rejects_unknown_column_and_bad_pattern() {
        let table = sample_table();

        let rules = vec![ValidationRule::range("humidity", 0.0, 100.0)];
        assert!(matches!(
            compile_rules(&rules, &table),
            Err(AssayError::InvalidRule { index: 0, .. })
        ));

        let rules = vec![
            ValidationRule::range("temperature", 0.0, 1.0),
            ValidationRule::pattern("sample_id", "S-(\\d"),
        ];
        assert!(matches!(
            compile_rules(&rules, &table),
            Err(AssayError::InvalidRule { index: 1, .. })
        ));

        let rules = vec![ValidationRule::range("temperature", 5.0, 1.0)];
        assert!(compile_rules(&rules, &table).is_err());
    }

    #[test]
    fn test_range_rule_evaluation() {
        let table = sample_table();
        let rules = vec![ValidationRule::range("temperature", -50.0, 50.0)];
        let compiled = compile_rules(&rules, &table).unwrap();

        // 60 and -51 are out of bounds, "warm" is not a number, NA is skipped
        let eval = compiled[0].evaluate(&table);
        assert_eq!(eval.violations, 3);
        assert_eq!(eval.violating_rows, vec![1, 2, 4]);
    }

    #[test]
    fn test_pattern_rule_requires_full_match() {
        let table = sample_table();
        let rules = vec![ValidationRule::pattern("sample_id", "S-\\d{2}")];
        let compiled = compile_rules(&rules, &table).unwrap();

        // No id is a full match for two digits; the empty id is missing.
        assert_eq!(compiled[0].evaluate(&table).violations, 5);

        let rules = vec![ValidationRule::pattern("sample_id", "S-\\d{3}")];
        let compiled = compile_rules(&rules, &table).unwrap();
        let eval = compiled[0].evaluate(&table);
        assert_eq!(eval.violating_rows, vec![2, 4]);
    }

    #[test]
    fn test_rule_to_value_round_trips_through_parser() {
        let rule = ValidationRule::range("temperature", -50.0, 50.0);
        let value = Value::from(&rule);
        assert_eq!(ValidationRule::from_value(0, &value).unwrap(), rule);
        assert_eq!(rule.describe(), "Range [-50, 50]");
    }
}
