//! Key-based joins between two tables.

use std::collections::{HashMap, HashSet};

use super::step::MergeType;
use crate::error::{AssayError, Result};
use crate::input::DataTable;

/// Join two tables on a shared key column.
///
/// The result holds the source columns (key in place), followed by the
/// target columns other than the key. Non-key columns present in both tables
/// are suffixed `_x` (source) and `_y` (target). Missing keys never match.
/// Rows keep source order; for right joins they keep target order, and outer
/// joins append unmatched target rows after the source rows.
///
/// Fails when either table lacks the key column, or when no key value is
/// shared by both tables.
pub fn merge_tables(
    source: &DataTable,
    source_id: &str,
    target: &DataTable,
    target_id: &str,
    key: &str,
    how: MergeType,
) -> Result<DataTable> {
    let source_key = key_index(source, source_id, key)?;
    let target_key = key_index(target, target_id, key)?;

    let target_rest: Vec<usize> = (0..target.column_count())
        .filter(|&i| i != target_key)
        .collect();
    let headers = merged_headers(source, source_key, target, target_key, &target_rest);

    let build = |s: Option<&[String]>, t: Option<&[String]>| -> Vec<String> {
        let cell = |row: Option<&[String]>, i: usize| {
            row.and_then(|r| r.get(i)).cloned().unwrap_or_default()
        };
        let mut row = Vec::with_capacity(headers.len());
        for i in 0..source.column_count() {
            if i == source_key && s.is_none() {
                row.push(cell(t, target_key));
            } else {
                row.push(cell(s, i));
            }
        }
        row.extend(target_rest.iter().map(|&i| cell(t, i)));
        row
    };

    let mut rows = Vec::new();
    let mut matched_pairs = 0usize;

    if how == MergeType::Right {
        let source_index = key_lookup(source, source_key);
        for t_row in &target.rows {
            let matches = join_key(t_row, target_key).and_then(|k| source_index.get(k));
            match matches {
                Some(found) => {
                    for &s in found {
                        rows.push(build(Some(source.rows[s].as_slice()), Some(t_row.as_slice())));
                        matched_pairs += 1;
                    }
                }
                None => rows.push(build(None, Some(t_row.as_slice()))),
            }
        }
    } else {
        let target_index = key_lookup(target, target_key);
        let mut target_matched = vec![false; target.row_count()];
        for s_row in &source.rows {
            let matches = join_key(s_row, source_key).and_then(|k| target_index.get(k));
            match matches {
                Some(found) => {
                    for &t in found {
                        rows.push(build(Some(s_row.as_slice()), Some(target.rows[t].as_slice())));
                        target_matched[t] = true;
                        matched_pairs += 1;
                    }
                }
                None if how != MergeType::Inner => rows.push(build(Some(s_row.as_slice()), None)),
                None => {}
            }
        }
        if how == MergeType::Outer {
            for (t_row, matched) in target.rows.iter().zip(&target_matched) {
                if !matched {
                    rows.push(build(None, Some(t_row.as_slice())));
                }
            }
        }
    }

    if matched_pairs == 0 {
        return Err(AssayError::NoOverlappingRows {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            key: key.to_string(),
        });
    }

    Ok(DataTable::new(headers, rows))
}

fn key_index(table: &DataTable, dataset_id: &str, key: &str) -> Result<usize> {
    table
        .column_index(key)
        .ok_or_else(|| AssayError::KeyColumnMissing {
            dataset: dataset_id.to_string(),
            column: key.to_string(),
        })
}

fn join_key(row: &[String], key: usize) -> Option<&str> {
    row.get(key)
        .map(|v| v.trim())
        .filter(|v| !DataTable::is_null_value(v))
}

/// Key value to row indices, in row order.
fn key_lookup(table: &DataTable, key: usize) -> HashMap<&str, Vec<usize>> {
    let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (row_idx, row) in table.rows.iter().enumerate() {
        if let Some(k) = join_key(row, key) {
            index.entry(k).or_default().push(row_idx);
        }
    }
    index
}

fn merged_headers(
    source: &DataTable,
    source_key: usize,
    target: &DataTable,
    target_key: usize,
    target_rest: &[usize],
) -> Vec<String> {
    let source_names: HashSet<&str> = source
        .headers
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != source_key)
        .map(|(_, h)| h.as_str())
        .collect();
    let target_names: HashSet<&str> = target
        .headers
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != target_key)
        .map(|(_, h)| h.as_str())
        .collect();

    let mut headers: Vec<String> = source
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i != source_key && target_names.contains(h.as_str()) {
                format!("{}_x", h)
            } else {
                h.clone()
            }
        })
        .collect();
    headers.extend(target_rest.iter().map(|&i| {
        let h = &target.headers[i];
        if source_names.contains(h.as_str()) {
            format!("{}_y", h)
        } else {
            h.clone()
        }
    }));
    headers
}
