//! Describe command - numeric summary of a data file.

use std::path::PathBuf;

use assay::Parser;
use assay::schema::infer_schema;
use assay::workflow::{numeric_columns, summarize};
use colored::Colorize;

pub fn run(file: PathBuf, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (table, source) = Parser::new().parse_file(&file)?;
    let schema = infer_schema(&table);
    let columns = numeric_columns(&table, &schema, &source.file, None)?;
    let summaries = summarize(&table, &columns);

    if json_output {
        let output = serde_json::json!({
            "file": source.file,
            "rows": source.row_count,
            "columns": source.column_count,
            "schema": schema,
            "summaries": summaries,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} {} ({} rows, {} columns, {})",
        "Summary of".cyan().bold(),
        source.file.white(),
        source.row_count,
        source.column_count,
        source.format
    );
    println!();

    if summaries.is_empty() {
        println!("{}", "No numeric columns.".yellow());
        return Ok(());
    }

    println!(
        "  {:<20} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "column".bold(),
        "count",
        "mean",
        "std",
        "min",
        "median",
        "max"
    );
    for (column, s) in &summaries {
        println!(
            "  {:<20} {:>6} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3}",
            column, s.count, s.mean, s.std, s.min, s.median, s.max
        );
    }

    let other: Vec<String> = schema
        .iter()
        .filter(|(_, t)| !t.is_numeric())
        .map(|(name, t)| format!("{} ({})", name, t))
        .collect();
    if !other.is_empty() {
        println!();
        println!("Other columns: {}", other.join(", ").dimmed());
    }

    Ok(())
}
