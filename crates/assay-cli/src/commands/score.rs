//! Score command - grade the quality of one dataset.

use std::path::{Path, PathBuf};

use assay::quality::ReportNote;
use assay::store::record_quality_report;
use assay::{
    Catalog, DatasetReader, QualityGrade, QualityReport, QualityScorer, ScoreRequest,
    SharingEligibility, ThresholdConfig,
};
use colored::{ColoredString, Colorize};
use serde_json::Value;

use super::{load_settings, read_json};

pub struct ScoreArgs {
    pub catalog: PathBuf,
    pub dataset: String,
    pub rules: Option<PathBuf>,
    pub weights: Option<PathBuf>,
    pub json: bool,
    pub record: Option<PathBuf>,
}

pub fn run(args: ScoreArgs, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings(config)?;
    let store = Catalog::load(&args.catalog)?.into_store()?;

    let mut request = ScoreRequest::new();
    if let Some(path) = &args.rules {
        match read_json(path)? {
            Value::Array(rules) => request = request.with_raw_rules(rules),
            _ => {
                return Err(format!(
                    "Rules file '{}' must contain a JSON array",
                    path.display()
                )
                .into());
            }
        }
    }
    if let Some(path) = &args.weights {
        request = request.with_weights(ThresholdConfig::from_value(&read_json(path)?)?);
    }

    let scorer = QualityScorer::with_config(settings.scorer);
    let report = scorer.score(&store, &args.dataset, &request)?;

    if let Some(path) = &args.record {
        let info = store.dataset(&args.dataset)?;
        let job_id = record_quality_report(&store, &info.project_id, &report)?;
        store.save_jobs(path)?;
        tracing::info!(%job_id, path = %path.display(), "recorded quality report");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &QualityReport) {
    println!(
        "{} {} ({} rows, {} columns)",
        "Quality report for".cyan().bold(),
        report.dataset_id.white(),
        report.row_count,
        report.column_count
    );
    println!();

    println!("{}", "Completeness:".yellow().bold());
    for (column, pct) in &report.completeness {
        println!("  {:<24} {}", column, colored_pct(*pct));
    }
    println!();

    if !report.validity.is_empty() {
        println!("{}", "Validity (IQR outliers):".yellow().bold());
        for (column, summary) in &report.validity {
            println!(
                "  {:<24} {} ({} outliers)",
                column,
                colored_pct(summary.score),
                summary.outliers_count
            );
        }
        println!();
    }

    if !report.consistency.is_empty() {
        println!("{}", "Consistency:".yellow().bold());
        for outcome in &report.consistency {
            println!(
                "  {:<24} {} {} ({} violations)",
                outcome.column,
                colored_pct(outcome.score),
                outcome.rule.dimmed(),
                outcome.violations
            );
        }
        println!();
    }

    println!("{}", "Metrics:".yellow().bold());
    for (metric, score) in &report.metric_scores {
        let weight = report.weights_applied.get(metric).copied().unwrap_or(0.0);
        println!(
            "  {:<24} {} (weight {:.2})",
            metric.as_str(),
            colored_pct(*score),
            weight
        );
    }
    println!();

    println!(
        "Overall score: {}  Grade: {}",
        colored_pct(report.overall_score),
        colored_grade(report.quality_grade)
    );
    let sharing = match report.sharing {
        SharingEligibility::Eligible => report.sharing.label().green(),
        SharingEligibility::ManualReview => report.sharing.label().yellow(),
        SharingEligibility::Blocked => report.sharing.label().red(),
    };
    println!("Sharing: {}", sharing);

    for note in &report.notes {
        let text = match note {
            ReportNote::EmptyDataset => "dataset has no rows; metrics default to 100",
            ReportNote::NoMetrics => "no metric could be computed",
            ReportNote::ZeroWeightFallback => "all weights were zero; equal weights used",
        };
        println!("{} {}", "note:".blue(), text);
    }
}

fn colored_pct(value: f64) -> ColoredString {
    let text = format!("{:.1}%", value);
    if value > 90.0 {
        text.green()
    } else if value > 60.0 {
        text.yellow()
    } else {
        text.red()
    }
}

fn colored_grade(grade: QualityGrade) -> ColoredString {
    let text = grade.to_string();
    match grade {
        QualityGrade::A | QualityGrade::B => text.green().bold(),
        QualityGrade::C => text.yellow().bold(),
        QualityGrade::D => text.red().bold(),
    }
}
