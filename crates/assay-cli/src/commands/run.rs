//! Run command - execute a workflow over a project's datasets.

use std::fs;
use std::path::{Path, PathBuf};

use assay::input::write_table;
use assay::workflow::{StepOutput, StepStatus, WarningReason};
use assay::{Catalog, DatasetReader, Orchestrator, OverallStatus, WorkflowConfig, WorkflowResult};
use colored::Colorize;

use super::load_settings;

pub struct RunArgs {
    pub catalog: PathBuf,
    pub project: String,
    pub workflow: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub json: bool,
    pub record: Option<PathBuf>,
}

pub fn run(args: RunArgs, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings(config)?;
    let workflow = WorkflowConfig::load(&args.workflow)?;
    let store = Catalog::load(&args.catalog)?.into_store()?;

    let orchestrator = Orchestrator::with_config(settings.orchestrator());
    let result = orchestrator.execute(&store, &args.project, &workflow)?;

    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create '{}': {}", dir.display(), e))?;
        for merge in result.derived_datasets() {
            let table = store.get_rows(&merge.dataset_id)?;
            let path = dir.join(merge.file_name());
            write_table(&table, &path, b',')?;
            tracing::info!(
                dataset_id = %merge.dataset_id,
                path = %path.display(),
                "wrote derived dataset"
            );
        }
    }

    if let Some(path) = &args.record {
        let saved = store.save_jobs(path)?;
        tracing::info!(jobs = saved, path = %path.display(), "saved job records");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if result.overall_status == OverallStatus::Failed {
        return Err(format!("{} workflow step(s) failed", result.errors.len()).into());
    }
    Ok(())
}

fn print_result(result: &WorkflowResult) {
    println!(
        "{} {}",
        "Workflow for project".cyan().bold(),
        result.project_id.white()
    );
    println!();

    for step in &result.steps {
        let status = match step.status {
            StepStatus::Completed => "ok".green(),
            StepStatus::Failed => "failed".red().bold(),
        };
        println!("  [{}] {} {}", step.index, step.step_type, status);

        match (&step.output, &step.error) {
            (Some(StepOutput::Validation { datasets }), _) => {
                for d in datasets {
                    println!(
                        "      {:<24} {:.1} ({})",
                        d.dataset_name, d.overall_score, d.quality_grade
                    );
                }
            }
            (Some(StepOutput::CrossReference(merge)), _) => {
                println!(
                    "      {} ({} records, {} join on '{}')",
                    merge.dataset_name,
                    merge.records_merged,
                    merge.merge_type.as_str(),
                    merge.merge_key
                );
            }
            (Some(StepOutput::StatisticalAnalysis(analysis)), _) => {
                for pair in &analysis.high_correlations {
                    println!(
                        "      {} ~ {}: {:.3}",
                        pair.var1, pair.var2, pair.correlation
                    );
                }
                for (column, s) in &analysis.summaries {
                    println!(
                        "      {:<16} n={} mean={:.3} std={:.3} min={} max={}",
                        column, s.count, s.mean, s.std, s.min, s.max
                    );
                }
            }
            (None, Some(error)) => println!("      {}", error.red()),
            (None, None) => {}
        }
    }
    println!();

    if !result.warnings.is_empty() {
        println!("{}", "Warnings:".yellow().bold());
        for warning in &result.warnings {
            let detail = match &warning.reason {
                WarningReason::LowGrade { grade } => format!("grade {}", grade),
                WarningReason::LowCompleteness {
                    completeness,
                    threshold,
                } => format!("completeness {:.1}% below {:.1}%", completeness, threshold),
            };
            println!(
                "  {} (score {:.1}): {}",
                warning.dataset, warning.score, detail
            );
        }
        println!();
    }

    let status = match result.overall_status {
        OverallStatus::Success => result.overall_status.as_str().green().bold(),
        OverallStatus::CompletedWithWarnings => result.overall_status.as_str().yellow().bold(),
        OverallStatus::Failed => result.overall_status.as_str().red().bold(),
    };
    println!("Status: {}", status);
}
