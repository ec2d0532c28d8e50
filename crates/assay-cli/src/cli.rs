//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Assay: data-quality scoring and workflow runner for research datasets
#[derive(Parser)]
#[command(name = "assay")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file for the scorer and orchestrator (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score the quality of one dataset
    Score {
        /// Catalog listing projects and dataset files (JSON)
        #[arg(value_name = "CATALOG")]
        catalog: PathBuf,

        /// Dataset identifier from the catalog
        #[arg(value_name = "DATASET_ID")]
        dataset: String,

        /// Validation rules: a JSON array of range/pattern rules
        #[arg(short, long, value_name = "FILE")]
        rules: Option<PathBuf>,

        /// Metric weights: a JSON object such as {"completeness": 1}
        #[arg(short, long, value_name = "FILE")]
        weights: Option<PathBuf>,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,

        /// Append the report as a job record to this JSON file
        #[arg(long, value_name = "FILE")]
        record: Option<PathBuf>,
    },

    /// Run a workflow over a project's datasets
    Run {
        /// Catalog listing projects and dataset files (JSON)
        #[arg(value_name = "CATALOG")]
        catalog: PathBuf,

        /// Project identifier from the catalog
        #[arg(value_name = "PROJECT_ID")]
        project: String,

        /// Workflow definition (JSON with a "steps" array)
        #[arg(value_name = "WORKFLOW")]
        workflow: PathBuf,

        /// Directory for datasets created by the workflow
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Output the result as JSON
        #[arg(long)]
        json: bool,

        /// Append job records created by the run to this JSON file
        #[arg(long, value_name = "FILE")]
        record: Option<PathBuf>,
    },

    /// Summarize the numeric columns of a data file
    Describe {
        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
