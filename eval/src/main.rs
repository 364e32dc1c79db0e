//! Evaluation harness for the rule generator.
//!
//! Runs a dataset of natural-language requests through the generation loop
//! (or a single-shot baseline) and aggregates pass rates and attempt counts.

mod case;
mod cli;
mod report;
mod run;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eval", version, about = "Evaluation harness for rulegen")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every dataset case through the generation loop.
    Run {
        /// JSON dataset: an array of `{"id", "text"}` cases.
        #[arg(long)]
        dataset: PathBuf,
        #[arg(long, default_value = "eval_results")]
        results_dir: PathBuf,
        #[arg(long, default_value_t = 3)]
        max_attempts: u32,
        /// Single-shot baseline: one attempt, no retrieval.
        #[arg(long)]
        baseline: bool,
        /// Run only the case with this id.
        #[arg(long)]
        only_id: Option<String>,
    },
    /// Aggregate a previous run's summary.json.
    Report {
        #[arg(long, default_value = "eval_results")]
        results_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            dataset,
            results_dir,
            max_attempts,
            baseline,
            only_id,
        } => cli::run_dataset(
            &dataset,
            &results_dir,
            max_attempts,
            baseline,
            only_id.as_deref(),
        ),
        Command::Report { results_dir } => cli::report(&results_dir),
    }
}
