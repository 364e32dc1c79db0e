//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use rulegen::io::corpus::Corpus;
use rulegen::io::llm::OpenAiClient;
use rulegen::io::settings::Settings;

use crate::case::load_dataset;
use crate::report::{aggregate, load_summary, write_summary};
use crate::run::{CaseOptions, run_case};

/// Run dataset cases through the generation loop and write `summary.json`.
pub fn run_dataset(
    dataset: &Path,
    results_dir: &Path,
    max_attempts: u32,
    baseline: bool,
    only_id: Option<&str>,
) -> Result<()> {
    if max_attempts == 0 {
        bail!("--max-attempts must be >= 1");
    }
    let mut cases = load_dataset(dataset)?;
    if let Some(id) = only_id {
        cases.retain(|case| case.id == id);
        if cases.is_empty() {
            bail!("case {id} not found in {}", dataset.display());
        }
    }

    let settings = Settings::from_env()?;
    let llm = OpenAiClient::new(&settings)?;
    let corpus = Corpus::load(Path::new(&settings.context_dir))?;
    let options = CaseOptions {
        max_attempts,
        baseline,
    };

    info!(cases = cases.len(), baseline, "starting eval run");
    let mut results = Vec::with_capacity(cases.len());
    for case in &cases {
        let result = run_case(&llm, &corpus, case, results_dir, &options)
            .with_context(|| format!("run case {}", case.id))?;
        println!(
            "case={} passed={} attempts={}",
            result.id, result.passed, result.attempts
        );
        results.push(result);
    }

    let path = write_summary(results_dir, results)?;
    println!("wrote {}", path.display());
    Ok(())
}

/// Print aggregate figures from a previous run's `summary.json`.
pub fn report(results_dir: &Path) -> Result<()> {
    let summary = load_summary(results_dir)?;
    let agg = aggregate(&summary);
    println!(
        "report: runs={} passed={} failed={}",
        agg.runs, agg.passed, agg.failed
    );
    if let Some(avg) = agg.avg_attempts {
        println!("report: avg_attempts={avg:.2}");
    }
    for case in summary.cases.iter().filter(|c| !c.passed) {
        println!("report: failed {}: {}", case.id, case.summary);
    }
    Ok(())
}
