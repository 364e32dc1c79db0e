//! Natural-language to openHAB rule generation CLI.
//!
//! Takes an automation request in plain English, runs the bounded
//! generate → validate loop against a hosted LLM, persists the final
//! candidate under the output directory, and optionally deploys validated
//! rules to a configured endpoint.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::{info, warn};

use rulegen::core::retrieval::TOP_K;
use rulegen::generate::{RunOptions, RunOutcome, run_generation_loop};
use rulegen::io::artifact::{SavedRule, save_rules_individually};
use rulegen::io::controller::{BridgeFetcher, RestFetcher, fetch_snapshot};
use rulegen::io::corpus::Corpus;
use rulegen::io::deploy::{DeployPayload, deploy_rule};
use rulegen::io::llm::OpenAiClient;
use rulegen::io::prompt::PromptBuilder;
use rulegen::io::settings::Settings;
use rulegen::{exit_codes, logging};

#[derive(Parser)]
#[command(
    name = "rulegen",
    version,
    about = "Generate validated openHAB Rules-DSL files from natural language"
)]
struct Cli {
    /// The automation request, e.g. "turn on the hallway light when motion is detected".
    #[arg(required = true, num_args = 1..)]
    request: Vec<String>,

    /// Filename prefix for the persisted rule files.
    #[arg(long)]
    out: Option<String>,

    /// Attempt budget for the generation loop (overrides RULEGEN_MAX_ATTEMPTS).
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Skip context validation even when a controller is configured.
    #[arg(long)]
    no_context_validation: bool,

    /// Directory for generated rule files (overrides RULEGEN_OUTPUT_DIR).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Directory holding the documentation corpus (overrides RULEGEN_CONTEXT_DIR).
    #[arg(long)]
    context_dir: Option<PathBuf>,
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::INVALID);
    }
    std::process::exit(exit_codes::OK);
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let request = cli.request.join(" ").trim().to_string();
    if request.is_empty() {
        bail!("the automation request must not be empty");
    }

    let settings = Settings::from_env()?;
    let output_dir = cli
        .output_dir
        .unwrap_or_else(|| PathBuf::from(&settings.output_dir));
    let context_dir = cli
        .context_dir
        .unwrap_or_else(|| PathBuf::from(&settings.context_dir));
    let max_attempts = cli.max_attempts.unwrap_or(settings.max_attempts);
    if max_attempts == 0 {
        bail!("--max-attempts must be >= 1");
    }

    let corpus = Corpus::load(&context_dir)?;
    let snippets = corpus.top_snippets(&request, TOP_K);
    info!(snippets = snippets.len(), "retrieved documentation snippets");

    let mut builder = PromptBuilder::new(&request, snippets);

    let context_validation = !cli.no_context_validation;
    let mut context_skipped = false;
    if context_validation && settings.snapshot_configured() {
        match fetch_configured_snapshot(&settings, &output_dir) {
            Ok(snapshot) => builder.set_snapshot(snapshot),
            Err(err) => {
                warn!("could not fetch system snapshot, skipping context validation and deployment: {err:#}");
                context_skipped = true;
            }
        }
    }

    let llm = OpenAiClient::new(&settings)?;
    let options = RunOptions {
        max_attempts,
        context_validation,
        block_on_warnings: settings.block_on_warnings,
    };
    let outcome = run_generation_loop(&llm, &mut builder, &options)?;

    let saved = save_rules_individually(&outcome.candidate.code, &output_dir, cli.out.as_deref())?;
    report(&outcome, &saved);

    if outcome.passed {
        if let Some(deploy) = &settings.deploy {
            // A rule the context validator never saw must not reach a live
            // system.
            if context_skipped {
                warn!("deployment skipped: context validation was configured but did not run");
            } else {
                for rule in &saved {
                    let payload = DeployPayload::new(&rule.name, &rule.code, &request);
                    let result = deploy_rule(deploy, &payload)?;
                    if result.success {
                        println!("deployed {}: {}", rule.name, result.message);
                    } else {
                        eprintln!("deploy failed for {}: {}", rule.name, result.message);
                    }
                }
            }
        }
    }

    Ok(())
}

fn fetch_configured_snapshot(
    settings: &Settings,
    rules_dir: &std::path::Path,
) -> Result<rulegen::core::snapshot::SystemSnapshot> {
    if let Some(controller) = &settings.controller {
        let fetcher = RestFetcher::new(controller)?;
        return fetch_snapshot(&fetcher, rules_dir);
    }
    if let Some(bridge) = &settings.bridge {
        let fetcher = BridgeFetcher::new(bridge);
        return fetch_snapshot(&fetcher, rules_dir);
    }
    bail!("no snapshot transport configured")
}

fn report(outcome: &RunOutcome, saved: &[SavedRule]) {
    let status = if outcome.passed {
        "VALIDATED"
    } else {
        "NOT VALIDATED"
    };
    println!(
        "{status} after {} attempt(s): {}",
        outcome.attempts_used, outcome.verdict.summary
    );
    if !outcome.verdict.warnings.is_empty() {
        for warning in &outcome.verdict.warnings {
            println!("warning: {warning}");
        }
    }
    for rule in saved {
        println!("saved {}", rule.path.display());
    }
}
