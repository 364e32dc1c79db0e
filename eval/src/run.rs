//! Driving the generation loop for one dataset case.
//!
//! Each case runs the same loop the CLI runs, minus live-controller access;
//! baseline mode cuts retrieval and retries down to a single unaided shot so
//! loop and corpus contributions can be measured against it.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use rulegen::core::retrieval::TOP_K;
use rulegen::generate::{RunOptions, run_generation_loop};
use rulegen::io::artifact::save_rules_individually;
use rulegen::io::corpus::Corpus;
use rulegen::io::llm::LlmClient;
use rulegen::io::prompt::PromptBuilder;

use crate::case::Case;

/// Per-case run configuration.
#[derive(Debug, Clone)]
pub struct CaseOptions {
    pub max_attempts: u32,
    /// Single-shot mode: one attempt, no retrieval snippets.
    pub baseline: bool,
}

/// Outcome of one case, persisted into `summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseResult {
    pub id: String,
    pub request: String,
    pub passed: bool,
    pub attempts: u32,
    pub summary: String,
    /// Paths of the persisted rule files.
    pub artifacts: Vec<String>,
    pub started_at: String,
    pub finished_at: String,
}

/// Run one case and persist its rule files under `results_dir`.
pub fn run_case<C: LlmClient>(
    llm: &C,
    corpus: &Corpus,
    case: &Case,
    results_dir: &Path,
    options: &CaseOptions,
) -> Result<CaseResult> {
    let started_at = Utc::now();
    let snippets = if options.baseline {
        Vec::new()
    } else {
        corpus.top_snippets(&case.text, TOP_K)
    };
    let mut builder = PromptBuilder::new(&case.text, snippets);

    let run_options = RunOptions {
        max_attempts: if options.baseline {
            1
        } else {
            options.max_attempts
        },
        context_validation: false,
        block_on_warnings: false,
    };
    let outcome = run_generation_loop(llm, &mut builder, &run_options)?;

    let saved = save_rules_individually(&outcome.candidate.code, results_dir, Some(&case.id))?;
    let finished_at = Utc::now();
    info!(
        case_id = %case.id,
        passed = outcome.passed,
        attempts = outcome.attempts_used,
        "case finished"
    );

    Ok(CaseResult {
        id: case.id.clone(),
        request: case.text.clone(),
        passed: outcome.passed,
        attempts: outcome.attempts_used,
        summary: outcome.verdict.summary,
        artifacts: saved
            .iter()
            .map(|rule| rule.path.display().to_string())
            .collect(),
        started_at: started_at.to_rfc3339(),
        finished_at: finished_at.to_rfc3339(),
    })
}
