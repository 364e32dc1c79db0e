//! The generate → validate orchestration loop.
//!
//! One run performs up to `max_attempts` cycles of: build prompt (with all
//! feedback so far) → generate a candidate → syntax-validate → optionally
//! context-validate. Failed verdicts append feedback for the next cycle.
//! The last candidate is returned whether or not validation succeeded; the
//! caller persists it unconditionally and only deploys on success.

use anyhow::{Result, anyhow};
use tracing::{info, warn};

use crate::agents::generator::{self, Candidate};
use crate::agents::{context, syntax};
use crate::core::phase::Phase;
use crate::core::verdict::Verdict;
use crate::io::llm::LlmClient;
use crate::io::prompt::PromptBuilder;

/// Options for one orchestrator run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Attempt budget, >= 1.
    pub max_attempts: u32,
    /// Run context validation when a snapshot is attached to the builder.
    pub context_validation: bool,
    /// Treat context-validator warnings as blocking.
    pub block_on_warnings: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            context_validation: true,
            block_on_warnings: false,
        }
    }
}

/// Result of one orchestrator run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final candidate (the last attempt's output), to be persisted
    /// regardless of `passed`.
    pub candidate: Candidate,
    /// Verdict of the last validation step that ran.
    pub verdict: Verdict,
    /// True when the final candidate passed every enabled validation.
    pub passed: bool,
    /// Generation attempts performed.
    pub attempts_used: u32,
    /// Terminal loop state.
    pub phase: Phase,
}

/// Drive the loop to a terminal [`Phase`].
///
/// Errors only when no candidate was ever produced (every generation call
/// failed at the transport level); any produced candidate is returned so it
/// can be persisted.
pub fn run_generation_loop<C: LlmClient>(
    llm: &C,
    builder: &mut PromptBuilder,
    options: &RunOptions,
) -> Result<RunOutcome> {
    if options.max_attempts == 0 {
        return Err(anyhow!("attempt budget must be >= 1"));
    }
    let context_enabled = options.context_validation && builder.has_snapshot();
    if options.context_validation && !builder.has_snapshot() {
        warn!("context validation requested but no snapshot available, skipping");
    }

    let mut last_candidate: Option<Candidate> = None;
    let mut last_verdict: Option<Verdict> = None;

    for attempt in 1..=options.max_attempts {
        let attempts_remain = attempt < options.max_attempts;
        info!(attempt, max_attempts = options.max_attempts, "generation attempt");

        let candidate = match generator::generate(llm, builder) {
            Ok(candidate) => candidate,
            Err(err) => {
                // Transport failure consumes the attempt; retry while budget remains.
                warn!(attempt, "generation failed: {err:#}");
                continue;
            }
        };
        last_candidate = Some(candidate.clone());

        let mut verdict = match syntax::validate(llm, builder, &candidate.code) {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(attempt, "syntax validation failed: {err:#}");
                continue;
            }
        };
        last_verdict = Some(verdict.clone());

        if verdict.passed {
            info!(attempt, "syntax validator: PASS");
        } else {
            info!(attempt, "syntax validator: FAIL");
            builder.add_feedback(
                format!("syntax_validator attempt {attempt}"),
                &verdict.as_feedback_entry(),
            );
        }
        let mut phase =
            Phase::SyntaxChecking.after_verdict(verdict.passed, attempts_remain, context_enabled);

        if phase == Phase::ContextChecking {
            verdict = match context::validate(llm, builder, &candidate.code, options.block_on_warnings)
            {
                Ok(verdict) => verdict,
                Err(err) => {
                    warn!(attempt, "context validation failed: {err:#}");
                    continue;
                }
            };
            last_verdict = Some(verdict.clone());

            if verdict.passed {
                info!(attempt, "context validator: PASS");
                if !verdict.warnings.is_empty() {
                    warn!(warnings = ?verdict.warnings, "context validator warnings");
                }
            } else {
                info!(attempt, "context validator: FAIL");
                builder.add_feedback(
                    format!("context_validator attempt {attempt}"),
                    &verdict.as_feedback_entry(),
                );
            }
            phase = Phase::ContextChecking.after_verdict(verdict.passed, attempts_remain, false);
        }

        if phase == Phase::Succeeded {
            return Ok(RunOutcome {
                candidate,
                verdict,
                passed: true,
                attempts_used: attempt,
                phase,
            });
        }
        // Phase::Generating loops back for another attempt; ExhaustedFailed
        // falls out below.
    }

    // Budget exhausted: a defined terminal state, not an error, as long as
    // something was generated to persist.
    let candidate = last_candidate.ok_or_else(|| {
        anyhow!(
            "no candidate produced within {} attempts",
            options.max_attempts
        )
    })?;
    let verdict = last_verdict.unwrap_or_else(|| Verdict {
        passed: false,
        summary: "Validation did not complete.".to_string(),
        feedback: String::new(),
        fixes: Vec::new(),
        warnings: Vec::new(),
        raw_output: String::new(),
    });
    info!(
        max_attempts = options.max_attempts,
        "attempt budget exhausted without validator approval, keeping last candidate"
    );
    Ok(RunOutcome {
        candidate,
        verdict,
        passed: false,
        attempts_used: options.max_attempts,
        phase: Phase::ExhaustedFailed,
    })
}
