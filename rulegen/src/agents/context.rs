//! Context validator: checks a candidate against the live system snapshot.
//!
//! Covers entity existence, type compatibility, conflicts with existing
//! rules, and a set of safety heuristics. Warnings are non-blocking unless
//! the warnings-block toggle is set.

use anyhow::{Context, Result};
use tracing::instrument;

use crate::core::verdict::{Verdict, parse_verdict};
use crate::io::llm::{ChatRequest, LlmClient};
use crate::io::prompt::PromptBuilder;

const SYSTEM_PROMPT: &str = "You are an expert openHAB automation validation and safety \
specialist. Validate the candidate Rules-DSL rule against the LIVE SYSTEM STATE:\n\
1. Every referenced item must exist in the system.\n\
2. Item types must be compatible with the actions attempted (a Switch cannot receive a \
dim percentage; use a Dimmer).\n\
3. No duplicate trigger conditions versus existing rules.\n\
4. No contradictory actions versus existing rules.\n\
5. Flag dangerous automation patterns: simultaneous heating and cooling, rule chains \
that trigger each other without a terminating condition, water-control actions without \
safeguards, lock/unlock conflicts.\n\
Blocking problems go in 'feedback' and make the verdict 'invalid'; non-blocking \
observations go in 'warnings'.\n\
Respond strictly as a JSON object with keys: 'verdict' ('valid' or 'invalid'), \
'summary' (short sentence), 'feedback' (string, may be empty), 'fixes' (array of \
strings), 'warnings' (array of strings). Do not include markdown, code fences, or \
additional commentary.";

const TEMPERATURE: f32 = 0.3;

/// Run context validation on `candidate`.
///
/// With `block_on_warnings` set, a passing verdict that carries warnings is
/// downgraded to a failed one so warnings also block deployment.
#[instrument(skip_all, fields(block_on_warnings))]
pub fn validate<C: LlmClient>(
    llm: &C,
    builder: &PromptBuilder,
    candidate: &str,
    block_on_warnings: bool,
) -> Result<Verdict> {
    let user = builder.render_context(candidate)?;
    let reply = llm
        .complete(&ChatRequest::new(SYSTEM_PROMPT, user, TEMPERATURE))
        .context("context validation call")?;
    let mut verdict = parse_verdict(&reply);
    if block_on_warnings && verdict.passed && !verdict.warnings.is_empty() {
        verdict.passed = false;
        verdict.summary = format!("{} (blocked by warnings)", verdict.summary);
        if verdict.feedback.is_empty() {
            verdict.feedback = verdict.warnings.join("\n");
        }
    }
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedLlm;

    #[test]
    fn warnings_pass_by_default() {
        let llm = ScriptedLlm::new(vec![
            r#"{"verdict":"valid","summary":"ok","warnings":["Thing offline"]}"#.to_string(),
        ]);
        let builder = PromptBuilder::new("req", Vec::new());
        let verdict = validate(&llm, &builder, "rule", false).expect("validate");
        assert!(verdict.passed);
        assert_eq!(verdict.warnings.len(), 1);
    }

    #[test]
    fn warnings_block_when_toggled() {
        let llm = ScriptedLlm::new(vec![
            r#"{"verdict":"valid","summary":"ok","warnings":["Thing offline"]}"#.to_string(),
        ]);
        let builder = PromptBuilder::new("req", Vec::new());
        let verdict = validate(&llm, &builder, "rule", true).expect("validate");
        assert!(!verdict.passed);
        assert!(verdict.summary.contains("blocked by warnings"));
        assert!(verdict.feedback.contains("Thing offline"));
    }
}
