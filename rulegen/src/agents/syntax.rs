//! Syntax validator: structural verdict on a candidate rule.

use anyhow::{Context, Result};
use tracing::instrument;

use crate::core::verdict::{Verdict, parse_verdict};
use crate::io::llm::{ChatRequest, LlmClient};
use crate::io::prompt::PromptBuilder;

const SYSTEM_PROMPT: &str = "You are an openHAB Rules-DSL validator. Given a user request, \
supporting context, and candidate code, determine whether the code is structurally ready: \
complete when/then/end blocks, known trigger forms, well-formed actions, no undefined \
constructs, no glaring logic issues. \
Respond strictly as a JSON object with keys: 'verdict' ('valid' or 'invalid'), \
'summary' (short sentence), 'feedback' (string, may be empty), and optional \
'fixes' (array of strings). Do not include markdown, code fences, or additional commentary.";

const TEMPERATURE: f32 = 0.0;

/// Run syntax validation on `candidate`.
///
/// A malformed model reply becomes a failed verdict, never an error.
#[instrument(skip_all)]
pub fn validate<C: LlmClient>(
    llm: &C,
    builder: &PromptBuilder,
    candidate: &str,
) -> Result<Verdict> {
    let user = builder.render_syntax(candidate)?;
    let reply = llm
        .complete(&ChatRequest::new(SYSTEM_PROMPT, user, TEMPERATURE))
        .context("syntax validation call")?;
    Ok(parse_verdict(&reply))
}
