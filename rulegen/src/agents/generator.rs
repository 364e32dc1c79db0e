//! Policy generator: turns the assembled prompt into one candidate rule.

use anyhow::{Context, Result};
use tracing::instrument;

use crate::io::llm::{ChatRequest, LlmClient};
use crate::io::prompt::PromptBuilder;

const SYSTEM_PROMPT: &str = "You are an expert openHAB policy engineer creating Rules-DSL rules. \
Rely on the supplied context snippets summarising syntax, grammar, and examples. \
Incorporate prior validator feedback when present. \
Respond with openHAB code only, no markdown and no commentary.";

const TEMPERATURE: f32 = 0.0;

/// One generation attempt's output. Superseded by each subsequent attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub code: String,
}

/// Request one candidate from the model.
///
/// No retry logic here; a transport failure is the orchestrator's problem.
#[instrument(skip_all)]
pub fn generate<C: LlmClient>(llm: &C, builder: &PromptBuilder) -> Result<Candidate> {
    let user = builder.render_generator()?;
    let reply = llm
        .complete(&ChatRequest::new(SYSTEM_PROMPT, user, TEMPERATURE))
        .context("policy generation call")?;
    Ok(Candidate {
        code: strip_code_fences(&reply),
    })
}

/// Drop surrounding markdown fence lines the model sometimes adds anyway.
fn strip_code_fences(reply: &str) -> String {
    let trimmed = reply.trim();
    let lines: Vec<&str> = trimmed.lines().collect();
    let body: &[&str] = match (lines.first(), lines.last()) {
        (Some(first), Some(last))
            if lines.len() >= 2 && first.starts_with("```") && last.starts_with("```") =>
        {
            &lines[1..lines.len() - 1]
        }
        _ => &lines,
    };
    body.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_code_is_untouched() {
        let code = "rule \"X\"\nwhen\nthen\nend";
        assert_eq!(strip_code_fences(code), code);
    }

    #[test]
    fn fenced_code_is_unwrapped() {
        let reply = "```openhab\nrule \"X\"\nwhen\nthen\nend\n```";
        assert_eq!(strip_code_fences(reply), "rule \"X\"\nwhen\nthen\nend");
    }

    #[test]
    fn lone_fence_line_is_not_eaten() {
        assert_eq!(strip_code_fences("```"), "```");
    }
}
