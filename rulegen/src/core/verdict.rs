//! Fixed-shape verdicts produced by the LLM validators.
//!
//! Model replies are expected to be a bare JSON object with `verdict`,
//! `summary`, optional `feedback`, `fixes`, and `warnings`. Anything that
//! does not survive schema validation is downgraded to a failed verdict with
//! a generic feedback string; parsing never aborts the run.

use std::sync::LazyLock;

use jsonschema::{Draft, Validator};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const VERDICT_SCHEMA: &str = include_str!("../schemas/verdict.schema.json");

static SCHEMA: LazyLock<Validator> = LazyLock::new(|| {
    let schema: Value =
        serde_json::from_str(VERDICT_SCHEMA).expect("embedded verdict schema should be valid JSON");
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .expect("embedded verdict schema should compile")
});

/// Result of one validation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub passed: bool,
    pub summary: String,
    pub feedback: String,
    pub fixes: Vec<String>,
    /// Non-blocking observations; only populated by the context validator.
    pub warnings: Vec<String>,
    /// Verbatim model reply, kept for diagnostics.
    pub raw_output: String,
}

impl Verdict {
    /// Fallback verdict for replies that do not conform to the schema.
    pub fn unparseable(raw_output: &str) -> Self {
        Self {
            passed: false,
            summary: "Validator response could not be parsed.".to_string(),
            feedback: raw_output.trim().to_string(),
            fixes: Vec::new(),
            warnings: Vec::new(),
            raw_output: raw_output.to_string(),
        }
    }

    /// Format the verdict as one feedback-log entry for the next prompt.
    pub fn as_feedback_entry(&self) -> String {
        if self.passed {
            if self.warnings.is_empty() {
                return self.summary.clone();
            }
            let mut lines = vec![self.summary.clone(), "Warnings:".to_string()];
            lines.extend(self.warnings.iter().map(|w| format!("  - {w}")));
            return lines.join("\n");
        }
        let mut lines = vec![self.summary.clone()];
        if !self.feedback.is_empty() {
            lines.push(self.feedback.clone());
        }
        if !self.fixes.is_empty() {
            lines.push("Suggested fixes:".to_string());
            lines.extend(self.fixes.iter().map(|fix| format!("  - {fix}")));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    verdict: String,
    summary: String,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    fixes: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

/// Parse a model reply into a [`Verdict`].
///
/// Markdown fences are stripped before parsing. A reply that fails JSON
/// parsing or schema validation yields [`Verdict::unparseable`].
pub fn parse_verdict(raw: &str) -> Verdict {
    let cleaned = strip_fences(raw);
    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(err) => {
            debug!(%err, "verdict reply is not JSON");
            return Verdict::unparseable(raw);
        }
    };
    if let Some(err) = SCHEMA.iter_errors(&value).next() {
        debug!(%err, "verdict reply failed schema validation");
        return Verdict::unparseable(raw);
    }
    // Schema validation guarantees the shape below.
    let parsed: RawVerdict = match serde_json::from_value(value) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!(%err, "verdict reply failed struct mapping");
            return Verdict::unparseable(raw);
        }
    };
    Verdict {
        passed: parsed.verdict.eq_ignore_ascii_case("valid"),
        summary: parsed.summary,
        feedback: parsed.feedback,
        fixes: parsed.fixes,
        warnings: parsed.warnings,
        raw_output: raw.to_string(),
    }
}

/// Remove surrounding markdown code fences and stray backticks.
pub fn strip_fences(raw: &str) -> String {
    raw.trim()
        .trim_matches('`')
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_passing_verdict() {
        let verdict = parse_verdict(r#"{"verdict":"valid","summary":"Looks good."}"#);
        assert!(verdict.passed);
        assert_eq!(verdict.summary, "Looks good.");
        assert!(verdict.feedback.is_empty());
    }

    #[test]
    fn parses_failing_verdict_with_fixes() {
        let raw = r#"{"verdict":"invalid","summary":"Missing then block.","feedback":"The rule has no then clause.","fixes":["Add a then block"]}"#;
        let verdict = parse_verdict(raw);
        assert!(!verdict.passed);
        let entry = verdict.as_feedback_entry();
        assert!(entry.contains("Missing then block."));
        assert!(entry.contains("Add a then block"));
    }

    #[test]
    fn tolerates_markdown_fences() {
        let raw = "```json\n{\"verdict\":\"valid\",\"summary\":\"ok\"}\n```";
        let verdict = parse_verdict(raw);
        assert!(verdict.passed);
    }

    #[test]
    fn non_json_reply_downgrades_to_failed_verdict() {
        let verdict = parse_verdict("I think the rule is probably fine.");
        assert!(!verdict.passed);
        assert_eq!(verdict.summary, "Validator response could not be parsed.");
        assert!(verdict.feedback.contains("probably fine"));
    }

    #[test]
    fn wrong_shape_downgrades_to_failed_verdict() {
        // `verdict` must be valid/invalid per the schema.
        let verdict = parse_verdict(r#"{"verdict":"maybe","summary":"hmm"}"#);
        assert!(!verdict.passed);
        assert_eq!(verdict.summary, "Validator response could not be parsed.");
    }

    #[test]
    fn passing_verdict_with_warnings_renders_them() {
        let raw = r#"{"verdict":"valid","summary":"ok","warnings":["Thing offline"]}"#;
        let verdict = parse_verdict(raw);
        assert!(verdict.passed);
        let entry = verdict.as_feedback_entry();
        assert!(entry.contains("Warnings:"));
        assert!(entry.contains("Thing offline"));
    }
}
