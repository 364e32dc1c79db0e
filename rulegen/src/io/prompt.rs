//! Prompt assembly for the generator and validator agents.
//!
//! Templates render into marked sections; a byte budget drops droppable
//! sections first (snapshot, then snippets) and truncates the tail as a last
//! resort. The request, candidate, and feedback sections are never dropped,
//! so feedback accumulated across attempts always reaches the model.

use std::sync::LazyLock;

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::debug;

use crate::core::feedback::FeedbackLog;
use crate::core::retrieval::Snippet;
use crate::core::rule::parse_rules_text;
use crate::core::snapshot::SystemSnapshot;

const GENERATOR_TEMPLATE: &str = include_str!("prompts/generator.md");
const SYNTAX_TEMPLATE: &str = include_str!("prompts/syntax.md");
const CONTEXT_TEMPLATE: &str = include_str!("prompts/context.md");

/// Default prompt budget in bytes.
pub const DEFAULT_BUDGET_BYTES: usize = 40_000;

static ENGINE: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.add_template("generator", GENERATOR_TEMPLATE)
        .expect("generator template should be valid");
    env.add_template("syntax", SYNTAX_TEMPLATE)
        .expect("syntax template should be valid");
    env.add_template("context", CONTEXT_TEMPLATE)
        .expect("context template should be valid");
    env
});

#[derive(Debug, Clone, Serialize)]
struct SnippetContext {
    source: String,
    text: String,
}

/// Collects retrieval context, the optional snapshot rendering, and
/// validator feedback; renders per-target prompts.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    request: String,
    snippets: Vec<SnippetContext>,
    snapshot: Option<SystemSnapshot>,
    feedback: FeedbackLog,
    budget_bytes: usize,
}

impl PromptBuilder {
    pub fn new(request: &str, snippets: Vec<Snippet>) -> Self {
        Self {
            request: request.trim().to_string(),
            snippets: snippets
                .into_iter()
                .map(|s| SnippetContext {
                    source: s.source,
                    text: s.text,
                })
                .collect(),
            snapshot: None,
            feedback: FeedbackLog::new(),
            budget_bytes: DEFAULT_BUDGET_BYTES,
        }
    }

    pub fn with_budget(mut self, budget_bytes: usize) -> Self {
        self.budget_bytes = budget_bytes;
        self
    }

    /// Attach the system snapshot for generator/context prompts.
    pub fn set_snapshot(&mut self, snapshot: SystemSnapshot) {
        self.snapshot = Some(snapshot);
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Record validator feedback for subsequent attempts.
    pub fn add_feedback(&mut self, source: impl Into<String>, message: &str) {
        self.feedback.add(source, message);
    }

    pub fn feedback(&self) -> &FeedbackLog {
        &self.feedback
    }

    pub fn request(&self) -> &str {
        &self.request
    }

    /// User prompt for the policy generator.
    pub fn render_generator(&self) -> Result<String> {
        let template = ENGINE.get_template("generator")?;
        let rendered = template.render(context! {
            request => self.request,
            snippets => (!self.snippets.is_empty()).then_some(&self.snippets),
            snapshot => self.snapshot.as_ref().map(|s| s.render_for_prompt(&[])),
            feedback => self.feedback.render(),
        })?;
        Ok(self.apply_budget(&rendered))
    }

    /// User prompt for the syntax validator.
    pub fn render_syntax(&self, candidate: &str) -> Result<String> {
        let template = ENGINE.get_template("syntax")?;
        let rendered = template.render(context! {
            request => self.request,
            snippets => (!self.snippets.is_empty()).then_some(&self.snippets),
            feedback => self.feedback.render(),
            candidate => candidate.trim(),
        })?;
        Ok(self.apply_budget(&rendered))
    }

    /// User prompt for the context validator.
    ///
    /// The snapshot is rendered against the items the candidate actually
    /// references, so missing entities are called out explicitly.
    pub fn render_context(&self, candidate: &str) -> Result<String> {
        let referenced: Vec<String> = parse_rules_text(candidate)
            .into_iter()
            .flat_map(|rule| rule.all_items)
            .collect();
        let template = ENGINE.get_template("context")?;
        let rendered = template.render(context! {
            request => self.request,
            snapshot => self
                .snapshot
                .as_ref()
                .map(|s| s.render_for_prompt(&referenced))
                .unwrap_or_else(|| "(no snapshot available)".to_string()),
            candidate => candidate.trim(),
        })?;
        Ok(self.apply_budget(&rendered))
    }

    fn apply_budget(&self, rendered: &str) -> String {
        let mut sections = parse_sections(rendered);
        apply_budget_to_sections(&mut sections, self.budget_bytes);
        sections
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A parsed section from rendered template output.
#[derive(Debug, Clone)]
struct ParsedSection {
    key: String,
    required: bool,
    content: String,
}

/// Parse sections delimited by `<!-- section:KEY required|droppable -->`.
fn parse_sections(rendered: &str) -> Vec<ParsedSection> {
    static SECTION_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
        regex::Regex::new(r"<!--\s*section:(\w+)\s+(required|droppable)\s*-->").unwrap()
    });

    let matches: Vec<_> = SECTION_RE.captures_iter(rendered).collect();
    let mut sections = Vec::new();
    for (i, caps) in matches.iter().enumerate() {
        let key = caps.get(1).unwrap().as_str().to_string();
        let required = caps.get(2).unwrap().as_str() == "required";
        let start = caps.get(0).unwrap().end();
        let end = matches
            .get(i + 1)
            .map(|m| m.get(0).unwrap().start())
            .unwrap_or(rendered.len());
        let content = rendered[start..end].trim().to_string();
        if !content.is_empty() || required {
            sections.push(ParsedSection {
                key,
                required,
                content,
            });
        }
    }
    sections
}

/// Drop droppable sections (snapshot first, then snippets) until the budget
/// holds, then truncate the final section if still over.
fn apply_budget_to_sections(sections: &mut Vec<ParsedSection>, budget: usize) {
    let total_len =
        |secs: &[ParsedSection]| -> usize { secs.iter().map(|s| s.content.len()).sum() };

    if total_len(sections) <= budget {
        return;
    }

    for key in ["snapshot", "snippets"] {
        if total_len(sections) <= budget {
            break;
        }
        if let Some(idx) = sections.iter().position(|s| s.key == key && !s.required) {
            debug!(
                section = key,
                bytes_dropped = sections[idx].content.len(),
                "dropped prompt section for budget"
            );
            sections.remove(idx);
        }
    }

    if total_len(sections) > budget && !sections.is_empty() {
        let other_len: usize = sections
            .iter()
            .take(sections.len() - 1)
            .map(|s| s.content.len())
            .sum();
        let allowed = budget.saturating_sub(other_len);
        let last = sections.last_mut().unwrap();
        if last.content.len() > allowed {
            if allowed > 12 {
                last.content.truncate(allowed - 12);
                last.content.push_str("\n[truncated]");
            } else {
                last.content.truncate(allowed);
            }
            debug!(section = last.key, "truncated prompt section for budget");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snapshot::Item;

    fn snippet(source: &str, text: &str) -> Snippet {
        Snippet {
            source: source.to_string(),
            text: text.to_string(),
            score: 1,
        }
    }

    fn big_snapshot() -> SystemSnapshot {
        let items = (0..20)
            .map(|i| Item {
                name: format!("Device_{i:02}_{}", "x".repeat(50)),
                item_type: "Switch".to_string(),
                state: None,
                tags: Vec::new(),
            })
            .collect();
        SystemSnapshot {
            items,
            ..SystemSnapshot::default()
        }
    }

    #[test]
    fn generator_prompt_contains_request_and_feedback() {
        let mut builder = PromptBuilder::new("Turn on the light", Vec::new());
        builder.add_feedback("syntax_validator attempt 1", "missing then block");
        let prompt = builder.render_generator().expect("render");
        assert!(prompt.contains("Turn on the light"));
        assert!(prompt.contains("missing then block"));
        assert!(!prompt.contains("Documentation Snippets"));
    }

    #[test]
    fn snippets_render_with_source_labels() {
        let builder = PromptBuilder::new(
            "req",
            vec![snippet("triggers.md", "Item X changed fires on change")],
        );
        let prompt = builder.render_generator().expect("render");
        assert!(prompt.contains("triggers.md"));
        assert!(prompt.contains("Item X changed fires on change"));
    }

    #[test]
    fn empty_feedback_renders_none() {
        let builder = PromptBuilder::new("req", Vec::new());
        let prompt = builder.render_generator().expect("render");
        assert!(prompt.contains("None."));
    }

    #[test]
    fn syntax_prompt_embeds_candidate() {
        let builder = PromptBuilder::new("req", Vec::new());
        let prompt = builder
            .render_syntax("rule \"X\"\nwhen\nthen\nend")
            .expect("render");
        assert!(prompt.contains("<candidate>"));
        assert!(prompt.contains("rule \"X\""));
    }

    #[test]
    fn budget_drops_snapshot_before_snippets() {
        let mut builder = PromptBuilder::new(
            "req",
            vec![snippet("a.md", &"snippet ".repeat(20))],
        )
        .with_budget(600);
        builder.set_snapshot(big_snapshot());
        let prompt = builder.render_generator().expect("render");
        assert!(!prompt.contains("Live System State"), "snapshot dropped");
        assert!(prompt.contains("### Request"), "request kept");
        assert!(prompt.contains("Outstanding Feedback"), "feedback kept");
    }

    #[test]
    fn feedback_survives_tight_budgets() {
        let mut builder = PromptBuilder::new("req", Vec::new()).with_budget(400);
        builder.set_snapshot(big_snapshot());
        builder.add_feedback("syntax_validator attempt 1", "keep me");
        let prompt = builder.render_generator().expect("render");
        assert!(prompt.contains("keep me"));
    }

    #[test]
    fn context_prompt_requires_snapshot_text() {
        let builder = PromptBuilder::new("req", Vec::new());
        let prompt = builder.render_context("rule").expect("render");
        assert!(prompt.contains("(no snapshot available)"));
    }
}
