//! Structural parser for openHAB Rules-DSL text.
//!
//! Extracts just enough structure for conflict detection and per-rule
//! persistence: rule names, `when`/`then` clauses, and the items referenced
//! in each. This is not a grammar checker; syntax validation is the LLM
//! validator's job.

use std::sync::LazyLock;

use regex::Regex;

static RULE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)rule\s+"([^"]+)""#).unwrap());
static WHEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bwhen\b(.*?)\bthen\b").unwrap());
static THEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bthen\b(.*?)\bend\b").unwrap());
static ITEM_TRIGGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Item\s+(\w+)\s+(?:changed|received)").unwrap());
static SEND_COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)sendCommand\s*\(\s*(\w+)").unwrap());
static POST_UPDATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)postUpdate\s*\(\s*(\w+)").unwrap());
static ITEM_STATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\w+)\.state").unwrap());
static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^```.*$").unwrap());

/// Structured view of one parsed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRule {
    pub name: String,
    /// Original rule text, fences stripped.
    pub raw_text: String,
    /// Items referenced in the `when` clause.
    pub trigger_items: Vec<String>,
    /// Items referenced in the `then` clause.
    pub action_items: Vec<String>,
    /// Union of trigger and action items, sorted.
    pub all_items: Vec<String>,
}

/// Parse a single rule block. Returns `None` when the text contains no
/// `rule "..."` header.
pub fn parse_rule(rule_text: &str) -> Option<ParsedRule> {
    let rule_text = rule_text.trim();
    let name = RULE_NAME_RE.captures(rule_text)?.get(1)?.as_str().to_string();

    let when_clause = WHEN_RE
        .captures(rule_text)
        .and_then(|c| c.get(1))
        .map_or("", |m| m.as_str());
    let then_clause = THEN_RE
        .captures(rule_text)
        .and_then(|c| c.get(1))
        .map_or("", |m| m.as_str());

    let trigger_items = extract_trigger_items(when_clause);
    let action_items = extract_action_items(then_clause);

    let mut all_items: Vec<String> = trigger_items
        .iter()
        .chain(action_items.iter())
        .cloned()
        .collect();
    all_items.sort();
    all_items.dedup();

    Some(ParsedRule {
        name,
        raw_text: rule_text.to_string(),
        trigger_items,
        action_items,
        all_items,
    })
}

/// Parse every rule in a multi-rule blob, stripping markdown code fences.
pub fn parse_rules_text(content: &str) -> Vec<ParsedRule> {
    let cleaned = CODE_FENCE_RE.replace_all(content, "");
    split_rule_blocks(&cleaned)
        .into_iter()
        .filter_map(|block| parse_rule(&block))
        .collect()
}

/// Split on `rule "` headers, keeping the header with its block.
fn split_rule_blocks(content: &str) -> Vec<String> {
    static SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?i)\brule\s+""#).unwrap());
    let starts: Vec<usize> = SPLIT_RE.find_iter(content).map(|m| m.start()).collect();
    if starts.is_empty() {
        return Vec::new();
    }
    let mut blocks = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(content.len());
        blocks.push(content[start..end].trim().to_string());
    }
    blocks
}

fn extract_trigger_items(when_clause: &str) -> Vec<String> {
    let mut items: Vec<String> = ITEM_TRIGGER_RE
        .captures_iter(when_clause)
        .chain(ITEM_STATE_RE.captures_iter(when_clause))
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect();
    items.sort();
    items.dedup();
    items
}

fn extract_action_items(then_clause: &str) -> Vec<String> {
    let mut items: Vec<String> = SEND_COMMAND_RE
        .captures_iter(then_clause)
        .chain(POST_UPDATE_RE.captures_iter(then_clause))
        .chain(ITEM_STATE_RE.captures_iter(then_clause))
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect();
    items.sort();
    items.dedup();
    items
}
