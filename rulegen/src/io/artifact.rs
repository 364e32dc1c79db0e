//! Persistence of generated rule files.
//!
//! Exactly one persist happens per run, after the loop concludes, regardless
//! of the validation outcome. Candidates that parse into multiple rules are
//! written one file per rule; unparseable output is saved raw so nothing is
//! ever lost.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use crate::core::rule::{ParsedRule, parse_rules_text};

/// Convert a rule name to a safe snake_case filename stem.
pub fn sanitize_rule_name(name: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .filter(|c| *c != '"' && *c != '\'')
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .replace(' ', "_")
        .to_lowercase();
    while cleaned.contains("__") {
        cleaned = cleaned.replace("__", "_");
    }
    cleaned.trim_matches('_').to_string()
}

/// Write one rule file atomically (temp file + rename).
pub fn save_rule(code: &str, dir: &Path, filename: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create output dir {}", dir.display()))?;
    let path = dir.join(filename);
    let tmp_path = path.with_extension("rules.tmp");
    let mut contents = code.trim().to_string();
    contents.push('\n');
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp rule {}", tmp_path.display()))?;
    fs::rename(&tmp_path, &path)
        .with_context(|| format!("replace rule file {}", path.display()))?;
    Ok(path)
}

/// A rule persisted to disk.
#[derive(Debug, Clone)]
pub struct SavedRule {
    pub name: String,
    pub path: PathBuf,
    pub code: String,
}

/// Parse the candidate and save each rule to its own `.rules` file.
///
/// Falls back to a single raw file when no rule headers parse.
pub fn save_rules_individually(
    code: &str,
    dir: &Path,
    prefix: Option<&str>,
) -> Result<Vec<SavedRule>> {
    let rules = parse_rules_text(code);

    if rules.is_empty() {
        let filename = match prefix {
            Some(prefix) => format!("{prefix}.rules"),
            None => "generated.rules".to_string(),
        };
        warn!(filename, "no parseable rules found, saving raw candidate");
        let path = save_rule(code, dir, &filename)?;
        return Ok(vec![SavedRule {
            name: filename.trim_end_matches(".rules").to_string(),
            path,
            code: code.trim().to_string(),
        }]);
    }

    let mut saved = Vec::with_capacity(rules.len());
    for (idx, rule) in rules.iter().enumerate() {
        let mut stem = sanitize_rule_name(&rule.name);
        if stem.is_empty() {
            stem = format!("rule_{}", idx + 1);
        }
        let filename = match prefix {
            Some(prefix) => format!("{prefix}_{stem}.rules"),
            None => format!("{stem}.rules"),
        };
        let path = save_rule(&rule.raw_text, dir, &filename)?;
        saved.push(SavedRule {
            name: rule.name.clone(),
            path,
            code: rule.raw_text.clone(),
        });
    }
    Ok(saved)
}

/// Parse all `.rules` files in `dir` (previously generated artifacts).
///
/// Unreadable files are skipped with a warning; a missing directory is just
/// an empty list.
pub fn load_local_rules(dir: &Path) -> Vec<ParsedRule> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "rules"))
        .collect();
    paths.sort();

    let mut rules = Vec::new();
    for path in paths {
        match fs::read_to_string(&path) {
            Ok(content) => rules.extend(parse_rules_text(&content)),
            Err(err) => warn!(path = %path.display(), %err, "could not read local rules file"),
        }
    }
    rules
}
