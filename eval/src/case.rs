//! Dataset parsing and validation.
//!
//! A dataset is a JSON array of cases, each pairing a slug id with a
//! natural-language automation request.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// One evaluation case.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Case {
    /// Unique identifier (slug format: `[a-z0-9_-]+`).
    pub id: String,
    /// The automation request passed to the generator.
    pub text: String,
}

/// Load and validate a dataset file.
pub fn load_dataset(path: &Path) -> Result<Vec<Case>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read dataset {}", path.display()))?;
    let cases: Vec<Case> = serde_json::from_str(&contents)
        .with_context(|| format!("parse dataset {}", path.display()))?;
    validate(&cases).with_context(|| format!("validate dataset {}", path.display()))?;
    Ok(cases)
}

fn validate(cases: &[Case]) -> Result<()> {
    if cases.is_empty() {
        bail!("dataset contains no cases");
    }
    let mut seen = BTreeSet::new();
    for case in cases {
        if case.id.is_empty()
            || !case
                .id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            bail!("case id {:?} is not a slug", case.id);
        }
        if !seen.insert(case.id.as_str()) {
            bail!("duplicate case id {:?}", case.id);
        }
        if case.text.trim().is_empty() {
            bail!("case {} has an empty request", case.id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(contents: &str) -> Result<Vec<Case>> {
        let cases: Vec<Case> = serde_json::from_str(contents)?;
        validate(&cases)?;
        Ok(cases)
    }

    #[test]
    fn parses_valid_dataset() {
        let cases = parse(
            r#"[
                {"id": "motion_light", "text": "turn on the light when motion is detected"},
                {"id": "door-alarm", "text": "sound the alarm when the door opens"}
            ]"#,
        )
        .expect("dataset");
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].id, "motion_light");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = parse(r#"[{"id":"a","text":"x"},{"id":"a","text":"y"}]"#).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_non_slug_ids() {
        let err = parse(r#"[{"id":"Bad Id","text":"x"}]"#).unwrap_err();
        assert!(err.to_string().contains("not a slug"));
    }

    #[test]
    fn rejects_empty_dataset() {
        let err = parse("[]").unwrap_err();
        assert!(err.to_string().contains("no cases"));
    }
}
