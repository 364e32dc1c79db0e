//! Summary persistence and aggregation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::run::CaseResult;

/// All case results from one eval run, persisted to `summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub generated_at: String,
    pub cases: Vec<CaseResult>,
}

/// Aggregate figures over one summary.
#[derive(Debug, Default, PartialEq)]
pub struct Aggregate {
    pub runs: usize,
    pub passed: usize,
    pub failed: usize,
    pub avg_attempts: Option<f64>,
}

/// Write `summary.json` into the results directory.
pub fn write_summary(results_dir: &Path, cases: Vec<CaseResult>) -> Result<PathBuf> {
    fs::create_dir_all(results_dir)
        .with_context(|| format!("create results dir {}", results_dir.display()))?;
    let summary = Summary {
        generated_at: Utc::now().to_rfc3339(),
        cases,
    };
    let path = results_dir.join("summary.json");
    let mut payload = serde_json::to_string_pretty(&summary).context("serialize summary")?;
    payload.push('\n');
    fs::write(&path, payload).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Read `summary.json` back from the results directory.
pub fn load_summary(results_dir: &Path) -> Result<Summary> {
    let path = results_dir.join("summary.json");
    let contents =
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

pub fn aggregate(summary: &Summary) -> Aggregate {
    let runs = summary.cases.len();
    let passed = summary.cases.iter().filter(|c| c.passed).count();
    let avg_attempts = (runs > 0).then(|| {
        summary.cases.iter().map(|c| f64::from(c.attempts)).sum::<f64>() / runs as f64
    });
    Aggregate {
        runs,
        passed,
        failed: runs - passed,
        avg_attempts,
    }
}
