//! Loading the documentation corpus from disk.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::retrieval::{Document, Snippet, rank_snippets};

/// The read-only retrieval corpus for one process.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    /// Load all `*.md` documents under `dir`, in sorted filename order.
    ///
    /// A missing directory yields an empty corpus with a warning; generation
    /// still works, just without retrieval context.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            warn!(dir = %dir.display(), "context directory missing, retrieval disabled");
            return Ok(Self::default());
        }
        let mut paths: Vec<_> = fs::read_dir(dir)
            .with_context(|| format!("read context directory {}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
            .collect();
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("read corpus document {}", path.display()))?;
            let source = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            documents.push(Document { source, text });
        }
        debug!(count = documents.len(), "loaded corpus documents");
        Ok(Self { documents })
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Rank the corpus against `query` and return the top `k` snippets.
    pub fn top_snippets(&self, query: &str, k: usize) -> Vec<Snippet> {
        rank_snippets(query, &self.documents, k)
    }
}
