//! Keyword-overlap ranking over the documentation corpus.
//!
//! The corpus is a handful of static markdown documents; ranking is a plain
//! word-overlap score between the request and each chunk. Recomputed per
//! request, never cached.

use std::collections::HashSet;

/// One document loaded from the corpus directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Base name of the file the text came from.
    pub source: String,
    pub text: String,
}

/// A ranked fragment of corpus text, ephemeral per request.
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub source: String,
    pub text: String,
    pub score: usize,
}

/// Default chunk size in characters.
pub const CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive chunks.
pub const CHUNK_OVERLAP: usize = 200;
/// Default number of snippets handed to the prompt builder.
pub const TOP_K: usize = 3;

/// Split `text` into chunks of at most `chunk_size` characters with
/// `overlap` characters of carry-over between consecutive chunks.
///
/// Splits on char boundaries; `overlap` must be smaller than `chunk_size`.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    debug_assert!(overlap < chunk_size);
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Rank document chunks against `query` by keyword overlap and return the
/// top `k` snippets in descending score, ties broken by corpus order.
pub fn rank_snippets(query: &str, documents: &[Document], k: usize) -> Vec<Snippet> {
    let query_words = word_set(query);
    if query_words.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<Snippet> = Vec::new();
    for doc in documents {
        for chunk in chunk_text(&doc.text, CHUNK_SIZE, CHUNK_OVERLAP) {
            let score = word_set(&chunk).intersection(&query_words).count();
            if score > 0 {
                scored.push(Snippet {
                    source: doc.source.clone(),
                    text: chunk,
                    score,
                });
            }
        }
    }

    // Stable sort keeps corpus order for equal scores.
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(k);
    scored
}

fn word_set(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(source: &str, text: &str) -> Document {
        Document {
            source: source.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn chunking_respects_size_and_overlap() {
        let text = "a".repeat(2500);
        let chunks = chunk_text(&text, 1000, 200);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 1000);
        assert_eq!(chunks[1].len(), 1000);
        // Last chunk starts at 1600 and runs to 2500.
        assert_eq!(chunks[2].len(), 900);
    }

    #[test]
    fn chunking_empty_text_yields_nothing() {
        assert!(chunk_text("", 1000, 200).is_empty());
        assert!(chunk_text("   \n  ", 1000, 200).is_empty());
    }

    #[test]
    fn ranking_prefers_higher_overlap() {
        let docs = vec![
            doc("triggers.md", "Item triggers fire when a motion sensor changes state"),
            doc("actions.md", "sendCommand turns a light item on or off"),
            doc("unrelated.md", "persistence services store historic values"),
        ];
        let snippets = rank_snippets("turn on the light when motion detected", &docs, 2);
        assert_eq!(snippets.len(), 2);
        assert!(snippets[0].score >= snippets[1].score);
        let sources: Vec<&str> = snippets.iter().map(|s| s.source.as_str()).collect();
        assert!(sources.contains(&"triggers.md"));
        assert!(sources.contains(&"actions.md"));
    }

    #[test]
    fn ranking_drops_zero_score_chunks() {
        let docs = vec![doc("unrelated.md", "completely disjoint vocabulary here")];
        let snippets = rank_snippets("turn on the light", &docs, 3);
        assert!(snippets.is_empty());
    }

    #[test]
    fn ranking_is_case_insensitive() {
        let docs = vec![doc("a.md", "MOTION sensor LIGHT switch")];
        let snippets = rank_snippets("motion light", &docs, 1);
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].score, 2);
    }
}
