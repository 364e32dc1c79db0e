//! Append-only feedback accumulated across generation attempts.

/// One validator observation, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackEntry {
    /// e.g. `syntax_validator attempt 1`.
    pub source: String,
    pub message: String,
}

/// Ordered feedback history for one orchestrator run.
///
/// Entries are only ever appended; the history visible to attempt k contains
/// everything recorded by attempts 1..k-1, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackLog {
    entries: Vec<FeedbackEntry>,
}

impl FeedbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record feedback. Blank messages are dropped.
    pub fn add(&mut self, source: impl Into<String>, message: &str) {
        let message = message.trim();
        if message.is_empty() {
            return;
        }
        self.entries.push(FeedbackEntry {
            source: source.into(),
            message: message.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[FeedbackEntry] {
        &self.entries
    }

    /// Numbered history handed to the prompts.
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return "None.".to_string();
        }
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| format!("{}. ({}) {}", idx + 1, entry.source, entry.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
