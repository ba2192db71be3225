use serde::Serialize;

/// One line in the assistant conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HistoryEntry {
    Command { text: String },
    Result { text: String, details: Option<String> },
    Error { text: String },
}

/// Append-only log of submitted commands and what came back.
#[derive(Debug, Default)]
pub struct CommandHistory {
    entries: Vec<HistoryEntry>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn command(&mut self, text: impl Into<String>) {
        self.entries.push(HistoryEntry::Command { text: text.into() });
    }

    pub fn result(&mut self, text: impl Into<String>, details: Option<String>) {
        self.entries.push(HistoryEntry::Result {
            text: text.into(),
            details,
        });
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.entries.push(HistoryEntry::Error { text: text.into() });
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn results_added(n: usize) -> String {
    format!("{n} result(s) added to map.")
}
