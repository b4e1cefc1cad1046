//! Narrative memory: the ordered history of prose already shown to the player.
//!
//! The rendered log is injected into every generation prompt, so its exact
//! text form is part of the prompt-cache key and must stay stable:
//!
//! ```text
//! Previous events:
//! <event 1>
//! <event 2>
//! ```
//!
//! (with a trailing newline), or the empty string when nothing happened yet.

use serde::{Deserialize, Serialize};

/// Header line that prefixes a non-empty log.
pub const LOG_HEADER: &str = "Previous events:";

/// Append-only log of narrative events, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NarrativeMemory {
    events: Vec<String>,
}

impl NarrativeMemory {
    /// Create an empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to the end of the log.
    pub fn add_event(&mut self, event: impl Into<String>) {
        self.events.push(event.into());
    }

    /// Render the log for prompt injection.
    #[must_use]
    pub fn log(&self) -> String {
        if self.events.is_empty() {
            return String::new();
        }
        let body_len: usize = self.events.iter().map(|e| e.len() + 1).sum();
        let mut out = String::with_capacity(LOG_HEADER.len() + 1 + body_len);
        out.push_str(LOG_HEADER);
        out.push('\n');
        out.push_str(&self.events.join("\n"));
        out.push('\n');
        out
    }

    /// Forget every event.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Events in insertion order.
    #[must_use]
    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl From<Vec<String>> for NarrativeMemory {
    fn from(events: Vec<String>) -> Self {
        Self { events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_log_has_no_header() {
        assert_eq!(NarrativeMemory::new().log(), "");
    }

    #[test]
    fn log_format_is_exact() {
        let mut memory = NarrativeMemory::new();
        memory.add_event("A");
        memory.add_event("B");
        assert_eq!(memory.log(), "Previous events:\nA\nB\n");
    }

    #[test]
    fn clear_empties_log() {
        let mut memory = NarrativeMemory::new();
        memory.add_event("The door creaks.");
        memory.clear();
        assert!(memory.is_empty());
        assert_eq!(memory.log(), "");
    }

    #[test]
    fn serializes_as_plain_list() {
        let memory = NarrativeMemory::from(vec!["one".to_string(), "two".to_string()]);
        let json = serde_json::to_string(&memory).expect("encode");
        assert_eq!(json, r#"["one","two"]"#);
        let back: NarrativeMemory = serde_json::from_str(&json).expect("decode");
        assert_eq!(back, memory);
    }
}
