//! Chat transcript shown alongside the intake dialogue

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Assistant,
    User,
}

/// A single line of the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLogEntry {
    pub speaker: Speaker,
    pub text: String,
}

/// Append-only, display-only log of the dialogue.
/// Never fed to the classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<ChatLogEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user_message(&mut self, text: &str) {
        self.entries.push(ChatLogEntry {
            speaker: Speaker::User,
            text: text.to_string(),
        });
    }

    pub fn add_assistant_message(&mut self, text: &str) {
        self.entries.push(ChatLogEntry {
            speaker: Speaker::Assistant,
            text: text.to_string(),
        });
    }

    pub fn entries(&self) -> &[ChatLogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_keep_order() {
        let mut log = Transcript::new();
        log.add_assistant_message("hi");
        log.add_user_message("headache");

        let speakers: Vec<_> = log.entries().iter().map(|e| e.speaker).collect();
        assert_eq!(speakers, vec![Speaker::Assistant, Speaker::User]);
        assert_eq!(log.entries()[1].text, "headache");
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let mut log = Transcript::new();
        log.add_user_message("ok");
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json, serde_json::json!([{ "speaker": "user", "text": "ok" }]));
    }
}
