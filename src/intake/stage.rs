//! Intake stages and their fixed ordering

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prompt returned once the last answer has been collected
pub const COLLECTED_MESSAGE: &str =
    "Thank you. I have collected your information. You can now proceed to consultation.";

/// One step of the intake questionnaire.
///
/// Variants are declared in dialogue order; `next` is the only way forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Conversation created, greeting not yet sent
    #[default]
    Start,
    Symptom,
    Location,
    Severity,
    Duration,
    Additional,
    /// All answers collected (terminal)
    Done,
}

impl Stage {
    #[cfg(test)]
    pub const ALL: [Stage; 7] = [
        Stage::Start,
        Stage::Symptom,
        Stage::Location,
        Stage::Severity,
        Stage::Duration,
        Stage::Additional,
        Stage::Done,
    ];

    /// Successor in the dialogue. `Done` is its own successor.
    pub fn next(self) -> Self {
        match self {
            Stage::Start => Stage::Symptom,
            Stage::Symptom => Stage::Location,
            Stage::Location => Stage::Severity,
            Stage::Severity => Stage::Duration,
            Stage::Duration => Stage::Additional,
            Stage::Additional | Stage::Done => Stage::Done,
        }
    }

    pub fn is_done(self) -> bool {
        self == Stage::Done
    }

    /// Question asked while waiting for this stage's answer.
    ///
    /// `Start` asks nothing (its input is ignored) and `Done` has no question.
    pub fn question(self) -> Option<&'static str> {
        match self {
            Stage::Start | Stage::Done => None,
            Stage::Symptom => Some(
                "Hello, I’m your AI Health Assistant. What main symptom are you experiencing?",
            ),
            Stage::Location => Some(
                "Can you tell me where the symptom is located? (e.g., chest, head, stomach)",
            ),
            Stage::Severity => Some("On a scale of 1 to 10, how severe is the symptom?"),
            Stage::Duration => Some(
                "How long have you been experiencing this symptom? (hours, days, weeks)",
            ),
            Stage::Additional => Some("Do you have any other symptoms or information to share?"),
        }
    }

    /// Prompt shown to the patient on entering this stage
    pub fn entry_prompt(self) -> &'static str {
        self.question().unwrap_or(COLLECTED_MESSAGE)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Symptom => "symptom",
            Stage::Location => "location",
            Stage::Severity => "severity",
            Stage::Duration => "duration",
            Stage::Additional => "additional",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successor_follows_declaration_order() {
        for pair in Stage::ALL.windows(2) {
            assert_eq!(pair[0].next(), pair[1]);
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(Stage::Done.next(), Stage::Done);
    }

    #[test]
    fn test_entry_prompts() {
        assert!(Stage::Symptom.entry_prompt().starts_with("Hello"));
        assert_eq!(Stage::Done.entry_prompt(), COLLECTED_MESSAGE);
        assert_eq!(Stage::Start.question(), None);
    }

    #[test]
    fn test_serializes_as_snake_case() {
        let json = serde_json::to_string(&Stage::Additional).unwrap();
        assert_eq!(json, "\"additional\"");
        let back: Stage = serde_json::from_str("\"done\"").unwrap();
        assert_eq!(back, Stage::Done);
    }
}
