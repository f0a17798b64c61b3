//! Projection of a completed intake into free text for triage

use super::{IntakeState, ReadyIntake, Stage};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("Intake is not complete yet (current stage: {stage})")]
    NotReady { stage: Stage },
}

impl ReadyIntake<'_> {
    /// Fixed multi-line summary of the collected answers
    pub fn narrative(&self) -> String {
        format!(
            "Symptom: {}\nLocation: {}\nSeverity: {}/10\nDuration: {}\nAdditional info: {}",
            self.field(Stage::Symptom),
            self.field(Stage::Location),
            self.field(Stage::Severity),
            self.field(Stage::Duration),
            self.field(Stage::Additional),
        )
    }
}

/// Narrative for a finished intake, or `NotReady` while questions remain
pub fn to_narrative(state: &IntakeState) -> Result<String, IntakeError> {
    state
        .ready()
        .map(|ready| ready.narrative())
        .ok_or(IntakeError::NotReady { stage: state.stage })
}

/// Append notes typed on the manual consultation form.
/// Blank notes leave the narrative untouched.
pub fn with_manual_notes(narrative: &str, notes: &str) -> String {
    if notes.trim().is_empty() {
        narrative.to_string()
    } else {
        format!("{narrative}\nAdditional info: {notes}")
    }
}
