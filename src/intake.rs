//! Symptom-intake dialogue
//!
//! A scripted questionnaire that walks a patient through a fixed sequence of
//! questions. Transitions are pure: the caller owns the `IntakeState` and
//! persists whatever `advance` hands back.

mod narrative;
mod stage;
mod state;
mod transcript;
mod transition;

#[cfg(test)]
mod proptests;

pub use narrative::{to_narrative, with_manual_notes};
pub use stage::Stage;
pub use state::{IntakeContext, IntakeState, ReadyIntake, SeverityPolicy};
pub use transcript::{ChatLogEntry, Transcript};
pub use transition::{advance, reset};
