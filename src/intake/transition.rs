//! Pure intake transition function
//!
//! Given the same state, context and input, `advance` always produces the same
//! prompt and next state. Nothing here touches the session or the database.

use super::{IntakeContext, IntakeState, Stage};
use thiserror::Error;

/// Reply once the dialogue has finished
pub const DONE_MESSAGE: &str = "You may now proceed to consultation.";

/// Result of a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub new_state: IntakeState,
    pub prompt: &'static str,
}

/// Errors that can occur during transition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Severity must be a whole number from 1 to 10 (got {0:?})")]
    InvalidSeverity(String),
}

impl TransitionError {
    /// Prompt to show instead of advancing: the reason followed by the same question
    pub fn reprompt(&self) -> String {
        match self {
            TransitionError::InvalidSeverity(_) => format!(
                "{self}. {}",
                Stage::Severity.entry_prompt()
            ),
        }
    }
}

/// Feed one patient reply into the dialogue.
///
/// The reply is stored verbatim under the current stage and the dialogue moves
/// to the next stage. Once `Done`, every call returns [`DONE_MESSAGE`] and the
/// state is left as it was.
pub fn advance(
    state: &IntakeState,
    context: &IntakeContext,
    input: &str,
) -> Result<TransitionResult, TransitionError> {
    if state.stage == Stage::Severity && !context.severity_policy.accepts(input) {
        return Err(TransitionError::InvalidSeverity(input.to_string()));
    }
    Ok(step(state, input))
}

/// Throw away everything collected and greet the patient again.
///
/// Equivalent to starting from a fresh state and advancing once with empty
/// input, so the result always sits at `Symptom` with no answers.
pub fn reset() -> TransitionResult {
    step(&IntakeState::new(), "")
}

fn step(state: &IntakeState, input: &str) -> TransitionResult {
    if state.is_done() {
        return TransitionResult {
            new_state: state.clone(),
            prompt: DONE_MESSAGE,
        };
    }

    let next = state.stage.next();
    let mut new_state = state.clone();
    new_state.record(state.stage, input);
    new_state.stage = next;

    TransitionResult {
        new_state,
        prompt: next.entry_prompt(),
    }
}
