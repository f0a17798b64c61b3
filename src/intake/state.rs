//! Intake state types

use super::Stage;
use serde::{Deserialize, Serialize};

/// Answers collected so far, plus the stage awaiting the next answer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeState {
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional: Option<String>,
}

impl IntakeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.stage.is_done()
    }

    /// Answer recorded for `stage`, if any
    pub fn answer(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Start | Stage::Done => None,
            Stage::Symptom => self.symptom.as_deref(),
            Stage::Location => self.location.as_deref(),
            Stage::Severity => self.severity.as_deref(),
            Stage::Duration => self.duration.as_deref(),
            Stage::Additional => self.additional.as_deref(),
        }
    }

    /// Store `input` as the answer for `stage`. No-op for `Start` and `Done`.
    pub(crate) fn record(&mut self, stage: Stage, input: &str) {
        let slot = match stage {
            Stage::Start | Stage::Done => return,
            Stage::Symptom => &mut self.symptom,
            Stage::Location => &mut self.location,
            Stage::Severity => &mut self.severity,
            Stage::Duration => &mut self.duration,
            Stage::Additional => &mut self.additional,
        };
        *slot = Some(input.to_string());
    }

    /// Typed view over a completed intake; `None` until the stage is `Done`
    pub fn ready(&self) -> Option<ReadyIntake<'_>> {
        self.is_done().then_some(ReadyIntake { state: self })
    }
}

/// A completed intake. Only obtainable through [`IntakeState::ready`].
#[derive(Debug, Clone, Copy)]
pub struct ReadyIntake<'a> {
    state: &'a IntakeState,
}

impl ReadyIntake<'_> {
    /// Answer for `stage`, empty when the patient never gave one
    pub fn field(&self, stage: Stage) -> &str {
        self.state.answer(stage).unwrap_or_default()
    }
}

/// How the severity answer is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeverityPolicy {
    /// Any text is accepted verbatim
    #[default]
    Lenient,
    /// Must be a whole number from 1 to 10
    Strict,
}

impl SeverityPolicy {
    pub fn accepts(self, input: &str) -> bool {
        match self {
            SeverityPolicy::Lenient => true,
            SeverityPolicy::Strict => {
                // Plain digits only: "+7" and "07" would reach the narrative as typed
                let trimmed = input.trim();
                trimmed.parse::<u8>().is_ok_and(|score| {
                    (1..=10).contains(&score) && score.to_string() == trimmed
                })
            }
        }
    }
}

/// Configuration for a dialogue (immutable for the life of the session)
#[derive(Debug, Clone, Copy, Default)]
pub struct IntakeContext {
    pub severity_policy: SeverityPolicy,
}

impl IntakeContext {
    pub fn new(severity_policy: SeverityPolicy) -> Self {
        Self { severity_policy }
    }
}
