//! Property-based tests for the intake dialogue
//!
//! These tests verify key invariants hold across all possible inputs.

use super::narrative::IntakeError;
use super::stage::COLLECTED_MESSAGE;
use super::transition::{TransitionError, DONE_MESSAGE};
use super::*;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_stage() -> impl Strategy<Value = Stage> {
    proptest::sample::select(Stage::ALL.to_vec())
}

fn arb_answer() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[a-zA-Z0-9 ]{0,20}")
}

/// Input text, including the empty string and leading/trailing whitespace
fn arb_input() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-zA-Z0-9 ,.!?]{0,40}",
        "\\PC{0,20}",
    ]
}

fn arb_state() -> impl Strategy<Value = IntakeState> {
    (
        arb_stage(),
        arb_answer(),
        arb_answer(),
        arb_answer(),
        arb_answer(),
        arb_answer(),
    )
        .prop_map(
            |(stage, symptom, location, severity, duration, additional)| IntakeState {
                stage,
                symptom,
                location,
                severity,
                duration,
                additional,
            },
        )
}

fn lenient() -> IntakeContext {
    IntakeContext::new(SeverityPolicy::Lenient)
}

const ANSWER_STAGES: [Stage; 5] = [
    Stage::Symptom,
    Stage::Location,
    Stage::Severity,
    Stage::Duration,
    Stage::Additional,
];

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: every non-terminal stage moves to its successor, whatever the input
    #[test]
    fn prop_advance_moves_to_successor(state in arb_state(), input in arb_input()) {
        prop_assume!(!state.is_done());
        let result = advance(&state, &lenient(), &input).unwrap();
        prop_assert_eq!(result.new_state.stage, state.stage.next());
        prop_assert!(result.new_state.stage > state.stage);
    }

    // Invariant 2: exactly the completed stage's field changes, and it holds the input verbatim
    #[test]
    fn prop_only_current_field_recorded(state in arb_state(), input in arb_input()) {
        prop_assume!(!state.is_done());
        let result = advance(&state, &lenient(), &input).unwrap();

        for stage in ANSWER_STAGES {
            if stage == state.stage {
                prop_assert_eq!(result.new_state.answer(stage), Some(input.as_str()));
            } else {
                prop_assert_eq!(result.new_state.answer(stage), state.answer(stage));
            }
        }
    }

    // Invariant 3: Done is absorbing and never mutates stored answers
    #[test]
    fn prop_done_is_absorbing(state in arb_state(), input in arb_input()) {
        let done = IntakeState { stage: Stage::Done, ..state };
        let result = advance(&done, &lenient(), &input).unwrap();
        prop_assert_eq!(result.prompt, DONE_MESSAGE);
        prop_assert_eq!(result.new_state, done);
    }

    // Invariant 4: five answers after a reset always reach Done with a narrative
    #[test]
    fn prop_five_answers_complete_intake(answers in proptest::collection::vec(arb_input(), 5)) {
        let mut state = reset().new_state;
        let mut last_prompt = "";
        for answer in &answers {
            let result = advance(&state, &lenient(), answer).unwrap();
            state = result.new_state;
            last_prompt = result.prompt;
        }

        prop_assert!(state.is_done());
        prop_assert_eq!(last_prompt, COLLECTED_MESSAGE);
        let narrative = to_narrative(&state).unwrap();
        let expected_severity = format!("Severity: {}/10", answers[2]);
        prop_assert!(narrative.contains(&expected_severity));
    }

    // Invariant 5: narrative is refused for every non-terminal stage
    #[test]
    fn prop_narrative_requires_done(state in arb_state()) {
        let result = to_narrative(&state);
        if state.is_done() {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result, Err(IntakeError::NotReady { stage: state.stage }));
        }
    }

    // Invariant 6: strict severity rejects without touching the state
    #[test]
    fn prop_strict_rejection_leaves_state(state in arb_state(), input in "[a-z]{1,10}") {
        let at_severity = IntakeState { stage: Stage::Severity, ..state };
        let strict = IntakeContext::new(SeverityPolicy::Strict);
        let err = advance(&at_severity, &strict, &input);
        prop_assert_eq!(err, Err(TransitionError::InvalidSeverity(input)));
    }

    // Invariant 7: strict severity accepts the whole 1-10 range
    #[test]
    fn prop_strict_accepts_valid_scores(score in 1u8..=10) {
        let state = IntakeState { stage: Stage::Severity, ..IntakeState::default() };
        let strict = IntakeContext::new(SeverityPolicy::Strict);
        let result = advance(&state, &strict, &score.to_string()).unwrap();
        prop_assert_eq!(result.new_state.stage, Stage::Duration);
    }
}
