//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

#![allow(clippy::single_match_else)]

use super::state::*;
use super::transition::*;
use super::*;
use crate::conversation::{Entry, FailureKind, FunctionCall, FunctionResult};
use crate::llm::LlmErrorKind;
use proptest::prelude::*;
use serde_json::{json, Map};

// ============================================================================
// Arbitrary Generators
// ============================================================================

const FUNCTION_NAMES: [&str; 4] = [
    "get_current_weather",
    "get_current_atmospheric_conditions",
    "get_current_astronomical_data",
    "get_current_air_quality",
];

fn arb_calls(max: usize) -> impl Strategy<Value = Vec<FunctionCall>> {
    prop::collection::vec((0..FUNCTION_NAMES.len(), "[A-Z][a-z]{2,8}"), 1..=max).prop_map(
        |specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (f, city))| {
                    let mut args = Map::new();
                    args.insert("location".into(), json!(city));
                    FunctionCall::new(format!("call_{i}"), FUNCTION_NAMES[f], args)
                })
                .collect()
        },
    )
}

fn arb_error_kind() -> impl Strategy<Value = LlmErrorKind> {
    prop_oneof![
        Just(LlmErrorKind::Network),
        Just(LlmErrorKind::RateLimit),
        Just(LlmErrorKind::ServerError),
        Just(LlmErrorKind::Auth),
        Just(LlmErrorKind::InvalidRequest),
        Just(LlmErrorKind::Unknown),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-z ]{0,20}".prop_map(|input| Event::Start { input }),
        ("[a-z ]{0,20}", arb_calls(3)).prop_map(|(text, calls)| Event::DecisionMade { text, calls }),
        "[a-z ]{0,20}".prop_map(|text| Event::DecisionMade {
            text,
            calls: vec![]
        }),
        arb_error_kind().prop_map(|error_kind| Event::DecisionFailed {
            message: "boom".into(),
            error_kind
        }),
        (1u32..5).prop_map(|attempt| Event::RetryTimeout { attempt }),
        arb_calls(3).prop_map(|calls| Event::ToolResults {
            results: calls
                .iter()
                .map(|c| FunctionResult::payload(c, json!({})))
                .collect()
        }),
    ]
}

fn arb_terminal_state() -> impl Strategy<Value = AgentState> {
    prop_oneof![
        "[a-z ]{0,20}".prop_map(|answer| AgentState::Done { answer }),
        "[a-z ]{0,20}".prop_map(|message| AgentState::Failed {
            message,
            error_kind: ErrorKind::IterationLimitExceeded
        }),
    ]
}

/// Results for `calls`, shuffled by `rotation`, with `failures` marking
/// which ones fail
fn results_for(calls: &[FunctionCall], rotation: usize, failures: &[bool]) -> Vec<FunctionResult> {
    let mut results: Vec<_> = calls
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if failures.get(i).copied().unwrap_or(false) {
                FunctionResult::failure(c, FailureKind::Provider, "upstream error")
            } else {
                FunctionResult::payload(c, json!({"ok": i}))
            }
        })
        .collect();
    let len = results.len();
    results.rotate_left(rotation % len);
    results
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn terminal_states_reject_every_event(state in arb_terminal_state(), event in arb_event()) {
        let result = transition(&state, &AgentContext::default(), event);
        prop_assert!(matches!(result, Err(TransitionError::AlreadyFinished)));
    }

    #[test]
    fn decision_with_calls_executes_exactly_those_calls(calls in arb_calls(6), iteration in 1u32..8) {
        let state = AgentState::AwaitingDecision { iteration, attempt: 1 };
        let result = transition(
            &state,
            &AgentContext::default(),
            Event::DecisionMade { text: String::new(), calls: calls.clone() },
        ).unwrap();

        let executed: Vec<_> = result.effects.iter().filter_map(|e| match e {
            Effect::ExecuteCalls { calls } => Some(calls.clone()),
            _ => None,
        }).collect();
        prop_assert_eq!(executed, vec![calls.clone()]);
        prop_assert_eq!(
            result.new_state,
            AgentState::AwaitingToolResults { iteration, pending: calls }
        );
    }

    #[test]
    fn any_permutation_of_results_is_accepted(
        calls in arb_calls(6),
        rotation in 0usize..6,
        failures in prop::collection::vec(any::<bool>(), 6),
    ) {
        let state = AgentState::AwaitingToolResults { iteration: 1, pending: calls.clone() };
        let results = results_for(&calls, rotation, &failures);
        let result = transition(&state, &AgentContext::default(), Event::ToolResults { results }).unwrap();

        let appended: Vec<_> = result.effects.iter().filter_map(|e| match e {
            Effect::Append(Entry::FunctionResult(r)) => Some(r.id.clone()),
            _ => None,
        }).collect();
        let expected: Vec<_> = calls.iter().map(|c| c.id.clone()).collect();
        // Exactly N results, one per call, failures included
        prop_assert_eq!(appended, expected);
    }

    #[test]
    fn missing_result_is_rejected(calls in arb_calls(6), drop_index in 0usize..6) {
        prop_assume!(calls.len() > 1);
        let state = AgentState::AwaitingToolResults { iteration: 1, pending: calls.clone() };
        let mut results = results_for(&calls, 0, &[]);
        results.remove(drop_index % calls.len());
        let outcome = transition(&state, &AgentContext::default(), Event::ToolResults { results });
        prop_assert!(matches!(outcome, Err(TransitionError::ResultMismatch(_))), "expected ResultMismatch");
    }

    #[test]
    fn decision_retries_are_bounded(kinds in prop::collection::vec(arb_error_kind(), 1..10)) {
        let context = AgentContext::default();
        let mut state = AgentState::AwaitingDecision { iteration: 1, attempt: 1 };

        for error_kind in kinds {
            if state.is_terminal() {
                break;
            }
            let result = transition(
                &state,
                &context,
                Event::DecisionFailed { message: "x".into(), error_kind },
            ).unwrap();
            state = result.new_state;

            match &state {
                AgentState::AwaitingDecision { attempt, .. } => {
                    prop_assert!(*attempt <= context.max_decision_attempts);
                    prop_assert!(error_kind.is_retryable());
                }
                AgentState::Failed { .. } => {
                    prop_assert!(result.effects.contains(&Effect::Finish));
                }
                other => prop_assert!(false, "unexpected state {:?}", other),
            }
        }
    }

    /// Drive whole runs: the loop always ends within the iteration limit and
    /// never fans out again after `Done`.
    #[test]
    fn runs_terminate_within_limit(
        max_iterations in 1u32..6,
        script in prop::collection::vec(prop::option::of(arb_calls(3)), 1..12),
    ) {
        let context = AgentContext::with_max_iterations(max_iterations);
        let mut state = transition(
            &AgentState::Idle,
            &context,
            Event::Start { input: "weather?".into() },
        ).unwrap().new_state;
        let mut decisions = 0u32;

        for step in script {
            let AgentState::AwaitingDecision { .. } = state else { break };
            decisions += 1;

            let calls = step.unwrap_or_default();
            let result = transition(
                &state,
                &context,
                Event::DecisionMade { text: "answer".into(), calls },
            ).unwrap();
            state = result.new_state;

            if let AgentState::AwaitingToolResults { pending, .. } = &state {
                let results = results_for(pending, 1, &[]);
                state = transition(&state, &context, Event::ToolResults { results })
                    .unwrap()
                    .new_state;
            }
        }

        prop_assert!(decisions <= max_iterations);
        match &state {
            AgentState::Done { .. } => {
                let again = transition(
                    &state,
                    &context,
                    Event::DecisionMade {
                        text: String::new(),
                        calls: vec![FunctionCall::new("c", "get_current_weather", Map::new())],
                    },
                );
                prop_assert!(again.is_err());
            }
            AgentState::Failed { error_kind, .. } => {
                prop_assert_eq!(*error_kind, ErrorKind::IterationLimitExceeded);
                prop_assert_eq!(decisions, max_iterations);
            }
            AgentState::AwaitingDecision { iteration, .. } => {
                // Script ran out before the run finished
                prop_assert!(*iteration <= max_iterations);
            }
            other => prop_assert!(false, "unexpected state {:?}", other),
        }
    }
}
