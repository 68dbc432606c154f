//! Pure state transition function
//!
//! Given the same inputs this always produces the same outputs, with no I/O.

use super::{AgentContext, AgentState, Effect, ErrorKind, Event};
use crate::conversation::{Entry, FunctionCall, FunctionResult};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: AgentState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: AgentState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Run already finished")]
    AlreadyFinished,
    #[error("Decision requested call id '{0}' more than once")]
    DuplicateCallId(String),
    #[error("Tool results do not match pending calls: {0}")]
    ResultMismatch(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn transition(
    state: &AgentState,
    context: &AgentContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Terminal states accept nothing
        (AgentState::Done { .. } | AgentState::Failed { .. }, _) => {
            Err(TransitionError::AlreadyFinished)
        }

        (AgentState::Idle, Event::Start { input }) => Ok(TransitionResult::new(
            AgentState::AwaitingDecision {
                iteration: 1,
                attempt: 1,
            },
        )
        .with_effect(Effect::Append(Entry::UserInput { text: input }))
        .with_effect(Effect::RequestDecision)),

        // ============================================================
        // Decision handling
        // ============================================================

        // No calls: the text is the final answer
        (AgentState::AwaitingDecision { .. }, Event::DecisionMade { text, calls })
            if calls.is_empty() =>
        {
            Ok(TransitionResult::new(AgentState::Done {
                answer: text.clone(),
            })
            .with_effect(Effect::Append(Entry::Decision {
                text,
                calls: vec![],
            }))
            .with_effect(Effect::Finish))
        }

        (AgentState::AwaitingDecision { iteration, .. }, Event::DecisionMade { text, calls }) => {
            ensure_unique_ids(&calls)?;
            Ok(TransitionResult::new(AgentState::AwaitingToolResults {
                iteration: *iteration,
                pending: calls.clone(),
            })
            .with_effect(Effect::Append(Entry::Decision {
                text,
                calls: calls.clone(),
            }))
            .with_effect(Effect::ExecuteCalls { calls }))
        }

        (
            AgentState::AwaitingDecision { iteration, attempt },
            Event::DecisionFailed { error_kind, .. },
        ) if error_kind.is_retryable() && *attempt < context.max_decision_attempts => {
            let next = attempt + 1;
            Ok(TransitionResult::new(AgentState::AwaitingDecision {
                iteration: *iteration,
                attempt: next,
            })
            .with_effect(Effect::ScheduleRetry {
                delay: retry_delay(*attempt),
                attempt: next,
            }))
        }

        (
            AgentState::AwaitingDecision { attempt, .. },
            Event::DecisionFailed {
                message,
                error_kind,
            },
        ) => {
            let message = if error_kind.is_retryable() {
                format!("Failed after {attempt} attempts: {message}")
            } else {
                message
            };
            Ok(TransitionResult::new(AgentState::Failed {
                message,
                error_kind: error_kind.into(),
            })
            .with_effect(Effect::Finish))
        }

        (
            AgentState::AwaitingDecision { iteration, attempt },
            Event::RetryTimeout {
                attempt: retry_attempt,
            },
        ) if *attempt == retry_attempt => Ok(TransitionResult::new(
            AgentState::AwaitingDecision {
                iteration: *iteration,
                attempt: *attempt,
            },
        )
        .with_effect(Effect::RequestDecision)),

        // ============================================================
        // Fan-out results
        // ============================================================
        (AgentState::AwaitingToolResults { iteration, pending }, Event::ToolResults { results }) => {
            let ordered = match_results(pending, results)?;
            let appends = ordered.into_iter().map(Effect::append_result);

            if *iteration >= context.max_iterations {
                let message = format!(
                    "Stopped after {} decision steps without a final answer",
                    context.max_iterations
                );
                return Ok(TransitionResult::new(AgentState::Failed {
                    message,
                    error_kind: ErrorKind::IterationLimitExceeded,
                })
                .with_effects(appends)
                .with_effect(Effect::Finish));
            }

            Ok(TransitionResult::new(AgentState::AwaitingDecision {
                iteration: iteration + 1,
                attempt: 1,
            })
            .with_effects(appends)
            .with_effect(Effect::RequestDecision))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{} in state {state:?}",
            event_name(&event)
        ))),
    }
}

fn ensure_unique_ids(calls: &[FunctionCall]) -> Result<(), TransitionError> {
    let mut seen = HashSet::with_capacity(calls.len());
    for call in calls {
        if !seen.insert(call.id.as_str()) {
            return Err(TransitionError::DuplicateCallId(call.id.clone()));
        }
    }
    Ok(())
}

/// Pair every pending call with exactly one result, returning the results
/// in request order
fn match_results(
    pending: &[FunctionCall],
    results: Vec<FunctionResult>,
) -> Result<Vec<FunctionResult>, TransitionError> {
    if results.len() != pending.len() {
        return Err(TransitionError::ResultMismatch(format!(
            "expected {} results, got {}",
            pending.len(),
            results.len()
        )));
    }

    let mut slots: Vec<Option<FunctionResult>> = vec![None; pending.len()];
    for result in results {
        let Some(index) = pending.iter().position(|c| c.id == result.id) else {
            return Err(TransitionError::ResultMismatch(format!(
                "unknown call id '{}'",
                result.id
            )));
        };
        if slots[index].replace(result).is_some() {
            return Err(TransitionError::ResultMismatch(format!(
                "call id '{}' answered twice",
                pending[index].id
            )));
        }
    }

    // Lengths match and no slot was filled twice, so every slot is filled
    Ok(slots.into_iter().flatten().collect())
}

fn retry_delay(attempt: u32) -> Duration {
    // Exponential backoff: 1s, 2s, 4s
    Duration::from_secs(1 << (attempt.saturating_sub(1)).min(6))
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::Start { .. } => "Start",
        Event::DecisionMade { .. } => "DecisionMade",
        Event::DecisionFailed { .. } => "DecisionFailed",
        Event::RetryTimeout { .. } => "RetryTimeout",
        Event::ToolResults { .. } => "ToolResults",
    }
}
