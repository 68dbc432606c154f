//! Agent runtime - drives the state machine and performs its effects

use super::fanout::FanOutExecutor;
use super::traits::DecisionMaker;
use crate::conversation::{Conversation, ConversationError, Entry};
use crate::functions::{FunctionProvider, FunctionRegistry, RegistrySnapshot};
use crate::state_machine::{
    transition, AgentContext, AgentState, Effect, ErrorKind, Event, TransitionError,
};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// A run that reached a final answer
#[derive(Debug)]
pub struct RunOutcome {
    pub answer: String,
    pub conversation: Conversation,
    /// Decision steps taken, the answering one included
    pub iterations: u32,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("No final answer after {limit} decision steps")]
    IterationLimitExceeded {
        limit: u32,
        conversation: Box<Conversation>,
    },
    #[error("Decision step failed: {message}")]
    Decision {
        message: String,
        kind: ErrorKind,
        conversation: Box<Conversation>,
    },
    #[error("Run cancelled")]
    Cancelled,
    #[error("Conversation rejected an entry: {0}")]
    Conversation(#[from] ConversationError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl AgentError {
    /// The conversation as it stood when the run failed, where one was kept
    pub fn conversation(&self) -> Option<&Conversation> {
        match self {
            AgentError::IterationLimitExceeded { conversation, .. }
            | AgentError::Decision { conversation, .. } => Some(conversation),
            _ => None,
        }
    }
}

/// Per-run mutable state owned by `run`
struct Run {
    state: AgentState,
    conversation: Conversation,
    /// Snapshot the latest decision step was given; its fan-out uses the same one
    snapshot: Option<Arc<RegistrySnapshot>>,
}

pub struct AgentRuntime<D, P: FunctionProvider> {
    decider: D,
    registry: Arc<FunctionRegistry<P>>,
    fanout: FanOutExecutor,
    context: AgentContext,
    cancel: CancellationToken,
}

impl<D, P> AgentRuntime<D, P>
where
    D: DecisionMaker,
    P: FunctionProvider,
{
    pub fn new(decider: D, registry: Arc<FunctionRegistry<P>>, fanout: FanOutExecutor) -> Self {
        Self {
            decider,
            registry,
            fanout,
            context: AgentContext::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_context(mut self, context: AgentContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry<P>> {
        &self.registry
    }

    /// Answer one user input, running decision steps and fan-outs until a
    /// decision requests no calls
    pub async fn run(&self, input: impl Into<String>) -> Result<RunOutcome, AgentError> {
        let mut run = Run {
            state: AgentState::Idle,
            conversation: Conversation::new(),
            snapshot: None,
        };
        let mut events = VecDeque::from([Event::Start {
            input: input.into(),
        }]);

        while let Some(event) = events.pop_front() {
            let result = transition(&run.state, &self.context, event)?;
            tracing::debug!(from = ?run.state, to = ?result.new_state, "State transition");
            run.state = result.new_state;

            for effect in result.effects {
                if let Some(next) = self.execute_effect(&mut run, effect).await? {
                    events.push_back(next);
                }
            }
        }

        self.finish(run)
    }

    async fn execute_effect(&self, run: &mut Run, effect: Effect) -> Result<Option<Event>, AgentError> {
        match effect {
            Effect::Append(entry) => {
                run.conversation.append(entry)?;
                Ok(None)
            }

            Effect::RequestDecision => {
                // Only between iterations; a fan-out in flight keeps its snapshot
                let snapshot = if self.registry.is_stale() {
                    self.registry.refresh().await
                } else {
                    self.registry.snapshot().await
                };
                tracing::info!(
                    iteration = run.state.iteration().unwrap_or_default(),
                    registry_version = snapshot.version(),
                    entries = run.conversation.len(),
                    "Requesting decision"
                );

                let decision = tokio::select! {
                    result = self.decider.decide(&run.conversation, &snapshot) => result,
                    () = self.cancel.cancelled() => return Err(cancelled("decision")),
                };
                run.snapshot = Some(snapshot);

                Ok(Some(match decision {
                    Ok(decision) => {
                        tracing::info!(calls = decision.calls.len(), "Decision made");
                        Event::DecisionMade {
                            text: decision.text,
                            calls: decision.calls,
                        }
                    }
                    Err(e) => Event::DecisionFailed {
                        message: e.message,
                        error_kind: e.kind,
                    },
                }))
            }

            Effect::ExecuteCalls { calls } => {
                let snapshot = match &run.snapshot {
                    Some(snapshot) => snapshot.clone(),
                    None => self.registry.snapshot().await,
                };
                let results = tokio::select! {
                    results = self.fanout.execute(self.registry.provider(), calls, &snapshot) => results,
                    () = self.cancel.cancelled() => return Err(cancelled("fan-out")),
                };
                Ok(Some(Event::ToolResults { results }))
            }

            Effect::ScheduleRetry { delay, attempt } => {
                tracing::warn!(
                    attempt,
                    delay_ms = %delay.as_millis(),
                    "Decision step failed, retrying"
                );
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = self.cancel.cancelled() => return Err(cancelled("retry wait")),
                }
                Ok(Some(Event::RetryTimeout { attempt }))
            }

            Effect::Finish => Ok(None),
        }
    }

    fn finish(&self, run: Run) -> Result<RunOutcome, AgentError> {
        let Run {
            state,
            conversation,
            ..
        } = run;
        let iterations = decision_count(&conversation);

        match state {
            AgentState::Done { answer } => {
                tracing::info!(iterations, entries = conversation.len(), "Run finished");
                Ok(RunOutcome {
                    answer,
                    conversation,
                    iterations,
                })
            }
            AgentState::Failed {
                error_kind: ErrorKind::IterationLimitExceeded,
                ..
            } => {
                tracing::warn!(limit = self.context.max_iterations, "Iteration limit reached");
                Err(AgentError::IterationLimitExceeded {
                    limit: self.context.max_iterations,
                    conversation: Box::new(conversation),
                })
            }
            AgentState::Failed {
                message,
                error_kind,
            } => {
                tracing::error!(error = %message, kind = ?error_kind, "Run failed");
                Err(AgentError::Decision {
                    message,
                    kind: error_kind,
                    conversation: Box::new(conversation),
                })
            }
            other => Err(TransitionError::InvalidTransition(format!(
                "run stopped in non-terminal state {other:?}"
            ))
            .into()),
        }
    }
}

fn cancelled(during: &str) -> AgentError {
    tracing::info!(during, "Run cancelled");
    AgentError::Cancelled
}

fn decision_count(conversation: &Conversation) -> u32 {
    let count = conversation
        .entries()
        .iter()
        .filter(|e| matches!(e, Entry::Decision { .. }))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}
