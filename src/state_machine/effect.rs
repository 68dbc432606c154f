//! Effects produced by state transitions

use crate::conversation::{Entry, FunctionCall, FunctionResult};
use std::time::Duration;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append an entry to the conversation
    Append(Entry),

    /// Run the decision step over the conversation so far
    RequestDecision,

    /// Fan out the calls of the latest decision
    ExecuteCalls { calls: Vec<FunctionCall> },

    /// Schedule a retry of the decision step
    ScheduleRetry { delay: Duration, attempt: u32 },

    /// The run reached a terminal state
    Finish,
}

impl Effect {
    pub fn append_result(result: FunctionResult) -> Self {
        Effect::Append(Entry::FunctionResult(result))
    }
}
