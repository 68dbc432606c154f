//! Events that drive the control loop

use crate::conversation::{FunctionCall, FunctionResult};
use crate::llm::LlmErrorKind;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Start {
        input: String,
    },

    // Decision events
    DecisionMade {
        text: String,
        calls: Vec<FunctionCall>,
    },
    DecisionFailed {
        message: String,
        error_kind: LlmErrorKind,
    },
    RetryTimeout {
        attempt: u32,
    },

    // Fan-out events
    ToolResults {
        results: Vec<FunctionResult>,
    },
}
