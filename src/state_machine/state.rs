//! Agent state types

use crate::conversation::FunctionCall;
use crate::llm::LlmErrorKind;
use serde::{Deserialize, Serialize};

/// Why a run ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    RateLimit,
    ServerError,
    Auth,
    InvalidRequest,
    Unknown,
    IterationLimitExceeded,
}

impl From<LlmErrorKind> for ErrorKind {
    fn from(kind: LlmErrorKind) -> Self {
        match kind {
            LlmErrorKind::Network => ErrorKind::Network,
            LlmErrorKind::RateLimit => ErrorKind::RateLimit,
            LlmErrorKind::ServerError => ErrorKind::ServerError,
            LlmErrorKind::Auth => ErrorKind::Auth,
            LlmErrorKind::InvalidRequest => ErrorKind::InvalidRequest,
            LlmErrorKind::Unknown => ErrorKind::Unknown,
        }
    }
}

/// Control loop state
///
/// `iteration` counts decision steps, starting at 1.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentState {
    /// No input yet
    #[default]
    Idle,

    /// Decision step in flight, with retry tracking
    AwaitingDecision { iteration: u32, attempt: u32 },

    /// Fan-out in flight for the calls of the latest decision
    AwaitingToolResults {
        iteration: u32,
        pending: Vec<FunctionCall>,
    },

    /// The last decision requested no calls (terminal)
    Done { answer: String },

    /// Unrecoverable error (terminal)
    Failed { message: String, error_kind: ErrorKind },
}

impl AgentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Done { .. } | AgentState::Failed { .. })
    }

    pub fn iteration(&self) -> Option<u32> {
        match self {
            AgentState::AwaitingDecision { iteration, .. }
            | AgentState::AwaitingToolResults { iteration, .. } => Some(*iteration),
            _ => None,
        }
    }
}

/// Limits that shape transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentContext {
    /// Decision steps allowed before the run fails
    pub max_iterations: u32,
    /// Attempts per decision step, including the first
    pub max_decision_attempts: u32,
}

pub const DEFAULT_MAX_ITERATIONS: u32 = 8;
pub const DEFAULT_MAX_DECISION_ATTEMPTS: u32 = 3;

impl Default for AgentContext {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_decision_attempts: DEFAULT_MAX_DECISION_ATTEMPTS,
        }
    }
}

impl AgentContext {
    pub fn with_max_iterations(max_iterations: u32) -> Self {
        Self {
            max_iterations,
            ..Self::default()
        }
    }
}
