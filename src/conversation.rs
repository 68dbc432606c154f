//! Append-only conversation log
//!
//! Every function result must answer exactly one outstanding call of an
//! earlier decision, and a new decision may only follow once all calls of
//! the previous one are answered.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

/// A request from the decision step to invoke one function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl FunctionCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Why a single call produced no payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownFunction,
    InvalidArguments,
    TimedOut,
    Provider,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FunctionOutcome {
    Payload { value: Value },
    Failure { kind: FailureKind, reason: String },
}

/// Outcome of one call, matched to it by `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResult {
    pub id: String,
    pub name: String,
    pub outcome: FunctionOutcome,
}

impl FunctionResult {
    pub fn payload(call: &FunctionCall, value: Value) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            outcome: FunctionOutcome::Payload { value },
        }
    }

    pub fn failure(call: &FunctionCall, kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            outcome: FunctionOutcome::Failure {
                kind,
                reason: reason.into(),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, FunctionOutcome::Failure { .. })
    }

    /// Text handed back to the model
    pub fn content(&self) -> String {
        match &self.outcome {
            FunctionOutcome::Payload { value } => match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            FunctionOutcome::Failure { reason, .. } => reason.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entry {
    UserInput {
        text: String,
    },
    Decision {
        text: String,
        calls: Vec<FunctionCall>,
    },
    FunctionResult(FunctionResult),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("Result '{0}' does not answer any outstanding call")]
    UnmatchedResult(String),
    #[error("Call '{0}' already has a result")]
    DuplicateResult(String),
    #[error("Cannot record a new decision while {0} call(s) are unanswered")]
    UnansweredCalls(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Conversation {
    entries: Vec<Entry>,
    /// Answered call ids of the latest decision
    #[serde(skip)]
    answered: HashSet<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_input(text: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.entries.push(Entry::UserInput { text: text.into() });
        conversation
    }

    pub fn append(&mut self, entry: Entry) -> Result<(), ConversationError> {
        match &entry {
            Entry::UserInput { .. } => {}
            Entry::Decision { .. } => {
                let pending = self.pending_calls().len();
                if pending > 0 {
                    return Err(ConversationError::UnansweredCalls(pending));
                }
                // Identifiers are scoped to their decision
                self.answered.clear();
            }
            Entry::FunctionResult(result) => {
                if self.answered.contains(&result.id) {
                    return Err(ConversationError::DuplicateResult(result.id.clone()));
                }
                if !self.pending_calls().iter().any(|c| c.id == result.id) {
                    return Err(ConversationError::UnmatchedResult(result.id.clone()));
                }
                self.answered.insert(result.id.clone());
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn latest_decision(&self) -> Option<(&str, &[FunctionCall])> {
        self.entries.iter().rev().find_map(|e| match e {
            Entry::Decision { text, calls } => Some((text.as_str(), calls.as_slice())),
            _ => None,
        })
    }

    /// Calls of the latest decision that have no result yet
    pub fn pending_calls(&self) -> Vec<&FunctionCall> {
        self.latest_decision()
            .map(|(_, calls)| {
                calls
                    .iter()
                    .filter(|c| !self.answered.contains(&c.id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Text of the last decision, when it requested no calls
    pub fn final_answer(&self) -> Option<&str> {
        match self.entries.last()? {
            Entry::Decision { text, calls } if calls.is_empty() => Some(text),
            _ => None,
        }
    }

    pub fn results(&self) -> impl Iterator<Item = &FunctionResult> {
        self.entries.iter().filter_map(|e| match e {
            Entry::FunctionResult(r) => Some(r),
            _ => None,
        })
    }
}
