//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::conversation::{Conversation, FunctionCall};
use crate::functions::RegistrySnapshot;
use crate::llm::LlmError;
use async_trait::async_trait;
use std::sync::Arc;

/// Output of one decision step
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub text: String,
    pub calls: Vec<FunctionCall>,
}

impl Decision {
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            calls: vec![],
        }
    }

    pub fn calls(calls: Vec<FunctionCall>) -> Self {
        Self {
            text: String::new(),
            calls,
        }
    }
}

/// Chooses the next move given the conversation so far
#[async_trait]
pub trait DecisionMaker: Send + Sync {
    /// Decide using only the functions in `functions`
    async fn decide(
        &self,
        conversation: &Conversation,
        functions: &RegistrySnapshot,
    ) -> Result<Decision, LlmError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: DecisionMaker + ?Sized> DecisionMaker for Arc<T> {
    async fn decide(
        &self,
        conversation: &Conversation,
        functions: &RegistrySnapshot,
    ) -> Result<Decision, LlmError> {
        (**self).decide(conversation, functions).await
    }
}
