//! Model access for the decision step
//!
//! Each decision is one chat-completions request: the replayed conversation
//! plus the snapshot's functions as `tools`. The reply is either a final
//! answer or a batch of calls for the fan-out. `LoggingService` records
//! what every decision cost and what it asked for.

mod error;
mod openai;
mod types;

pub use error::{LlmError, LlmErrorKind};
pub use openai::{LlmConfig, OpenAiCompatService};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// A chat-completions endpoint the decision step can ask
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logs each decision request: latency, token usage and the calls requested
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                let calls: Vec<&str> = response
                    .tool_uses()
                    .into_iter()
                    .map(|(_, name, _)| name)
                    .collect();
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    messages = request.messages.len(),
                    functions_offered = request.tools.len(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    final_answer = calls.is_empty(),
                    ?calls,
                    "Decision request completed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    messages = request.messages.len(),
                    error = %e.message,
                    kind = ?e.kind,
                    retryable = e.kind.is_retryable(),
                    "Decision request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
