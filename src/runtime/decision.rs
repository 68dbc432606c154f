//! Decision step backed by a chat-completions model

use super::traits::{Decision, DecisionMaker};
use crate::conversation::{Conversation, Entry, FunctionCall};
use crate::functions::RegistrySnapshot;
use crate::llm::{ContentBlock, LlmError, LlmMessage, LlmRequest, LlmService};
use crate::system_prompt::build_system_prompt;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

pub struct LlmDecisionStep {
    llm: Arc<dyn LlmService>,
    /// Date stated in the system prompt
    today: NaiveDate,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl LlmDecisionStep {
    pub fn new(llm: Arc<dyn LlmService>, today: NaiveDate) -> Self {
        Self {
            llm,
            today,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = Some(max_tokens);
        self.temperature = Some(temperature);
        self
    }

    /// The function catalog in the system prompt and the `tools` list both
    /// come from `functions`, so a refresh changes them together
    pub fn build_request(&self, conversation: &Conversation, functions: &RegistrySnapshot) -> LlmRequest {
        LlmRequest {
            system: Some(build_system_prompt(self.today, functions.functions())),
            messages: build_messages(conversation),
            tools: functions.tool_definitions(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl DecisionMaker for LlmDecisionStep {
    async fn decide(
        &self,
        conversation: &Conversation,
        functions: &RegistrySnapshot,
    ) -> Result<Decision, LlmError> {
        let request = self.build_request(conversation, functions);
        let response = self.llm.complete(&request).await?;

        let mut seen = HashSet::new();
        let calls = response
            .tool_uses()
            .into_iter()
            .map(|(id, name, input)| {
                // Some providers omit or reuse ids; results are matched by id
                let id = if id.is_empty() || !seen.insert(id.to_string()) {
                    let fresh = format!("call_{}", uuid::Uuid::new_v4().simple());
                    tracing::debug!(function = %name, id = %fresh, "Assigned call id");
                    seen.insert(fresh.clone());
                    fresh
                } else {
                    id.to_string()
                };
                FunctionCall::new(id, name, arguments_object(name, input))
            })
            .collect();

        Ok(Decision {
            text: response.text(),
            calls,
        })
    }
}

fn arguments_object(name: &str, input: &Value) -> Map<String, Value> {
    match input {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            tracing::warn!(function = %name, arguments = %other, "Call arguments are not an object");
            Map::new()
        }
    }
}

/// Replay the conversation as chat messages; consecutive function results
/// share one message
fn build_messages(conversation: &Conversation) -> Vec<LlmMessage> {
    let mut messages: Vec<LlmMessage> = Vec::new();
    let mut results: Vec<ContentBlock> = Vec::new();

    for entry in conversation.entries() {
        if !matches!(entry, Entry::FunctionResult(_)) && !results.is_empty() {
            messages.push(LlmMessage::user(std::mem::take(&mut results)));
        }
        match entry {
            Entry::UserInput { text } => messages.push(LlmMessage::user(vec![ContentBlock::text(text)])),
            Entry::Decision { text, calls } => {
                let mut content = Vec::with_capacity(calls.len() + 1);
                if !text.is_empty() {
                    content.push(ContentBlock::text(text));
                }
                content.extend(calls.iter().map(|c| {
                    ContentBlock::tool_use(&c.id, &c.name, Value::Object(c.arguments.clone()))
                }));
                messages.push(LlmMessage::assistant(content));
            }
            Entry::FunctionResult(result) => {
                results.push(ContentBlock::tool_result(
                    &result.id,
                    result.content(),
                    result.is_failure(),
                ));
            }
        }
    }
    if !results.is_empty() {
        messages.push(LlmMessage::user(results));
    }
    messages
}
