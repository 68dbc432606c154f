//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::{Decision, DecisionMaker};
use crate::conversation::Conversation;
use crate::functions::{FunctionDescriptor, FunctionProvider, ProviderError, RegistrySnapshot};
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock LLM service that returns queued responses
#[allow(dead_code)]
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

#[allow(dead_code)]
impl MockLlmService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Scripted Decision Maker
// ============================================================================

/// What a decision step was shown
#[derive(Debug, Clone)]
pub struct DecisionView {
    pub registry_version: u64,
    pub functions: Vec<String>,
    pub entries: usize,
}

/// Decision maker that replays a script, optionally after a delay
#[allow(dead_code)]
pub struct ScriptedDecisionMaker {
    script: Mutex<VecDeque<Result<Decision, LlmError>>>,
    views: Mutex<Vec<DecisionView>>,
    delay: Duration,
    /// Notified when a decision starts (for test synchronization)
    pub decision_started: Arc<Notify>,
}

#[allow(dead_code)]
impl ScriptedDecisionMaker {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            views: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            decision_started: Arc::new(Notify::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn then(self, decision: Decision) -> Self {
        self.script.lock().unwrap().push_back(Ok(decision));
        self
    }

    pub fn then_fail(self, error: LlmError) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn views(&self) -> Vec<DecisionView> {
        self.views.lock().unwrap().clone()
    }
}

impl Default for ScriptedDecisionMaker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionMaker for ScriptedDecisionMaker {
    async fn decide(
        &self,
        conversation: &Conversation,
        functions: &RegistrySnapshot,
    ) -> Result<Decision, LlmError> {
        self.views.lock().unwrap().push(DecisionView {
            registry_version: functions.version(),
            functions: functions.functions().iter().map(|f| f.name.clone()).collect(),
            entries: conversation.len(),
        });
        self.decision_started.notify_waiters();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::unknown("Decision script exhausted")))
    }
}

// ============================================================================
// Mock Function Provider
// ============================================================================

pub const WEATHER_FUNCTIONS: [&str; 4] = [
    "get_current_weather",
    "get_current_atmospheric_conditions",
    "get_current_astronomical_data",
    "get_current_air_quality",
];

pub fn location_descriptor(name: &str, read_only: bool) -> FunctionDescriptor {
    FunctionDescriptor {
        name: name.to_string(),
        description: format!("Mock {name}"),
        parameters: json!({
            "type": "object",
            "properties": {
                "location": { "type": "string", "description": "City name" }
            },
            "required": ["location"],
            "additionalProperties": false
        }),
        read_only,
    }
}

#[derive(Default)]
struct ProviderState {
    functions: Vec<FunctionDescriptor>,
    listing_error: Option<ProviderError>,
    responses: HashMap<String, Value>,
    failures: HashMap<String, ProviderError>,
    failures_for: HashMap<(String, String), ProviderError>,
    /// Fail the next N calls of a function, then succeed
    transient: HashMap<String, (u32, ProviderError)>,
    delays: HashMap<String, Duration>,
    delays_for: HashMap<(String, String), Duration>,
    change_after: HashMap<String, Vec<FunctionDescriptor>>,
    calls: Vec<(String, Map<String, Value>)>,
    active: HashMap<String, usize>,
    max_active: HashMap<String, usize>,
}

/// In-memory function provider with scripted latency and failures
///
/// Unscripted calls echo the function name and the `location` argument.
#[allow(dead_code)]
#[derive(Default)]
pub struct MockFunctionProvider {
    state: Mutex<ProviderState>,
    changed: AtomicBool,
}

#[allow(dead_code)]
impl MockFunctionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four read-only weather functions
    pub fn weather() -> Self {
        let provider = Self::new();
        provider.set_functions(
            WEATHER_FUNCTIONS
                .iter()
                .map(|name| location_descriptor(name, true))
                .collect(),
        );
        provider
    }

    pub fn add_function(&self, name: &str, read_only: bool) {
        self.state
            .lock()
            .unwrap()
            .functions
            .push(location_descriptor(name, read_only));
    }

    /// Replace the advertised list; also clears a scripted listing failure
    pub fn set_functions(&self, functions: Vec<FunctionDescriptor>) {
        let mut state = self.state.lock().unwrap();
        state.functions = functions;
        state.listing_error = None;
    }

    /// Make every listing fail until `set_functions` is called
    pub fn fail_listing(&self, error: ProviderError) {
        self.state.lock().unwrap().listing_error = Some(error);
    }

    pub fn announce_list_changed(&self) {
        self.changed.store(true, Ordering::SeqCst);
    }

    /// Once a call to `name` finishes, swap the list and announce the change
    pub fn change_list_after_call(&self, name: &str, functions: Vec<FunctionDescriptor>) {
        self.state
            .lock()
            .unwrap()
            .change_after
            .insert(name.to_string(), functions);
    }

    pub fn respond(&self, name: &str, value: Value) {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert(name.to_string(), value);
    }

    pub fn fail(&self, name: &str, error: ProviderError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(name.to_string(), error);
    }

    pub fn fail_for(&self, name: &str, location: &str, error: ProviderError) {
        self.state
            .lock()
            .unwrap()
            .failures_for
            .insert((name.to_string(), location.to_string()), error);
    }

    pub fn fail_times(&self, name: &str, times: u32, error: ProviderError) {
        self.state
            .lock()
            .unwrap()
            .transient
            .insert(name.to_string(), (times, error));
    }

    pub fn delay(&self, name: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .delays
            .insert(name.to_string(), delay);
    }

    pub fn delay_for(&self, name: &str, location: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .delays_for
            .insert((name.to_string(), location.to_string()), delay);
    }

    /// Calls in the order they reached the provider
    pub fn recorded_calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Highest number of simultaneous in-flight calls seen for `name`
    pub fn max_concurrent(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .max_active
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    fn outcome(&self, name: &str, location: &str) -> Result<Value, ProviderError> {
        let mut state = self.state.lock().unwrap();
        if let Some(functions) = state.change_after.remove(name) {
            state.functions = functions;
            self.changed.store(true, Ordering::SeqCst);
        }
        if let Some((remaining, error)) = state.transient.get_mut(name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(error.clone());
            }
        }
        let key = (name.to_string(), location.to_string());
        if let Some(error) = state.failures_for.get(&key).or_else(|| state.failures.get(name)) {
            return Err(error.clone());
        }
        Ok(state.responses.get(name).cloned().unwrap_or_else(|| {
            json!({
                "function": name,
                "location": { "name": location }
            })
        }))
    }
}

/// Tracks one in-flight call; dropped on completion or cancellation
struct ActiveCall<'a> {
    provider: &'a MockFunctionProvider,
    name: String,
}

impl<'a> ActiveCall<'a> {
    fn start(provider: &'a MockFunctionProvider, name: &str) -> Self {
        let mut state = provider.state.lock().unwrap();
        let active = state.active.entry(name.to_string()).or_default();
        *active += 1;
        let now = *active;
        let max = state.max_active.entry(name.to_string()).or_default();
        *max = (*max).max(now);
        drop(state);
        Self {
            provider,
            name: name.to_string(),
        }
    }
}

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        if let Some(active) = self.provider.state.lock().unwrap().active.get_mut(&self.name) {
            *active -= 1;
        }
    }
}

#[async_trait]
impl FunctionProvider for MockFunctionProvider {
    async fn list_functions(&self) -> Result<Vec<FunctionDescriptor>, ProviderError> {
        let was_changed = self.changed.swap(false, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        match &state.listing_error {
            Some(error) => {
                if was_changed {
                    self.changed.store(true, Ordering::SeqCst);
                }
                Err(error.clone())
            }
            None => Ok(state.functions.clone()),
        }
    }

    async fn call_function(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, ProviderError> {
        let location = arguments
            .get("location")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.calls.push((name.to_string(), arguments));
            state
                .delays_for
                .get(&(name.to_string(), location.clone()))
                .or_else(|| state.delays.get(name))
                .copied()
        };

        let _active = ActiveCall::start(self, name);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome(name, &location)
    }

    fn list_changed(&self) -> bool {
        self.changed.load(Ordering::SeqCst)
    }
}
