//! Concurrent execution of the calls in one decision
//!
//! N calls in, exactly N results out, each carrying its call's id. A failing
//! call becomes a failure result; it never cancels or delays its siblings.
//! Functions advertised read-only run concurrently; the rest run one at a
//! time in request order, alongside the concurrent group.

use crate::conversation::{FailureKind, FunctionCall, FunctionResult};
use crate::functions::{validate_arguments, FunctionProvider, ProviderError, RegistrySnapshot};
use futures::future::join_all;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOutConfig {
    /// Upper bound on one call, retries excluded
    pub call_timeout: Duration,
    /// Extra attempts after a transport failure or timeout
    pub call_retries: u32,
    /// First retry delay, doubled for each further retry
    pub retry_base_delay: Duration,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(15),
            call_retries: 0,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FanOutExecutor {
    config: FanOutConfig,
}

impl FanOutExecutor {
    pub fn new(config: FanOutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FanOutConfig {
        &self.config
    }

    /// Run every call against `provider`, resolving names in `snapshot`
    pub async fn execute<P>(
        &self,
        provider: &P,
        calls: Vec<FunctionCall>,
        snapshot: &RegistrySnapshot,
    ) -> Vec<FunctionResult>
    where
        P: FunctionProvider + ?Sized,
    {
        let total = calls.len();
        let (concurrent, sequential): (Vec<_>, Vec<_>) = calls
            .into_iter()
            .partition(|c| snapshot.get(&c.name).map_or(true, |d| d.read_only));

        tracing::info!(
            calls = total,
            concurrent = concurrent.len(),
            sequential = sequential.len(),
            registry_version = snapshot.version(),
            "Executing function calls"
        );

        let parallel = join_all(
            concurrent
                .iter()
                .map(|call| self.execute_one(provider, call, snapshot)),
        );
        let serial = async {
            let mut results = Vec::with_capacity(sequential.len());
            for call in &sequential {
                results.push(self.execute_one(provider, call, snapshot).await);
            }
            results
        };

        let (mut results, serial_results) = tokio::join!(parallel, serial);
        results.extend(serial_results);
        results
    }

    async fn execute_one<P>(
        &self,
        provider: &P,
        call: &FunctionCall,
        snapshot: &RegistrySnapshot,
    ) -> FunctionResult
    where
        P: FunctionProvider + ?Sized,
    {
        let Some(descriptor) = snapshot.get(&call.name) else {
            tracing::warn!(function = %call.name, id = %call.id, "Unknown function requested");
            return FunctionResult::failure(
                call,
                FailureKind::UnknownFunction,
                format!("Unknown function: {}", call.name),
            );
        };

        if let Err(reason) = validate_arguments(&descriptor.parameters, &call.arguments) {
            tracing::warn!(function = %call.name, id = %call.id, %reason, "Invalid arguments");
            return FunctionResult::failure(
                call,
                FailureKind::InvalidArguments,
                format!("Invalid arguments: {reason}"),
            );
        }

        let started = Instant::now();
        let mut attempt = 0;
        let result = loop {
            let outcome = tokio::time::timeout(
                self.config.call_timeout,
                provider.call_function(&call.name, call.arguments.clone()),
            )
            .await;

            let (kind, reason, retryable) = match outcome {
                Ok(Ok(value)) => break FunctionResult::payload(call, value),
                Ok(Err(e)) => {
                    let retryable = matches!(e, ProviderError::Transport(_));
                    (FailureKind::Provider, format!("Error: {e}"), retryable)
                }
                Err(_) => (
                    FailureKind::TimedOut,
                    format!(
                        "Error: {} timed out after {}s",
                        call.name,
                        self.config.call_timeout.as_secs_f32()
                    ),
                    true,
                ),
            };

            if !retryable || attempt >= self.config.call_retries {
                break FunctionResult::failure(call, kind, reason);
            }

            let delay = backoff(self.config.retry_base_delay, attempt);
            attempt += 1;
            tracing::warn!(
                function = %call.name,
                id = %call.id,
                attempt,
                delay_ms = %delay.as_millis(),
                %reason,
                "Retrying function call"
            );
            tokio::time::sleep(delay).await;
        };

        tracing::info!(
            function = %call.name,
            id = %call.id,
            success = !result.is_failure(),
            duration_ms = %started.elapsed().as_millis(),
            "Function call finished"
        );
        result
    }
}

/// Doubles per attempt, capped at 64x the base
fn backoff(base: Duration, attempt: u32) -> Duration {
    base * (1u32 << attempt.min(6))
}
