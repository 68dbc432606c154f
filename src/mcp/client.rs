//! MCP client for the function server
//!
//! rmcp multiplexes concurrent requests over the one connection and fails
//! everything in flight when the transport closes. This wrapper bounds each
//! request with a timeout and remembers `notifications/tools/list_changed`
//! until a listing succeeds.

use crate::functions::{FunctionDescriptor, FunctionProvider, ProviderError};
use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, CallToolResult, ClientInfo, Tool};
use rmcp::service::{NotificationContext, RunningService};
use rmcp::transport::{IntoTransport, TokioChildProcess};
use rmcp::{ClientHandler, RoleClient, ServiceError, ServiceExt};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Handles server notifications on rmcp's service task
#[derive(Debug, Clone, Default)]
struct ListChangeTracker {
    changed: Arc<AtomicBool>,
}

impl ClientHandler for ListChangeTracker {
    fn get_info(&self) -> ClientInfo {
        ClientInfo::default()
    }

    fn on_tool_list_changed(
        &self,
        _context: NotificationContext<RoleClient>,
    ) -> impl Future<Output = ()> + Send + '_ {
        tracing::info!("Function server announced a changed function list");
        self.changed.store(true, Ordering::SeqCst);
        std::future::ready(())
    }
}

pub struct McpClient {
    service: RunningService<RoleClient, ListChangeTracker>,
    changed: Arc<AtomicBool>,
    request_timeout: Duration,
}

impl McpClient {
    /// Perform the handshake over an existing transport
    pub async fn connect<T, E, A>(transport: T) -> Result<Self, ProviderError>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let tracker = ListChangeTracker::default();
        let changed = tracker.changed.clone();
        let service = tracker
            .serve(transport)
            .await
            .map_err(|e| ProviderError::Transport(format!("MCP handshake failed: {e}")))?;

        if let Some(info) = service.peer_info() {
            tracing::info!(
                server = %info.server_info.name,
                protocol = ?info.protocol_version,
                "Function server initialized"
            );
        }

        Ok(Self {
            service,
            changed,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Spawn `program` and speak MCP over its stdio; the child is killed
    /// when the client is dropped
    pub async fn spawn(program: &str, args: &[String]) -> Result<Self, ProviderError> {
        tracing::info!(program, "Starting function server");

        let mut command = Command::new(program);
        command.args(args);
        let transport = TokioChildProcess::new(command)
            .map_err(|e| ProviderError::Transport(format!("Failed to start {program}: {e}")))?;

        Self::connect(transport).await
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn server_name(&self) -> Option<&str> {
        self.service
            .peer_info()
            .map(|info| info.server_info.name.as_str())
    }

    async fn bounded<T>(
        &self,
        method: &str,
        request: impl Future<Output = Result<T, ServiceError>>,
    ) -> Result<T, ProviderError> {
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result.map_err(provider_error),
            Err(_) => Err(ProviderError::Transport(format!(
                "{method} timed out after {}s",
                self.request_timeout.as_secs_f32()
            ))),
        }
    }
}

fn provider_error(error: ServiceError) -> ProviderError {
    match error {
        ServiceError::McpError(e) => ProviderError::Rpc {
            code: i64::from(e.code.0),
            message: e.message.into_owned(),
        },
        ServiceError::TransportClosed => ProviderError::Closed,
        other => ProviderError::Transport(other.to_string()),
    }
}

fn descriptor(tool: &Tool) -> FunctionDescriptor {
    FunctionDescriptor {
        name: tool.name.to_string(),
        description: tool.description.as_deref().unwrap_or_default().to_string(),
        parameters: Value::Object(tool.input_schema.as_ref().clone()),
        read_only: tool
            .annotations
            .as_ref()
            .and_then(|a| a.read_only_hint)
            .unwrap_or(false),
    }
}

/// Error results become `Function` errors; structured content wins over
/// text, and text that is not JSON is passed through as a string
fn call_value(result: CallToolResult) -> Result<Value, ProviderError> {
    let text = result
        .content
        .iter()
        .filter_map(|c| c.raw.as_text())
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    if result.is_error == Some(true) {
        return Err(ProviderError::Function(text));
    }
    if let Some(structured) = result.structured_content {
        return Ok(structured);
    }
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

#[async_trait]
impl FunctionProvider for McpClient {
    async fn list_functions(&self) -> Result<Vec<FunctionDescriptor>, ProviderError> {
        // An announcement arriving mid-listing stays set for the next refresh
        let was_changed = self.changed.swap(false, Ordering::SeqCst);

        match self.bounded("tools/list", self.service.list_all_tools()).await {
            Ok(tools) => Ok(tools.iter().map(descriptor).collect()),
            Err(e) => {
                if was_changed {
                    self.changed.store(true, Ordering::SeqCst);
                }
                Err(e)
            }
        }
    }

    async fn call_function(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, ProviderError> {
        let request = CallToolRequestParams {
            meta: None,
            name: name.to_string().into(),
            arguments: Some(arguments),
            task: None,
        };
        let result = self
            .bounded("tools/call", self.service.call_tool(request))
            .await?;
        call_value(result)
    }

    fn list_changed(&self) -> bool {
        self.changed.load(Ordering::SeqCst)
    }
}
