//! Remote functions the model may call
//!
//! A provider advertises descriptors and executes calls; the registry holds
//! the current descriptor set as an immutable snapshot.

mod registry;
mod schema;

pub use registry::{FunctionRegistry, RegistryError, RegistrySnapshot};
pub use schema::validate_arguments;

use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Advertised metadata for one callable function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object
    pub parameters: Value,
    /// Safe to run concurrently with other calls
    #[serde(default)]
    pub read_only: bool,
}

impl FunctionDescriptor {
    pub fn to_tool_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.parameters.clone(),
        }
    }
}

/// Errors from a function provider
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("Provider connection closed")]
    Closed,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Provider returned error {code}: {message}")]
    Rpc { code: i64, message: String },
    /// The function ran and reported failure
    #[error("{0}")]
    Function(String),
    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

/// Source of function descriptors and executor of calls
#[async_trait]
pub trait FunctionProvider: Send + Sync {
    async fn list_functions(&self) -> Result<Vec<FunctionDescriptor>, ProviderError>;

    async fn call_function(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, ProviderError>;

    /// Whether the provider announced a changed function list since the
    /// last `list_functions`
    fn list_changed(&self) -> bool {
        false
    }
}

#[async_trait]
impl<T: FunctionProvider + ?Sized> FunctionProvider for Arc<T> {
    async fn list_functions(&self) -> Result<Vec<FunctionDescriptor>, ProviderError> {
        (**self).list_functions().await
    }

    async fn call_function(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, ProviderError> {
        (**self).call_function(name, arguments).await
    }

    fn list_changed(&self) -> bool {
        (**self).list_changed()
    }
}
