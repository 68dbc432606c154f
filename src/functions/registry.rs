//! Function registry with atomic refresh
//!
//! Readers take an `Arc<RegistrySnapshot>` and keep it for as long as they
//! need; a refresh swaps in a new snapshot without touching old ones.

use super::{FunctionDescriptor, FunctionProvider, ProviderError};
use crate::llm::ToolDefinition;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to fetch function list: {0}")]
    InitialFetch(#[source] ProviderError),
    #[error("Provider advertised function '{0}' more than once")]
    DuplicateName(String),
}

/// Immutable view of the descriptor set at one point in time
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    version: u64,
    functions: Vec<FunctionDescriptor>,
    by_name: HashMap<String, usize>,
}

impl RegistrySnapshot {
    fn build(version: u64, functions: Vec<FunctionDescriptor>) -> Result<Self, RegistryError> {
        let mut by_name = HashMap::with_capacity(functions.len());
        for (i, f) in functions.iter().enumerate() {
            if by_name.insert(f.name.clone(), i).is_some() {
                return Err(RegistryError::DuplicateName(f.name.clone()));
            }
        }
        Ok(Self {
            version,
            functions,
            by_name,
        })
    }

    /// Monotonic counter, bumped on each successful refresh
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.by_name.get(name).map(|&i| &self.functions[i])
    }

    pub fn functions(&self) -> &[FunctionDescriptor] {
        &self.functions
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.functions
            .iter()
            .map(FunctionDescriptor::to_tool_definition)
            .collect()
    }
}

/// Current function set of one provider
pub struct FunctionRegistry<P: FunctionProvider> {
    provider: P,
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl<P: FunctionProvider> FunctionRegistry<P> {
    /// Fetch the initial descriptor set; failure here is fatal to the caller
    pub async fn connect(provider: P) -> Result<Self, RegistryError> {
        let functions = provider
            .list_functions()
            .await
            .map_err(RegistryError::InitialFetch)?;
        let snapshot = RegistrySnapshot::build(1, functions)?;

        tracing::info!(
            count = snapshot.functions.len(),
            functions = ?snapshot.functions.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
            "Function registry loaded"
        );

        Ok(Self {
            provider,
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    pub async fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.read().await.clone()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The provider has announced a changed list since the last fetch
    pub fn is_stale(&self) -> bool {
        self.provider.list_changed()
    }

    /// Re-fetch and replace the whole set. On failure the previous snapshot
    /// stays current and the snapshot it returns is unchanged.
    pub async fn refresh(&self) -> Arc<RegistrySnapshot> {
        let fetched = self
            .provider
            .list_functions()
            .await
            .map_err(|e| e.to_string())
            .and_then(|functions| {
                // Version is assigned under the write lock below
                RegistrySnapshot::build(0, functions).map_err(|e| e.to_string())
            });

        let mut current = self.current.write().await;
        match fetched {
            Ok(mut snapshot) => {
                snapshot.version = current.version + 1;
                tracing::info!(
                    version = snapshot.version,
                    count = snapshot.functions.len(),
                    "Function registry refreshed"
                );
                *current = Arc::new(snapshot);
            }
            Err(e) => {
                tracing::warn!(error = %e, version = current.version, "Registry refresh failed, keeping previous set");
            }
        }
        current.clone()
    }
}
