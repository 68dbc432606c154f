//! Model Context Protocol transport for the weather functions
//!
//! The functions live in a separate process speaking MCP on stdio; the agent
//! discovers and calls them through `McpClient`.

mod client;
mod server;

pub use client::McpClient;
pub use server::{LocationRequest, WeatherServer};
