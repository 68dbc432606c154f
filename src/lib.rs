//! Weather agent - answers weather questions with concurrent function calls
//!
//! The agent binary drives a decision/fan-out control loop against an
//! OpenAI-compatible model. Weather functions are served by a separate
//! process over the Model Context Protocol.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod config;
pub mod conversation;
pub mod functions;
pub mod llm;
pub mod mcp;
pub mod runtime;
pub mod state_machine;
pub mod system_prompt;
pub mod weather;
