//! Runtime for answering one question
//!
//! The state machine decides what happens next; this module performs it:
//! decision steps, concurrent function fan-out, retries and cancellation.

mod decision;
mod executor;
mod fanout;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use decision::LlmDecisionStep;
pub use executor::{AgentError, AgentRuntime, RunOutcome};
pub use fanout::{FanOutConfig, FanOutExecutor};
pub use traits::*;
