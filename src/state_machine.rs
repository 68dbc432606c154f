//! Agent control loop as a pure state machine
//!
//! Implements the Elm Architecture pattern: `transition` maps a state and an
//! event to a new state plus effects, and the runtime performs the effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{AgentContext, AgentState, ErrorKind};
pub use transition::{transition, TransitionError, TransitionResult};
