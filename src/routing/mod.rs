//! Routing engine: decides bot or human handling for each guest message.
//!
//! The engine composes the session store, conversation registry, bot
//! matcher and agent directory sequentially for one inbound message. Bot
//! replies below the human-review threshold are flagged; misses escalate the
//! conversation and try to auto-assign the first available agent.

mod engine;

pub use engine::{RoutingEngine, RoutingError, RoutingOutcome, RoutingPolicy, RoutingResult};

#[cfg(test)]
mod tests;
