//! Conversation lifecycle, message ordering and agent assignment.
//!
//! The registry is the single writer for every conversation: it owns the
//! status state machine, assigns per-conversation message sequence numbers,
//! keeps the message counter consistent with the message log, snapshots
//! metrics on close and publishes each committed change to the injected
//! event sink. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
