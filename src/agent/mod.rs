//! Support agents as seen by the routing core.
//!
//! Agents are authenticated humans managed outside this crate. The core
//! only needs to look them up, pick an available one for escalation, and
//! record activity, so the directory is modelled as a port with an
//! in-memory adapter.

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
