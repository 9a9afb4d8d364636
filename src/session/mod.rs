//! Guest session tracking for anonymous website visitors.
//!
//! A guest is known only by an opaque session token. Sessions expire
//! passively after a fixed time-to-live and are extended on every inbound
//! guest message. The module follows hexagonal architecture:
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
