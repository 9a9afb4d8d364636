//! Adapter implementations for agent ports.

pub mod memory;
