//! Adapter implementations for trigger rule ports.

pub mod memory;
