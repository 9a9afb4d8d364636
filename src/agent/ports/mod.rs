//! Port contracts for agent lookup.

pub mod directory;

pub use directory::{AgentDirectory, AgentDirectoryError, AgentDirectoryResult};
