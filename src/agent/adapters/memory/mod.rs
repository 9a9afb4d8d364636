//! In-memory agent adapters.

mod directory;

pub use directory::InMemoryAgentDirectory;
