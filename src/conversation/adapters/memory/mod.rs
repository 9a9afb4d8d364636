//! In-memory conversation adapters for tests and single-process deployments.

mod access;
mod events;
mod repository;

pub use access::RoleBasedAccessPolicy;
pub use events::RecordingEventSink;
pub use repository::InMemoryConversationRepository;
