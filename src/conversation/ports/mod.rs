//! Port contracts for conversation persistence, event fan-out and access
//! control.

pub mod access;
pub mod events;
pub mod repository;

#[cfg(test)]
pub use access::MockConversationAccessPolicy;
pub use access::{ConversationAccessPolicy, ConversationAction};
pub use events::ConversationEventSink;
pub use repository::{
    ConversationQuery, ConversationRepository, ConversationRepositoryError,
    ConversationRepositoryResult,
};
