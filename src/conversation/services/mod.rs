//! Application services for conversations.

mod locks;
mod registry;

pub use registry::{
    Actor, ClosedConversation, ConversationGate, ConversationListing, ConversationRegistry,
    RegistryConfig, RegistryError, RegistryResult, StatusUpdate, Ungated,
};
