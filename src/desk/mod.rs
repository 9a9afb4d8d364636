//! Boundary facade for the guest and agent channels.
//!
//! [`SupportDesk`] wires the session store, conversation registry, bot
//! matcher, routing engine and broadcast hub together. Agent operations pass
//! through an injected [`ConversationAccessPolicy`] before any state
//! changes, and every failure is reported as a [`DeskError`] with a coarse
//! [`ErrorKind`].
//!
//! [`ConversationAccessPolicy`]: crate::conversation::ports::ConversationAccessPolicy

mod error;
mod service;

pub use error::{DeskError, DeskResult, ErrorKind};
pub use service::{
    ConversationDetail, DeskBackends, GuestHistory, InMemoryDesk, SessionGrant, SupportDesk,
};

#[cfg(test)]
mod tests;
