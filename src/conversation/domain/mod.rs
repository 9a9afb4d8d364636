//! Domain model for support conversations.
//!
//! Pure types with no infrastructure dependencies. Mutations that touch the
//! status graph go through [`Conversation`] methods so the transition rules
//! live in one place.

mod conversation;
mod error;
mod event;
mod ids;
mod message;
mod metric;
mod status;

pub use conversation::{AssignOutcome, Conversation, ConversationStats, PersistedConversationData};
pub use error::{ConversationDomainError, DomainErrorCategory, ParsePriorityError, ParseStatusError};
pub use event::{ConversationEvent, ConversationSummary, EventChannel};
pub use ids::{ConversationId, MessageId, ReferenceId, SequenceNumber};
pub use message::{
    Attachment, BotAnnotation, MAX_ATTACHMENTS, Message, MessageDraft, MessageKind, Sender,
    validate_attachments, validate_content,
};
pub use metric::{ConversationMetric, Resolution};
pub use status::{ConversationStatus, Priority};
