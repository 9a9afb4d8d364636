//! Messages exchanged within a conversation.

use super::{ConversationDomainError, ConversationId, MessageId, SequenceNumber};
use crate::agent::domain::AgentId;
use crate::session::domain::SessionToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Sender {
    /// The anonymous visitor owning the session.
    Guest(SessionToken),
    /// A staff member.
    User(AgentId),
    /// The trigger-rule bot.
    Bot,
    /// The platform itself.
    System,
}

impl Sender {
    /// Returns the canonical storage representation of the sender kind.
    #[must_use]
    pub const fn kind_str(self) -> &'static str {
        match self {
            Self::Guest(_) => "guest",
            Self::User(_) => "user",
            Self::Bot => "bot",
            Self::System => "system",
        }
    }

    /// Returns `true` for guest messages.
    #[must_use]
    pub const fn is_guest(self) -> bool {
        matches!(self, Self::Guest(_))
    }
}

/// Presentation kind of a message body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text.
    #[default]
    Text,
    /// Image upload with caption.
    Image,
    /// File upload with caption.
    File,
    /// Platform notice such as the closing message.
    System,
}

/// Descriptor of a stored attachment. The bytes live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original file name.
    pub name: String,
    /// Location of the stored object.
    pub url: String,
    /// MIME type reported at upload.
    pub mime_type: String,
    /// Size in bytes, when known.
    pub size_bytes: Option<u64>,
}

impl Attachment {
    /// Returns `true` for `image/*` MIME types.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Attachment descriptors a single message may carry.
pub const MAX_ATTACHMENTS: usize = 5;

/// Checks the number of attachment descriptors on one message.
///
/// # Errors
///
/// Returns [`ConversationDomainError::TooManyAttachments`] above
/// [`MAX_ATTACHMENTS`].
pub const fn validate_attachments(attachments: &[Attachment]) -> Result<(), ConversationDomainError> {
    if attachments.len() > MAX_ATTACHMENTS {
        return Err(ConversationDomainError::TooManyAttachments {
            actual: attachments.len(),
            max: MAX_ATTACHMENTS,
        });
    }
    Ok(())
}

/// Bot-specific flags carried by bot replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotAnnotation {
    /// Match confidence in `[0, 1]`.
    pub confidence: f64,
    /// Intent of the matched trigger rule.
    pub intent: Option<String>,
    /// Set when confidence fell below the human-review threshold.
    pub requires_human_review: bool,
}

/// Checks message content against emptiness and length limits.
///
/// Length is measured in characters, not bytes.
///
/// # Errors
///
/// Returns [`ConversationDomainError::EmptyContent`] for blank content and
/// [`ConversationDomainError::ContentTooLong`] when `max_chars` is exceeded.
///
/// # Examples
///
/// ```
/// use switchboard::conversation::domain::{ConversationDomainError, validate_content};
///
/// assert!(validate_content("hello", 1000).is_ok());
/// assert_eq!(validate_content("   ", 1000), Err(ConversationDomainError::EmptyContent));
/// ```
pub fn validate_content(content: &str, max_chars: usize) -> Result<(), ConversationDomainError> {
    if content.trim().is_empty() {
        return Err(ConversationDomainError::EmptyContent);
    }
    let actual = content.chars().count();
    if actual > max_chars {
        return Err(ConversationDomainError::ContentTooLong {
            actual,
            max: max_chars,
        });
    }
    Ok(())
}

/// A message not yet appended to a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    sender: Sender,
    sender_name: Option<String>,
    content: String,
    kind: MessageKind,
    attachments: Vec<Attachment>,
    bot: Option<BotAnnotation>,
    is_internal_note: bool,
}

impl MessageDraft {
    fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            sender_name: None,
            content: content.into(),
            kind: MessageKind::Text,
            attachments: Vec::new(),
            bot: None,
            is_internal_note: false,
        }
    }

    /// Drafts a guest message.
    #[must_use]
    pub fn guest(token: SessionToken, content: impl Into<String>) -> Self {
        Self::new(Sender::Guest(token), content)
    }

    /// Drafts a bot reply carrying match annotations.
    #[must_use]
    pub fn bot(content: impl Into<String>, annotation: BotAnnotation) -> Self {
        let mut draft = Self::new(Sender::Bot, content);
        draft.bot = Some(annotation);
        draft
    }

    /// Drafts a message from a staff member.
    #[must_use]
    pub fn agent(agent_id: AgentId, name: impl Into<String>, content: impl Into<String>) -> Self {
        let mut draft = Self::new(Sender::User(agent_id), content);
        draft.sender_name = Some(name.into());
        draft
    }

    /// Drafts a platform notice.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        let mut draft = Self::new(Sender::System, content);
        draft.kind = MessageKind::System;
        draft
    }

    /// Marks the draft as an agent-only note.
    #[must_use]
    pub const fn internal_note(mut self) -> Self {
        self.is_internal_note = true;
        self
    }

    /// Overrides the presentation kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attaches file descriptors.
    ///
    /// A text draft becomes an image message when every descriptor is an
    /// image, and a file message otherwise.
    #[must_use]
    pub fn with_attachments(mut self, attachments: impl IntoIterator<Item = Attachment>) -> Self {
        self.attachments = attachments.into_iter().collect();
        if self.kind == MessageKind::Text && !self.attachments.is_empty() {
            self.kind = if self.attachments.iter().all(Attachment::is_image) {
                MessageKind::Image
            } else {
                MessageKind::File
            };
        }
        self
    }

    /// Returns the draft sender.
    #[must_use]
    pub const fn sender(&self) -> Sender {
        self.sender
    }

    /// Returns the draft content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns `true` for agent-only notes.
    #[must_use]
    pub const fn is_internal_note(&self) -> bool {
        self.is_internal_note
    }

    /// Materialises the draft at its position in a conversation.
    ///
    /// The message is delivered at the moment it is created.
    #[must_use]
    pub fn into_message(
        self,
        conversation_id: ConversationId,
        sequence: SequenceNumber,
        at: DateTime<Utc>,
    ) -> Message {
        Message {
            id: MessageId::new(),
            conversation_id,
            sequence,
            sender: self.sender,
            sender_name: self.sender_name,
            content: self.content,
            kind: self.kind,
            attachments: self.attachments,
            bot: self.bot,
            is_internal_note: self.is_internal_note,
            created_at: at,
            delivered_at: Some(at),
            read_at: None,
            is_edited: false,
            edited_at: None,
        }
    }
}

/// One utterance in a conversation.
///
/// Messages are append-only: edits change content and the edit flag but
/// never the sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    conversation_id: ConversationId,
    sequence: SequenceNumber,
    sender: Sender,
    sender_name: Option<String>,
    content: String,
    kind: MessageKind,
    attachments: Vec<Attachment>,
    bot: Option<BotAnnotation>,
    is_internal_note: bool,
    created_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
    read_at: Option<DateTime<Utc>>,
    is_edited: bool,
    edited_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Returns the message identifier.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the owning conversation.
    #[must_use]
    pub const fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Returns the position within the conversation.
    #[must_use]
    pub const fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    /// Returns the author.
    #[must_use]
    pub const fn sender(&self) -> Sender {
        self.sender
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn sender_name(&self) -> Option<&str> {
        self.sender_name.as_deref()
    }

    /// Returns the text content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the presentation kind.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Returns the attachment descriptors.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Returns the bot annotations for bot replies.
    #[must_use]
    pub const fn bot_annotation(&self) -> Option<&BotAnnotation> {
        self.bot.as_ref()
    }

    /// Returns `true` when the bot authored the message.
    #[must_use]
    pub const fn is_bot_message(&self) -> bool {
        self.bot.is_some() || matches!(self.sender, Sender::Bot)
    }

    /// Returns the match confidence of bot replies.
    #[must_use]
    pub fn confidence_score(&self) -> Option<f64> {
        self.bot.as_ref().map(|bot| bot.confidence)
    }

    /// Returns `true` when a bot reply needs a human to double-check it.
    #[must_use]
    pub fn requires_human_review(&self) -> bool {
        self.bot.as_ref().is_some_and(|bot| bot.requires_human_review)
    }

    /// Returns `true` for agent-only notes.
    #[must_use]
    pub const fn is_internal_note(&self) -> bool {
        self.is_internal_note
    }

    /// Returns `true` when the guest may see the message.
    #[must_use]
    pub const fn is_guest_visible(&self) -> bool {
        !self.is_internal_note
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the delivery timestamp.
    #[must_use]
    pub const fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    /// Returns the read timestamp.
    #[must_use]
    pub const fn read_at(&self) -> Option<DateTime<Utc>> {
        self.read_at
    }

    /// Returns `true` once the content has been edited.
    #[must_use]
    pub const fn is_edited(&self) -> bool {
        self.is_edited
    }

    /// Returns when the content was last edited.
    #[must_use]
    pub const fn edited_at(&self) -> Option<DateTime<Utc>> {
        self.edited_at
    }

    /// Sets `read_at` unless already set. Returns `true` when it changed.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.read_at.is_some() {
            return false;
        }
        self.read_at = Some(at);
        true
    }

    /// Replaces the content and flags the message as edited.
    pub fn edit(&mut self, content: impl Into<String>, at: DateTime<Utc>) {
        self.content = content.into();
        self.is_edited = true;
        self.edited_at = Some(at);
    }
}
