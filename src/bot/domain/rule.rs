//! Trigger rule entity.

use super::BotDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a trigger rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerRuleId(Uuid);

impl TriggerRuleId {
    /// Generates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for TriggerRuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TriggerRuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pattern-to-reply mapping used by the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    id: TriggerRuleId,
    pattern: String,
    response: String,
    variations: Vec<String>,
    intent: Option<String>,
    priority: i32,
    is_active: bool,
    usage_count: u64,
}

/// Parameter object for reconstructing a persisted rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTriggerRuleData {
    /// Persisted identifier.
    pub id: TriggerRuleId,
    /// Regular expression matched case-insensitively.
    pub pattern: String,
    /// Base reply.
    pub response: String,
    /// Alternative replies.
    pub variations: Vec<String>,
    /// Detected intent label.
    pub intent: Option<String>,
    /// Higher values are checked first.
    pub priority: i32,
    /// Inactive rules are never matched.
    pub is_active: bool,
    /// Times the rule has matched.
    pub usage_count: u64,
}

impl TriggerRule {
    /// Creates an active rule with priority zero.
    ///
    /// # Errors
    ///
    /// Returns [`BotDomainError::EmptyPattern`] or
    /// [`BotDomainError::EmptyResponse`] for blank inputs.
    pub fn new(
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Result<Self, BotDomainError> {
        let pattern = pattern.into();
        let response = response.into();
        if pattern.trim().is_empty() {
            return Err(BotDomainError::EmptyPattern);
        }
        if response.trim().is_empty() {
            return Err(BotDomainError::EmptyResponse);
        }
        Ok(Self {
            id: TriggerRuleId::new(),
            pattern,
            response,
            variations: Vec::new(),
            intent: None,
            priority: 0,
            is_active: true,
            usage_count: 0,
        })
    }

    /// Reconstructs a rule from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTriggerRuleData) -> Self {
        Self {
            id: data.id,
            pattern: data.pattern,
            response: data.response,
            variations: data.variations,
            intent: data.intent,
            priority: data.priority,
            is_active: data.is_active,
            usage_count: data.usage_count,
        }
    }

    /// Adds alternative replies.
    ///
    /// # Errors
    ///
    /// Returns [`BotDomainError::EmptyResponse`] when any variation is blank.
    pub fn with_variations(
        mut self,
        variations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, BotDomainError> {
        let variations: Vec<String> = variations.into_iter().map(Into::into).collect();
        if variations.iter().any(|variation| variation.trim().is_empty()) {
            return Err(BotDomainError::EmptyResponse);
        }
        self.variations = variations;
        Ok(self)
    }

    /// Sets the intent label.
    #[must_use]
    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Deactivates the rule.
    #[must_use]
    pub const fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Returns the rule identifier.
    #[must_use]
    pub const fn id(&self) -> TriggerRuleId {
        self.id
    }

    /// Returns the trigger pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the base reply.
    #[must_use]
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Returns the alternative replies.
    #[must_use]
    pub fn variations(&self) -> &[String] {
        &self.variations
    }

    /// Returns the base reply followed by every variation.
    pub fn replies(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.response.as_str()).chain(self.variations.iter().map(String::as_str))
    }

    /// Returns the intent label.
    #[must_use]
    pub fn intent(&self) -> Option<&str> {
        self.intent.as_deref()
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns `true` when the rule takes part in matching.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns how many times the rule has matched.
    #[must_use]
    pub const fn usage_count(&self) -> u64 {
        self.usage_count
    }

    /// Counts one more match.
    pub const fn record_usage(&mut self) -> u64 {
        self.usage_count = self.usage_count.saturating_add(1);
        self.usage_count
    }
}
