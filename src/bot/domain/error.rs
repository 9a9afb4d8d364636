//! Error types for trigger rules.

use super::TriggerRuleId;
use thiserror::Error;

/// Errors raised while building trigger rules.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BotDomainError {
    /// The trigger pattern is empty.
    #[error("trigger pattern must not be empty")]
    EmptyPattern,

    /// The reply text or a variation is empty.
    #[error("bot response must not be empty")]
    EmptyResponse,
}

/// A stored trigger pattern that does not compile.
///
/// Never surfaces to guests; the matcher logs it and skips the rule.
#[derive(Debug, Clone, Error)]
#[error("trigger rule {rule_id} has malformed pattern {pattern:?}: {source}")]
pub struct PatternError {
    /// The offending rule.
    pub rule_id: TriggerRuleId,
    /// The pattern as stored.
    pub pattern: String,
    /// Compiler diagnostic.
    #[source]
    pub source: regex::Error,
}
