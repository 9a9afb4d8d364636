//! Domain model for trigger rules and match results.

mod confidence;
mod error;
mod rule;

pub use confidence::{Confidence, MatchResult};
pub use error::{BotDomainError, PatternError};
pub use rule::{PersistedTriggerRuleData, TriggerRule, TriggerRuleId};
