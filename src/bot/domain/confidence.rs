//! Match confidence and the matcher's result type.

use super::TriggerRuleId;
use serde::{Deserialize, Serialize};

/// Confidence in a bot reply, in `[0.5, 1.0]` for any match.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    const BASE: f64 = 0.5;
    const PER_OCCURRENCE: f64 = 0.3;

    /// Scores a match from the number of non-overlapping occurrences.
    ///
    /// ```
    /// use switchboard::bot::domain::Confidence;
    ///
    /// assert_eq!(Confidence::from_occurrences(1).value(), 0.8);
    /// assert_eq!(Confidence::from_occurrences(4).value(), 1.0);
    /// ```
    #[must_use]
    pub fn from_occurrences(occurrences: usize) -> Self {
        let count = f64::from(u32::try_from(occurrences).unwrap_or(u32::MAX));
        Self(Self::PER_OCCURRENCE.mul_add(count, Self::BASE).min(1.0))
    }

    /// Returns the score.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Returns `true` when the score falls below `threshold`.
    #[must_use]
    pub fn below(self, threshold: f64) -> bool {
        self.0 < threshold
    }
}

/// A matched rule and the reply chosen from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// The winning rule.
    pub rule_id: TriggerRuleId,
    /// Base reply or one of its variations.
    pub response_text: String,
    /// Confidence score.
    pub confidence: Confidence,
    /// Intent label of the rule.
    pub intent: Option<String>,
}
